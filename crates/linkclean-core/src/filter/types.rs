//! Store-resident tracking-parameter rule.

use serde::{Deserialize, Serialize};

/// Domain sentinel for rules that apply everywhere.
pub const GLOBAL_DOMAIN: &str = "global";

/// Whether a matching parameter is stripped or protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Remove,
    Allow,
}

impl RuleType {
    pub fn as_i64(self) -> i64 {
        match self {
            RuleType::Remove => 0,
            RuleType::Allow => 1,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        if v == 1 {
            RuleType::Allow
        } else {
            RuleType::Remove
        }
    }
}

/// One row of the `tracking_rules` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRule {
    pub domain: String,
    /// Literal path prefix; `None` applies to every path.
    pub path_pattern: Option<String>,
    /// Parameter name, or `/regex/` when `is_regex`.
    pub param_name: String,
    pub rule_type: RuleType,
    pub is_regex: bool,
}

impl TrackingRule {
    /// Regex body with the surrounding slashes removed.
    pub fn regex_body(&self) -> &str {
        strip_regex_slashes(&self.param_name)
    }

    pub fn applies_to_path(&self, path: &str) -> bool {
        match self.path_pattern.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => path.starts_with(prefix),
            _ => true,
        }
    }
}

/// True for `/…/` with at least one character between the slashes.
pub(crate) fn is_regex_literal(pattern: &str) -> bool {
    pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/')
}

pub(crate) fn strip_regex_slashes(pattern: &str) -> &str {
    if is_regex_literal(pattern) {
        &pattern[1..pattern.len() - 1]
    } else {
        pattern
    }
}
