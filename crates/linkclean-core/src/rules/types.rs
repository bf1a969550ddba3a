//! Compiled rule types. Constructed only through `RuleSpec` conversion.

use regex::Regex;
use std::collections::{HashMap, HashSet};

/// One `pathReplace` entry: first match of `pattern` in the path is replaced.
#[derive(Debug, Clone)]
pub struct PathReplace {
    pub pattern: Regex,
    pub replacement: String,
}

/// Path and query handling shared by `host_replace` and `param_clean`.
#[derive(Debug, Clone, Default)]
pub struct ParamPolicy {
    pub path_replace: Vec<PathReplace>,
    /// Lowercased original name -> new name.
    pub param_map: HashMap<String, String>,
    /// Lowercased allow-list. `None` (absent) and `Some(empty)` mean different things.
    pub keep_params: Option<HashSet<String>>,
}

impl ParamPolicy {
    /// Name the parameter is emitted under after applying `param_map`.
    pub fn effective_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.param_map
            .get(&key.to_lowercase())
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// Whether a parameter (already renamed) survives. `keep_when_unlisted`
    /// is the rule kind's default when no allow-list was given.
    pub fn retains(&self, effective_key: &str, keep_when_unlisted: bool) -> bool {
        match &self.keep_params {
            Some(allow) => allow.contains(&effective_key.to_lowercase()),
            None => keep_when_unlisted,
        }
    }
}

/// What a rule does once its host (and optional path) matched.
#[derive(Debug, Clone)]
pub enum RuleAction {
    /// Trusted domain: return the link untouched, skip every later tier.
    NoOp,
    /// Mirror host substitution. Unlisted parameters survive when `keep_params` is absent.
    HostReplace {
        new_host: Option<String>,
        params: ParamPolicy,
    },
    /// Parameter cleaning. Unlisted parameters are dropped when `keep_params` is absent.
    ParamClean { params: ParamPolicy },
    /// Follow the link embedded in a query parameter.
    ParamExtract { param_name: String },
    /// Fetch the page and pull the next link out of its markup.
    DomExtract { selector: Option<Regex> },
    /// Follow a single manual GET redirect.
    GetRedirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    NoOp,
    HostReplace,
    ParamClean,
    ParamExtract,
    DomExtract,
    GetRedirect,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::NoOp => "no_op",
            RuleKind::HostReplace => "host_replace",
            RuleKind::ParamClean => "param_clean",
            RuleKind::ParamExtract => "param_extract",
            RuleKind::DomExtract => "dom_extract",
            RuleKind::GetRedirect => "get_redirect",
        }
    }
}

impl RuleAction {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleAction::NoOp => RuleKind::NoOp,
            RuleAction::HostReplace { .. } => RuleKind::HostReplace,
            RuleAction::ParamClean { .. } => RuleKind::ParamClean,
            RuleAction::ParamExtract { .. } => RuleKind::ParamExtract,
            RuleAction::DomExtract { .. } => RuleKind::DomExtract,
            RuleAction::GetRedirect => RuleKind::GetRedirect,
        }
    }
}

/// A compiled hand-authored rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Display name for logs and `linkclean match`.
    pub name: String,
    /// Exact lowercase hostnames (O(1) lookup).
    pub hostnames: Vec<String>,
    /// Hostname patterns; consulted only for rules without `hostnames`.
    pub patterns: Vec<Regex>,
    pub path_pattern: Option<Regex>,
    pub action: RuleAction,
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        self.action.kind()
    }

    /// True when the rule has no path constraint or the constraint matches.
    pub fn matches_path(&self, path: &str) -> bool {
        self.path_pattern
            .as_ref()
            .map_or(true, |re| re.is_match(path))
    }

    pub fn matches_host_pattern(&self, hostname: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(hostname))
    }
}
