//! Serializable rule declarations (`[[rule]]` tables) and their compilation
//! into [`Rule`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::error::RuleError;
use super::types::{ParamPolicy, PathReplace, Rule, RuleAction};

/// A rule file: `[[rule]]` array of tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReplaceSpec {
    #[serde(rename = "match")]
    pub pattern: String,
    pub replace: String,
}

/// Declarative form of a rule as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Optional display name; defaults to the first hostname or pattern.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub path_pattern: Option<String>,
    #[serde(flatten)]
    pub kind: RuleKindSpec,
}

/// Per-kind fields, selected by the `type` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKindSpec {
    NoOp,
    HostReplace {
        #[serde(default)]
        new_host: Option<String>,
        #[serde(default)]
        path_replace: Vec<PathReplaceSpec>,
        #[serde(default)]
        param_map: BTreeMap<String, String>,
        #[serde(default)]
        keep_params: Option<Vec<String>>,
    },
    ParamClean {
        #[serde(default)]
        path_replace: Vec<PathReplaceSpec>,
        #[serde(default)]
        param_map: BTreeMap<String, String>,
        #[serde(default)]
        keep_params: Option<Vec<String>>,
    },
    ParamExtract {
        param_name: String,
    },
    DomExtract {
        #[serde(default)]
        selector: Option<String>,
    },
    GetRedirect,
}

impl RuleSpec {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.hostnames.first().cloned())
            .or_else(|| self.patterns.first().cloned())
            .unwrap_or_else(|| "unnamed".to_string())
    }
}

fn compile(rule: &str, field: &'static str, pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
        rule: rule.to_string(),
        field,
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_policy(
    rule: &str,
    path_replace: Vec<PathReplaceSpec>,
    param_map: BTreeMap<String, String>,
    keep_params: Option<Vec<String>>,
) -> Result<ParamPolicy, RuleError> {
    let path_replace = path_replace
        .into_iter()
        .map(|p| {
            Ok(PathReplace {
                pattern: compile(rule, "path_replace", &p.pattern)?,
                replacement: p.replace,
            })
        })
        .collect::<Result<Vec<_>, RuleError>>()?;
    let param_map = param_map
        .into_iter()
        .map(|(from, to)| (from.to_lowercase(), to))
        .collect();
    let keep_params = keep_params.map(|list| {
        list.into_iter()
            .map(|p| p.to_lowercase())
            .collect::<HashSet<_>>()
    });
    Ok(ParamPolicy {
        path_replace,
        param_map,
        keep_params,
    })
}

impl TryFrom<RuleSpec> for Rule {
    type Error = RuleError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let name = spec.display_name();
        if spec.hostnames.is_empty() && spec.patterns.is_empty() {
            return Err(RuleError::NoTargets { rule: name });
        }

        let hostnames = spec
            .hostnames
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        let patterns = spec
            .patterns
            .iter()
            .map(|p| compile(&name, "patterns", p))
            .collect::<Result<Vec<_>, _>>()?;
        let path_pattern = spec
            .path_pattern
            .as_deref()
            .map(|p| compile(&name, "path_pattern", p))
            .transpose()?;

        let action = match spec.kind {
            RuleKindSpec::NoOp => RuleAction::NoOp,
            RuleKindSpec::HostReplace {
                new_host,
                path_replace,
                param_map,
                keep_params,
            } => RuleAction::HostReplace {
                new_host: new_host.filter(|h| !h.is_empty()),
                params: compile_policy(&name, path_replace, param_map, keep_params)?,
            },
            RuleKindSpec::ParamClean {
                path_replace,
                param_map,
                keep_params,
            } => RuleAction::ParamClean {
                params: compile_policy(&name, path_replace, param_map, keep_params)?,
            },
            RuleKindSpec::ParamExtract { param_name } => {
                if param_name.is_empty() {
                    return Err(RuleError::MissingParamName { rule: name });
                }
                RuleAction::ParamExtract { param_name }
            }
            RuleKindSpec::DomExtract { selector } => RuleAction::DomExtract {
                selector: selector
                    .as_deref()
                    .map(|s| compile(&name, "selector", s))
                    .transpose()?,
            },
            RuleKindSpec::GetRedirect => RuleAction::GetRedirect,
        };

        Ok(Rule {
            name,
            hostnames,
            patterns,
            path_pattern,
            action,
        })
    }
}
