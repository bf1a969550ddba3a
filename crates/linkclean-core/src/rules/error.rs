//! Rule definition errors (surfaced at startup, never during resolution).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule `{rule}`: invalid {field} regex `{pattern}`: {source}")]
    InvalidRegex {
        rule: String,
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule `{rule}` has neither hostnames nor patterns")]
    NoTargets { rule: String },

    #[error("rule `{rule}`: param_extract requires a non-empty param_name")]
    MissingParamName { rule: String },

    #[error("hostname `{hostname}` is claimed by both `{first}` and `{second}`")]
    DuplicateHostname {
        hostname: String,
        first: String,
        second: String,
    },

    #[error("parse rule file: {0}")]
    Toml(#[from] toml::de::Error),
}
