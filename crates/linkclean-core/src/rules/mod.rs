//! Hand-authored per-domain rules: definitions, the immutable registry (matcher)
//! and the host/path/query rewriter.
//!
//! Rules are declared in TOML and compiled once at startup; every regex is
//! validated during compilation so a bad rule file fails loudly before any link
//! is processed.

mod apply;
mod builtin;
mod error;
mod registry;
mod spec;
mod types;

pub use apply::apply_rule;
pub use builtin::{builtin_specs, load_rule_file, parse_rule_file};
pub use error::RuleError;
pub use registry::RuleRegistry;
pub use spec::{PathReplaceSpec, RuleFile, RuleKindSpec, RuleSpec};
pub use types::{ParamPolicy, PathReplace, Rule, RuleAction, RuleKind};
