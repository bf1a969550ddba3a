//! Built-in rule set and rule-file loading.

use anyhow::{Context, Result};
use std::path::Path;

use super::error::RuleError;
use super::spec::{RuleFile, RuleSpec};

const BUILTIN_RULES: &str = include_str!("builtin.toml");

/// Parse rule declarations from TOML text.
pub fn parse_rule_file(text: &str) -> Result<Vec<RuleSpec>, RuleError> {
    let file: RuleFile = toml::from_str(text)?;
    Ok(file.rules)
}

/// The rules shipped with the binary.
pub fn builtin_specs() -> Result<Vec<RuleSpec>, RuleError> {
    parse_rule_file(BUILTIN_RULES)
}

/// Load user rules from a TOML file (`[[rule]]` tables).
pub fn load_rule_file(path: &Path) -> Result<Vec<RuleSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read rule file: {}", path.display()))?;
    parse_rule_file(&text).with_context(|| format!("parse rule file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_rules_parse() {
        let specs = builtin_specs().unwrap();
        assert!(specs.len() >= 10);
        assert!(specs.iter().any(|s| s.hostnames.iter().any(|h| h == "x.com")));
    }

    #[test]
    fn load_rule_file_reads_toml() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(
            br#"
            [[rule]]
            hostnames = ["tracker.com"]
            type = "param_clean"
            keep_params = ["id"]
            "#,
        )
        .unwrap();
        f.flush().unwrap();
        let specs = load_rule_file(f.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].display_name(), "tracker.com");
    }

    #[test]
    fn load_rule_file_missing_is_error() {
        assert!(load_rule_file(Path::new("/nonexistent/linkclean/rules.toml")).is_err());
    }
}
