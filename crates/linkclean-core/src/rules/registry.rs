//! Immutable rule registry (the matcher).
//!
//! Built once at startup and shared read-only across concurrent resolutions.
//! Exact hostnames resolve through a hash map; rules that declare no hostnames
//! form the fallback list and are scanned in registration order.

use std::collections::HashMap;

use super::builtin::builtin_specs;
use super::error::RuleError;
use super::spec::RuleSpec;
use super::types::Rule;

#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    by_hostname: HashMap<String, usize>,
    fallback: Vec<usize>,
}

impl RuleRegistry {
    /// Index `rules`. A hostname listed by two rules is a configuration error.
    pub fn build(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut by_hostname: HashMap<String, usize> = HashMap::new();
        let mut fallback = Vec::new();

        for (idx, rule) in rules.iter().enumerate() {
            if rule.hostnames.is_empty() {
                fallback.push(idx);
                continue;
            }
            for hostname in &rule.hostnames {
                if let Some(&prev) = by_hostname.get(hostname) {
                    if prev == idx {
                        continue;
                    }
                    return Err(RuleError::DuplicateHostname {
                        hostname: hostname.clone(),
                        first: rules[prev].name.clone(),
                        second: rule.name.clone(),
                    });
                }
                by_hostname.insert(hostname.clone(), idx);
            }
        }

        Ok(Self {
            rules,
            by_hostname,
            fallback,
        })
    }

    /// Compile and index declarative rules.
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, RuleError> {
        let rules = specs
            .into_iter()
            .map(Rule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(rules)
    }

    /// Built-in rules followed by `extra` (user rules from the config).
    pub fn with_builtin(extra: Vec<RuleSpec>) -> Result<Self, RuleError> {
        let mut specs = builtin_specs()?;
        specs.extend(extra);
        Self::from_specs(specs)
    }

    /// Best rule for `hostname`: exact match first, then the first fallback
    /// rule with a matching pattern.
    pub fn find(&self, hostname: &str) -> Option<&Rule> {
        let hostname = hostname.to_ascii_lowercase();
        if let Some(&idx) = self.by_hostname.get(&hostname) {
            return Some(&self.rules[idx]);
        }
        self.fallback
            .iter()
            .map(|&idx| &self.rules[idx])
            .find(|rule| rule.matches_host_pattern(&hostname))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{parse_rule_file, RuleKind};

    fn registry(toml_src: &str) -> RuleRegistry {
        RuleRegistry::from_specs(parse_rule_file(toml_src).unwrap()).unwrap()
    }

    #[test]
    fn exact_hostname_is_case_insensitive() {
        let reg = registry(
            r#"
            [[rule]]
            hostnames = ["youtube.com", "www.youtube.com"]
            type = "param_clean"
            "#,
        );
        assert_eq!(reg.find("WWW.YouTube.com").unwrap().name, "youtube.com");
        assert!(reg.find("music.youtube.com").is_none());
    }

    #[test]
    fn fallback_scans_patterns_in_order() {
        let reg = registry(
            r#"
            [[rule]]
            name = "first"
            patterns = ['\.example\.com$']
            type = "param_clean"

            [[rule]]
            name = "second"
            patterns = ['^a\.example\.com$']
            type = "no_op"
            "#,
        );
        let rule = reg.find("a.example.com").unwrap();
        assert_eq!(rule.name, "first");
        assert_eq!(rule.kind(), RuleKind::ParamClean);
        assert!(reg.find("example.org").is_none());
    }

    #[test]
    fn exact_beats_pattern() {
        let reg = registry(
            r#"
            [[rule]]
            name = "wildcard"
            patterns = ['example\.com$']
            type = "param_clean"

            [[rule]]
            name = "exact"
            hostnames = ["shop.example.com"]
            type = "no_op"
            "#,
        );
        assert_eq!(reg.find("shop.example.com").unwrap().name, "exact");
        assert_eq!(reg.find("blog.example.com").unwrap().name, "wildcard");
    }

    #[test]
    fn patterns_ignored_when_hostnames_present() {
        let reg = registry(
            r#"
            [[rule]]
            hostnames = ["bilibili.com"]
            patterns = ['bilibili\.com$']
            type = "param_clean"
            "#,
        );
        assert!(reg.find("m.bilibili.com").is_none());
    }

    #[test]
    fn duplicate_hostname_is_error() {
        let specs = parse_rule_file(
            r#"
            [[rule]]
            name = "one"
            hostnames = ["dup.com"]
            type = "no_op"

            [[rule]]
            name = "two"
            hostnames = ["DUP.com"]
            type = "param_clean"
            "#,
        )
        .unwrap();
        let err = RuleRegistry::from_specs(specs).unwrap_err();
        match err {
            RuleError::DuplicateHostname {
                hostname,
                first,
                second,
            } => {
                assert_eq!(hostname, "dup.com");
                assert_eq!(first, "one");
                assert_eq!(second, "two");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn builtin_registry_builds() {
        let reg = RuleRegistry::with_builtin(Vec::new()).unwrap();
        assert!(!reg.is_empty());
        assert_eq!(reg.find("x.com").unwrap().kind(), RuleKind::HostReplace);
        assert_eq!(reg.find("3.cn").unwrap().kind(), RuleKind::GetRedirect);
        assert_eq!(reg.find("cfe.m.jd.com").unwrap().kind(), RuleKind::ParamExtract);
        assert!(reg.find("surl.amap.com").is_none());
    }

    #[test]
    fn extra_rules_colliding_with_builtin_are_rejected() {
        let extra = parse_rule_file(
            r#"
            [[rule]]
            hostnames = ["x.com"]
            type = "no_op"
            "#,
        )
        .unwrap();
        assert!(RuleRegistry::with_builtin(extra).is_err());
    }
}
