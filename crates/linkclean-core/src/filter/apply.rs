//! Filter applier: strip query parameters named by stored tracking rules.

use regex::Regex;
use std::collections::HashSet;
use url::Url;

use super::types::{RuleType, TrackingRule, GLOBAL_DOMAIN};
use crate::rule_db::RuleDb;
use crate::url_model::{query_pairs, set_query_pairs};

/// Deepest number of hostname labels turned into lookup candidates.
const MAX_SUFFIX_LABELS: usize = 4;

/// Store lookup keys for `hostname`: the global sentinel, each dot-suffix of
/// the last four labels, and `*.<suffix>` for multi-label suffixes.
///
/// `a.b.c.com` yields `global, a.b.c.com, *.a.b.c.com, b.c.com, *.b.c.com,
/// c.com, *.c.com, com`.
pub fn domain_candidates(hostname: &str) -> Vec<String> {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = hostname.split('.').filter(|l| !l.is_empty()).collect();

    let mut out = vec![GLOBAL_DOMAIN.to_string()];
    let start = labels.len().saturating_sub(MAX_SUFFIX_LABELS);
    for i in start..labels.len() {
        let suffix_labels = &labels[i..];
        let suffix = suffix_labels.join(".");
        if suffix_labels.len() > 1 {
            push_unique(&mut out, suffix.clone());
            push_unique(&mut out, format!("*.{suffix}"));
        } else {
            push_unique(&mut out, suffix);
        }
    }
    out
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Matched rules partitioned into literal/regex remove/protect buckets.
#[derive(Debug, Default)]
pub struct ParamRules {
    remove: HashSet<String>,
    protect: HashSet<String>,
    remove_re: Vec<Regex>,
    protect_re: Vec<Regex>,
}

impl ParamRules {
    /// Bucket every rule whose path prefix matches `path`. Malformed stored
    /// regexes are logged and skipped.
    pub fn collect<'a>(path: &str, rules: impl IntoIterator<Item = &'a TrackingRule>) -> Self {
        let mut out = ParamRules::default();
        for rule in rules {
            if !rule.applies_to_path(path) {
                continue;
            }
            if rule.is_regex {
                let re = match Regex::new(rule.regex_body()) {
                    Ok(re) => re,
                    Err(e) => {
                        tracing::warn!(param = %rule.param_name, "invalid regex in rule store: {}", e);
                        continue;
                    }
                };
                match rule.rule_type {
                    RuleType::Remove => out.remove_re.push(re),
                    RuleType::Allow => out.protect_re.push(re),
                }
            } else {
                let name = rule.param_name.to_lowercase();
                match rule.rule_type {
                    RuleType::Remove => out.remove.insert(name),
                    RuleType::Allow => out.protect.insert(name),
                };
            }
        }
        out
    }

    /// Whether any removal applies; protect-only sets never change a URL.
    pub fn has_removals(&self) -> bool {
        !self.remove.is_empty() || !self.remove_re.is_empty()
    }

    pub fn is_protected(&self, param: &str) -> bool {
        self.protect.contains(&param.to_lowercase()) || self.protect_re.iter().any(|r| r.is_match(param))
    }

    /// Protection always wins over removal.
    pub fn should_remove(&self, param: &str) -> bool {
        if self.is_protected(param) {
            return false;
        }
        self.remove.contains(&param.to_lowercase()) || self.remove_re.iter().any(|r| r.is_match(param))
    }
}

/// Strip parameters matched by `rules`. Returns `None` when nothing was removed,
/// so callers can keep the original URL (and its exact serialization).
pub fn strip_tracking_params(url: &Url, rules: &[TrackingRule]) -> Option<Url> {
    if url.query().is_none() || rules.is_empty() {
        return None;
    }
    let buckets = ParamRules::collect(url.path(), rules);
    if !buckets.has_removals() {
        return None;
    }

    let pairs = query_pairs(url);
    let before = pairs.len();
    let kept: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(name, _)| !buckets.should_remove(name))
        .collect();
    if kept.len() == before {
        return None;
    }

    let mut out = url.clone();
    set_query_pairs(&mut out, &kept);
    Some(out)
}

/// Consult the store and strip tracking parameters from `url`.
///
/// Store failures are logged and leave the URL unchanged.
pub async fn apply_tracking_rules(url: &Url, db: &RuleDb) -> Url {
    let Some(host) = url.host_str() else {
        return url.clone();
    };
    if url.query().is_none() {
        return url.clone();
    }
    let candidates = domain_candidates(host);
    let rules = match db.find_by_domains(&candidates).await {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!(%url, "tracking rule lookup failed: {:#}", e);
            return url.clone();
        }
    };
    match strip_tracking_params(url, &rules) {
        Some(cleaned) => {
            tracing::debug!(from = %url, to = %cleaned, matched = rules.len(), "tracking params stripped");
            cleaned
        }
        None => url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remove(domain: &str, param: &str) -> TrackingRule {
        TrackingRule {
            domain: domain.into(),
            path_pattern: None,
            param_name: param.into(),
            rule_type: RuleType::Remove,
            is_regex: param.starts_with('/') && param.len() > 2 && param.ends_with('/'),
        }
    }

    fn protect(domain: &str, param: &str) -> TrackingRule {
        TrackingRule {
            rule_type: RuleType::Allow,
            ..remove(domain, param)
        }
    }

    fn strip(input: &str, rules: &[TrackingRule]) -> Option<String> {
        strip_tracking_params(&Url::parse(input).unwrap(), rules).map(|u| u.to_string())
    }

    #[test]
    fn candidates_for_deep_host() {
        assert_eq!(
            domain_candidates("x.a.b.c.com"),
            vec![
                "global", "a.b.c.com", "*.a.b.c.com", "b.c.com", "*.b.c.com", "c.com", "*.c.com",
                "com"
            ]
        );
    }

    #[test]
    fn candidates_for_two_label_host() {
        assert_eq!(
            domain_candidates("Shop.Example"),
            vec!["global", "shop.example", "*.shop.example", "example"]
        );
    }

    #[test]
    fn candidates_for_single_label_host() {
        assert_eq!(domain_candidates("localhost"), vec!["global", "localhost"]);
    }

    #[test]
    fn strips_literal_case_insensitive() {
        assert_eq!(
            strip(
                "https://shop.example/item?id=7&UTM_Campaign=x",
                &[remove("example", "utm_campaign")]
            )
            .as_deref(),
            Some("https://shop.example/item?id=7")
        );
    }

    #[test]
    fn strips_by_regex() {
        assert_eq!(
            strip(
                "https://a.com/?utm_source=1&keep=2&utm_medium=3",
                &[remove("global", "/^utm_/")]
            )
            .as_deref(),
            Some("https://a.com/?keep=2")
        );
    }

    #[test]
    fn protect_overrides_remove_regardless_of_order() {
        let url = "https://a.com/?id=1&ref=2";
        let expected = Some("https://a.com/?id=1".to_string());
        assert_eq!(
            strip(url, &[protect("a.com", "id"), remove("global", "id"), remove("global", "ref")]),
            expected
        );
        assert_eq!(
            strip(url, &[remove("global", "id"), remove("global", "ref"), protect("a.com", "id")]),
            expected
        );
        assert_eq!(
            strip(url, &[remove("global", "/.*/"), protect("a.com", "/^i/")]),
            expected
        );
    }

    #[test]
    fn nothing_removed_returns_none() {
        assert_eq!(strip("https://a.com/?id=1", &[remove("global", "fbclid")]), None);
        assert_eq!(strip("https://a.com/", &[remove("global", "fbclid")]), None);
        assert_eq!(strip("https://a.com/?fbclid=1", &[]), None);
    }

    #[test]
    fn protect_only_rules_have_no_removals() {
        let rules = [protect("a.com", "id"), protect("global", "/^utm_/")];
        let buckets = ParamRules::collect("/", &rules);
        assert!(!buckets.has_removals());
        assert!(buckets.is_protected("utm_source"));
        assert_eq!(strip("https://a.com/?id=1&utm_source=x", &rules), None);

        let mixed = ParamRules::collect("/", &[protect("a.com", "id"), remove("global", "ref")]);
        assert!(mixed.has_removals());
    }

    #[test]
    fn path_prefix_limits_rule() {
        let mut rule = remove("a.com", "ref");
        rule.path_pattern = Some("/shop".into());
        assert_eq!(strip("https://a.com/blog?ref=1", &[rule.clone()]), None);
        assert_eq!(
            strip("https://a.com/shop/x?ref=1", &[rule]).as_deref(),
            Some("https://a.com/shop/x")
        );
    }

    #[test]
    fn malformed_stored_regex_is_skipped() {
        let bad = TrackingRule {
            is_regex: true,
            ..remove("global", "/(oops/")
        };
        assert_eq!(
            strip("https://a.com/?oops=1&fbclid=2", &[bad, remove("global", "fbclid")]).as_deref(),
            Some("https://a.com/?oops=1")
        );
    }

    #[test]
    fn repeated_parameter_removed_everywhere() {
        assert_eq!(
            strip("https://a.com/?s=1&id=2&s=3", &[remove("global", "s")]).as_deref(),
            Some("https://a.com/?id=2")
        );
    }

    #[tokio::test]
    async fn store_backed_cleanup() {
        let db = crate::rule_db::open_memory().await.unwrap();
        db.replace_all(&[remove("example", "utm_campaign")], 100)
            .await
            .unwrap();
        let url = Url::parse("https://shop.example/item?id=7&utm_campaign=x").unwrap();
        let out = apply_tracking_rules(&url, &db).await;
        assert_eq!(out.as_str(), "https://shop.example/item?id=7");

        let untouched = Url::parse("https://other.test/?utm_campaign=x").unwrap();
        assert_eq!(apply_tracking_rules(&untouched, &db).await, untouched);
    }
}
