//! Rule applier: host, path and query rewriting for a matched rule.

use url::Url;

use super::types::{Rule, RuleAction};
use crate::url_model::{query_pairs, set_query_pairs};

/// Rewrite `url` according to `rule`. Returns a new URL; the input is untouched.
///
/// Only `host_replace` and `param_clean` transform anything. Parameter
/// retention depends on whether `keep_params` was declared at all:
/// declared lists act as case-insensitive allow-lists, an absent list keeps
/// everything for `host_replace` and drops everything for `param_clean`.
pub fn apply_rule(url: &Url, rule: &Rule) -> Url {
    let (new_host, params, keep_when_unlisted) = match &rule.action {
        RuleAction::HostReplace { new_host, params } => (new_host.as_deref(), params, true),
        RuleAction::ParamClean { params } => (None, params, false),
        _ => return url.clone(),
    };

    let mut out = url.clone();

    if let Some(host) = new_host {
        if let Err(e) = out.set_host(Some(host)) {
            tracing::warn!(rule = %rule.name, host, "cannot set host: {}", e);
        }
    }

    if !params.path_replace.is_empty() {
        let mut path = out.path().to_string();
        for entry in &params.path_replace {
            path = entry
                .pattern
                .replacen(&path, 1, entry.replacement.as_str())
                .into_owned();
        }
        out.set_path(&path);
    }

    let kept: Vec<(String, String)> = query_pairs(&out)
        .into_iter()
        .filter_map(|(key, value)| {
            let effective = params.effective_key(&key).to_string();
            params
                .retains(&effective, keep_when_unlisted)
                .then_some((effective, value))
        })
        .collect();
    set_query_pairs(&mut out, &kept);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{parse_rule_file, RuleRegistry};

    fn rule(toml_src: &str) -> Rule {
        let reg = RuleRegistry::from_specs(parse_rule_file(toml_src).unwrap()).unwrap();
        let first = reg.iter().next().unwrap().clone();
        first
    }

    fn apply(rule: &Rule, input: &str) -> String {
        apply_rule(&Url::parse(input).unwrap(), rule).to_string()
    }

    #[test]
    fn host_replace_with_empty_keep_strips_everything() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["x.com"]
            path_pattern = '/status/'
            type = "host_replace"
            new_host = "fxtwitter.com"
            keep_params = []
            "#,
        );
        assert_eq!(
            apply(&r, "https://x.com/user/status/123?utm_source=app&s=46"),
            "https://fxtwitter.com/user/status/123"
        );
    }

    #[test]
    fn host_replace_without_keep_preserves_everything() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["mirror.example"]
            type = "host_replace"
            new_host = "other.example"
            "#,
        );
        assert_eq!(
            apply(&r, "https://mirror.example/a?x=1&Y=2"),
            "https://other.example/a?x=1&Y=2"
        );
    }

    #[test]
    fn param_clean_without_keep_drops_everything() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["tracker.com"]
            type = "param_clean"
            "#,
        );
        assert_eq!(
            apply(&r, "https://tracker.com/p?id=1&ref=2"),
            "https://tracker.com/p"
        );
    }

    #[test]
    fn param_clean_keep_list_is_case_insensitive_and_ordered() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["youtube.com"]
            type = "param_clean"
            keep_params = ["v", "t"]
            "#,
        );
        assert_eq!(
            apply(&r, "https://youtube.com/watch?si=abc&T=42&v=dQw4&feature=share"),
            "https://youtube.com/watch?T=42&v=dQw4"
        );
    }

    #[test]
    fn param_map_renames_before_retention() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["pages-fast.m.taobao.com"]
            type = "host_replace"
            new_host = "item.taobao.com"
            path_replace = [{ match = '^.*$', replace = "/item.htm" }]
            param_map = { itemIds = "id" }
            keep_params = ["id"]
            "#,
        );
        assert_eq!(
            apply(
                &r,
                "https://pages-fast.m.taobao.com/wow/z/app/detail?ITEMIDS=6789&spm=a.b"
            ),
            "https://item.taobao.com/item.htm?id=6789"
        );
    }

    #[test]
    fn path_replace_first_match_only() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["item.m.jd.com"]
            type = "host_replace"
            new_host = "item.jd.com"
            path_replace = [{ match = 'product/', replace = "" }]
            keep_params = []
            "#,
        );
        assert_eq!(
            apply(&r, "https://item.m.jd.com/product/product/100.html?x=1"),
            "https://item.jd.com/product/100.html"
        );
    }

    #[test]
    fn non_transform_kinds_leave_url_alone() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["cfe.m.jd.com"]
            type = "param_extract"
            param_name = "returnurl"
            "#,
        );
        let input = "https://cfe.m.jd.com/risk?from=1";
        assert_eq!(apply(&r, input), input);
    }

    #[test]
    fn param_clean_with_empty_keep_strips_all_and_leaves_input() {
        let r = rule(
            r#"
            [[rule]]
            hostnames = ["tracker.com"]
            type = "param_clean"
            keep_params = []
            "#,
        );
        let url = Url::parse("https://tracker.com/?a=1&B=2").unwrap();
        let cleaned = apply_rule(&url, &r);
        assert_eq!(cleaned.as_str(), "https://tracker.com/");
        assert_eq!(url.as_str(), "https://tracker.com/?a=1&B=2");
    }
}
