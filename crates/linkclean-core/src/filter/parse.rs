//! `$removeparam` filter-list parser.
//!
//! Understands the subset of the ad-filter syntax used by tracking-parameter
//! lists:
//!
//! - `||example.com^$removeparam=id`
//! - `@@||example.com/path$removeparam=id` (exception)
//! - `$removeparam=utm_source` (global)
//! - `$removeparam=/^utm_/,domain=a.com|~b.com`
//!
//! Anything else yields no rules. Parsing never fails: unusable lines are
//! dropped (with a warning when they looked like rules).

use regex::Regex;

use super::types::{is_regex_literal, strip_regex_slashes, RuleType, TrackingRule, GLOBAL_DOMAIN};

const REMOVEPARAM: &str = "$removeparam=";
const DOMAIN_OPTION: &str = "domain=";

/// Parse a whole filter list. Duplicates are kept.
pub fn parse_filter_list(text: &str) -> Vec<TrackingRule> {
    text.lines().flat_map(parse_rule).collect()
}

/// Parse one filter line into zero or more rules.
pub fn parse_rule(raw_line: &str) -> Vec<TrackingRule> {
    let mut line = raw_line.trim();
    if line.is_empty() || is_comment_line(line) || !line.contains(REMOVEPARAM) {
        return Vec::new();
    }

    let mut rule_type = RuleType::Remove;
    if let Some(rest) = line.strip_prefix("@@") {
        rule_type = RuleType::Allow;
        line = rest;
    }

    let Some((target, modifiers)) = line.split_once(REMOVEPARAM) else {
        return Vec::new();
    };

    let tokens = split_modifiers(modifiers);
    let Some(param) = tokens.first().map(|t| unescape_commas(t.trim())) else {
        return Vec::new();
    };
    if param.is_empty() {
        tracing::warn!(line = raw_line, "filter line has an empty $removeparam value");
        return Vec::new();
    }
    let domain_option = tokens
        .iter()
        .skip(1)
        .find_map(|t| t.trim().strip_prefix(DOMAIN_OPTION));

    let is_regex = is_regex_literal(&param);
    if is_regex {
        if let Err(e) = Regex::new(strip_regex_slashes(&param)) {
            tracing::warn!(line = raw_line, "discarding filter line with invalid regex: {}", e);
            return Vec::new();
        }
    }

    let (initial_domain, initial_path) = parse_target(target);
    let make = |domain: &str, rule_type: RuleType| TrackingRule {
        domain: domain.to_string(),
        path_pattern: initial_path.clone(),
        param_name: param.clone(),
        rule_type,
        is_regex,
    };

    match domain_option {
        Some(list) => list
            .split('|')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .filter_map(|d| match d.strip_prefix('~') {
                // `~domain` excludes the domain from removal: store it as protected.
                Some(excluded) if !excluded.is_empty() => Some(make(excluded, RuleType::Allow)),
                Some(_) => None,
                None => Some(make(d, rule_type)),
            })
            .collect(),
        None => vec![make(&initial_domain, rule_type)],
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

/// Split the modifier list on commas not escaped as `\,`.
fn split_modifiers(modifiers: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev = None;
    for (i, c) in modifiers.char_indices() {
        if c == ',' && prev != Some('\\') {
            tokens.push(&modifiers[start..i]);
            start = i + 1;
        }
        prev = Some(c);
    }
    tokens.push(&modifiers[start..]);
    tokens
}

fn unescape_commas(token: &str) -> String {
    token.replace("\\,", ",")
}

/// Derive `(domain, path prefix)` from the part before `$removeparam=`.
fn parse_target(target: &str) -> (String, Option<String>) {
    let target = target.trim();

    let (domain, path) = if let Some(body) = target.strip_prefix("||") {
        match body.find(['^', '/']) {
            Some(idx) if body[idx..].starts_with('/') => (&body[..idx], Some(&body[idx..])),
            Some(idx) => (&body[..idx], None),
            None => (body, None),
        }
    } else {
        match target.find('/') {
            Some(0) => ("", Some(target)),
            Some(idx) => (&target[..idx], Some(&target[idx..])),
            None => (target, None),
        }
    };

    let domain = if domain.is_empty() {
        GLOBAL_DOMAIN.to_string()
    } else {
        domain.to_ascii_lowercase()
    };
    // Trailing separators/wildcards carry no meaning for a literal prefix match.
    let path = path
        .map(|p| p.trim_end_matches(['^', '*', '|']))
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    (domain, path)
}
