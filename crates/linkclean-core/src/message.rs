//! Message-level helpers on top of the resolver: find links in free text,
//! clean them concurrently, and rewrite the text with the results.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

use crate::resolver::Resolver;
use crate::rule_db::RuleDb;
use crate::url_model::{query_pairs, set_query_pairs};

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[A-Za-z0-9_\-.]+(?::[0-9]+)?(?:/[A-Za-z0-9_\-./\[\]?%&=+#,;@~]*)?")
        .unwrap()
});

/// Every `http(s)://` link in `text`, in order of appearance.
pub fn extract_links(text: &str) -> Vec<String> {
    LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Resolve `links` concurrently (one task per link). Output order matches input;
/// a link whose task fails is returned unchanged.
pub async fn clean_links(
    resolver: Arc<Resolver>,
    links: Vec<String>,
    db: Option<RuleDb>,
) -> Vec<String> {
    let mut tasks = JoinSet::new();
    for (idx, link) in links.iter().cloned().enumerate() {
        let resolver = Arc::clone(&resolver);
        let db = db.clone();
        tasks.spawn(async move {
            let cleaned = resolver.resolve(&link, db.as_ref()).await;
            (idx, cleaned)
        });
    }

    let mut out = links;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, cleaned)) => out[idx] = cleaned,
            Err(e) => tracing::warn!("link task failed: {}", e),
        }
    }
    out
}

/// Replace the first occurrence of each raw link with its cleaned form.
pub fn rewrite_text(text: &str, pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .fold(text.to_string(), |acc, (raw, cleaned)| acc.replacen(raw.as_str(), cleaned, 1))
}

/// Whether cleaning changed the link, ignoring trailing slashes.
pub fn is_changed(original: &str, cleaned: &str) -> bool {
    match (Url::parse(original), Url::parse(cleaned)) {
        (Ok(a), Ok(b)) => a.as_str().trim_end_matches('/') != b.as_str().trim_end_matches('/'),
        _ => original != cleaned,
    }
}

/// Query parameter names of `original` a user may restore after cleaning,
/// in order of first appearance. Empty when the host changed (mirror links).
pub fn restorable_params(original: &str, cleaned: &str) -> Vec<String> {
    let (Ok(raw), Ok(out)) = (Url::parse(original), Url::parse(cleaned)) else {
        return Vec::new();
    };
    if raw.host_str() != out.host_str() {
        return Vec::new();
    }
    let mut names: Vec<String> = Vec::new();
    for (name, _) in query_pairs(&raw) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Toggle `param` on `current`: drop it if present, otherwise restore its
/// value from `original` (if it had one). Parameters come back sorted by name.
pub fn toggle_param(current: &str, original: &str, param: &str) -> Result<String> {
    let mut url = Url::parse(current).with_context(|| format!("invalid URL {}", current))?;
    let mut pairs = query_pairs(&url);

    if pairs.iter().any(|(k, _)| k == param) {
        pairs.retain(|(k, _)| k != param);
    } else {
        let original = Url::parse(original).with_context(|| format!("invalid URL {}", original))?;
        if let Some((k, v)) = query_pairs(&original).into_iter().find(|(k, _)| k == param) {
            pairs.push((k, v));
        }
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    set_query_pairs(&mut url, &pairs);
    Ok(url.into())
}
