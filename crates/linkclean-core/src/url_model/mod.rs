//! URL helpers shared by the rule applier, the filter applier and the message seam.
//!
//! Query strings are decoded into ordered `(name, value)` pairs and rebuilt with
//! form-urlencoding, so rewritten URLs serialize the same way regardless of
//! which tier touched them.

use url::Url;

/// Decoded query parameters in their original order.
pub fn query_pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs().into_owned().collect()
}

/// Replaces the query of `url` with `pairs`. An empty list removes the `?` entirely.
pub fn set_query_pairs(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// First value of the query parameter named exactly `name`, if present and non-empty.
pub fn first_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Lowercased hostname of `url`, or `None` for host-less URLs (`mailto:`, `data:`).
pub fn hostname(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_ascii_lowercase())
}
