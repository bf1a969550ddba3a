//! Outbound HTTP for the resolver: redirect probes and bounded page reads.
//!
//! Uses the curl crate (libcurl). All calls block; async callers go through
//! `tokio::task::spawn_blocking`.

mod client;
pub mod decode;
mod parse;

pub use client::{download_text, CurlFetcher, FetchOptions};

use anyhow::Result;
use url::Url;

/// Status and `Location` of a response fetched without following redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectProbe {
    pub status: u32,
    pub location: Option<String>,
}

impl RedirectProbe {
    /// Absolute redirect target for a 301/302 with a usable `Location`, resolved against `base`.
    pub fn redirect_target(&self, base: &Url) -> Option<Url> {
        if self.status != 301 && self.status != 302 {
            return None;
        }
        let location = self.location.as_deref()?.trim();
        if location.is_empty() {
            return None;
        }
        base.join(location).ok()
    }
}

/// Body prefix of a page fetched with transport redirects followed.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after libcurl followed any redirects.
    pub final_url: String,
    pub body: String,
    /// True if the read stopped at the byte limit.
    pub truncated: bool,
}

/// Network seam used by the resolver.
pub trait Fetcher: Send + Sync {
    /// HEAD without following redirects.
    fn head(&self, url: &str) -> Result<RedirectProbe>;
    /// GET without following redirects; the body is not read.
    fn get_manual(&self, url: &str) -> Result<RedirectProbe>;
    /// GET following redirects; reads at most the configured number of body bytes.
    fn get_page(&self, url: &str) -> Result<FetchedPage>;
}
