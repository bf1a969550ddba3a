//! Link resolution: rule tier, tracking-filter tier, redirect-probe tier.
//!
//! Each step works on one URL and either finishes or hands the next link to
//! the loop one depth deeper. Past `MAX_DEPTH` the current link is returned
//! unresolved, so redirect cycles terminate.

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::Arc;
use url::Url;

use crate::config::LinkCleanConfig;
use crate::fetch::{CurlFetcher, Fetcher};
use crate::filter::apply_tracking_rules;
use crate::rule_db::RuleDb;
use crate::rules::{apply_rule, RuleAction, RuleRegistry};
use crate::url_model::first_param;

/// Deepest level that still runs a step.
pub const MAX_DEPTH: u8 = 3;

/// Only web URLs ever reach the fetcher.
fn fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Outcome of one resolution step.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Done(String),
    Follow(String),
}

/// Resolves raw links to cleaned, final URLs. Shared across tasks via `Arc`.
pub struct Resolver {
    registry: Arc<RuleRegistry>,
    fetcher: Arc<dyn Fetcher>,
}

impl Resolver {
    pub fn new(registry: Arc<RuleRegistry>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { registry, fetcher }
    }

    /// Built-in plus configured extra rules, curl fetcher with configured timeouts.
    pub fn from_config(cfg: &LinkCleanConfig) -> Result<Self> {
        let extra = cfg.load_extra_rules()?;
        let registry = RuleRegistry::with_builtin(extra).context("build rule registry")?;
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(CurlFetcher::from_config(cfg)),
        ))
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Resolve `link`. Never fails: anything that goes wrong yields the best URL so far.
    pub async fn resolve(&self, link: &str, db: Option<&RuleDb>) -> String {
        self.resolve_from(link, 0, db).await
    }

    /// Resolve starting at `depth` (links reached through an earlier hop).
    pub async fn resolve_from(&self, link: &str, depth: u8, db: Option<&RuleDb>) -> String {
        let mut current = link.to_string();
        let mut depth = depth;
        loop {
            if depth > MAX_DEPTH {
                tracing::debug!(link = %current, "depth limit reached");
                return current;
            }
            match self.step(&current, depth, db).await {
                Step::Done(out) => return out,
                Step::Follow(next) => {
                    current = next;
                    depth += 1;
                }
            }
        }
    }

    async fn step(&self, link: &str, depth: u8, db: Option<&RuleDb>) -> Step {
        let mut url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(link, "not a URL: {}", e);
                return Step::Done(link.to_string());
            }
        };
        tracing::debug!(%url, depth, "resolving");

        // Rule tier
        let host = url.host_str().unwrap_or_default();
        match self.registry.find(host) {
            Some(rule) if rule.matches_path(url.path()) => {
                tracing::debug!(rule = %rule.name, kind = rule.kind().as_str(), %url, "rule matched");
                match &rule.action {
                    RuleAction::NoOp => return Step::Done(link.to_string()),
                    RuleAction::DomExtract { selector } => {
                        return self.dom_extract(url, selector.as_ref()).await
                    }
                    RuleAction::GetRedirect => return self.get_redirect(url).await,
                    RuleAction::ParamExtract { param_name } => {
                        if let Some(inner) = first_param(&url, param_name) {
                            tracing::debug!(param = %param_name, %inner, "parameter extracted");
                            return Step::Follow(inner);
                        }
                    }
                    RuleAction::HostReplace { .. } | RuleAction::ParamClean { .. } => {}
                }
                url = apply_rule(&url, rule);
            }
            Some(rule) => {
                tracing::debug!(rule = %rule.name, path = url.path(), "rule skipped: path mismatch");
            }
            None => tracing::debug!(host, "no rule matched"),
        }

        // Tracking-filter tier
        if let Some(db) = db {
            url = apply_tracking_rules(&url, db).await;
        }

        if !fetchable(&url) {
            tracing::debug!(%url, "not an http(s) URL; skipping network");
            return Step::Done(url.into());
        }

        // Redirect-probe tier
        match self.fetch(&url, |f, u| f.head(u)).await {
            Ok(probe) => {
                if let Some(next) = probe.redirect_target(&url) {
                    tracing::debug!(from = %url, to = %next, status = probe.status, "redirect");
                    return Step::Follow(next.into());
                }
            }
            Err(e) => tracing::debug!(%url, "redirect probe failed: {:#}", e),
        }
        Step::Done(url.into())
    }

    async fn dom_extract(&self, url: Url, selector: Option<&Regex>) -> Step {
        if !fetchable(&url) {
            return Step::Done(url.into());
        }
        let page = match self.fetch(&url, |f, u| f.get_page(u)).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(%url, "page fetch failed: {:#}", e);
                return Step::Done(url.into());
            }
        };
        tracing::debug!(
            %url,
            final_url = %page.final_url,
            bytes = page.body.len(),
            truncated = page.truncated,
            "page fetched"
        );

        match selector {
            Some(re) => {
                let found = re
                    .captures(&page.body)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty());
                if let Some(found) = found {
                    tracing::debug!(%found, "selector matched");
                    return Step::Follow(found.to_string());
                }
            }
            None if page.final_url != url.as_str() => return Step::Follow(page.final_url),
            None => {}
        }
        Step::Done(url.into())
    }

    async fn get_redirect(&self, url: Url) -> Step {
        if !fetchable(&url) {
            return Step::Done(url.into());
        }
        match self.fetch(&url, |f, u| f.get_manual(u)).await {
            Ok(probe) => {
                if let Some(next) = probe.redirect_target(&url) {
                    tracing::debug!(from = %url, to = %next, "GET redirect");
                    return Step::Follow(next.into());
                }
            }
            Err(e) => tracing::debug!(%url, "GET redirect probe failed: {:#}", e),
        }
        Step::Done(url.into())
    }

    /// Run a blocking fetcher call off the async runtime.
    async fn fetch<T, F>(&self, url: &Url, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Fetcher, &str) -> Result<T> + Send + 'static,
    {
        let fetcher = Arc::clone(&self.fetcher);
        let url = url.to_string();
        tokio::task::spawn_blocking(move || op(fetcher.as_ref(), &url))
            .await
            .context("fetch task failed")?
    }
}
