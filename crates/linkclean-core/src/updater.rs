//! Scheduled refresh of the tracking-rule store from the filter list.
//!
//! The store is only touched after the list was downloaded and parsed into at
//! least one rule; a failed download or an empty parse leaves it as it was.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::LinkCleanConfig;
use crate::fetch::download_text;
use crate::filter::parse_filter_list;
use crate::rule_db::RuleDb;

/// Outcome of one refresh, serialized as `{"status": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UpdateReport {
    /// Store replaced with `count` rules in `time` seconds.
    Ok { count: u64, time: f64 },
    /// Nothing parsed; store left untouched.
    Skipped { message: String },
    Error { message: String },
}

impl UpdateReport {
    fn error(e: &anyhow::Error) -> Self {
        UpdateReport::Error {
            message: format!("{:#}", e),
        }
    }
}

/// Parse `text` and, if it yields any rules, replace the store with them.
pub async fn refresh_from_text(db: &RuleDb, text: &str, batch_size: usize) -> UpdateReport {
    let started = Instant::now();
    let rules = parse_filter_list(text);
    if rules.is_empty() {
        tracing::warn!("filter list produced no rules; keeping existing store");
        return UpdateReport::Skipped {
            message: "no valid rules parsed".to_string(),
        };
    }

    match db.replace_all(&rules, batch_size).await {
        Ok(count) => {
            let time = started.elapsed().as_secs_f64();
            tracing::info!(count, time, "tracking rules replaced");
            UpdateReport::Ok { count, time }
        }
        Err(e) => {
            tracing::warn!("rule store update failed: {:#}", e);
            UpdateReport::error(&e)
        }
    }
}

/// Download the configured filter list and refresh the store.
pub async fn refresh(db: &RuleDb, cfg: &LinkCleanConfig) -> UpdateReport {
    match fetch_filter_list(cfg).await {
        Ok(text) => refresh_from_text(db, &text, cfg.insert_batch_size).await,
        Err(e) => {
            tracing::warn!(url = %cfg.filter_list_url, "filter list download failed: {:#}", e);
            UpdateReport::error(&e)
        }
    }
}

async fn fetch_filter_list(cfg: &LinkCleanConfig) -> Result<String> {
    let url = cfg.filter_list_url.clone();
    let user_agent = cfg.user_agent.clone();
    let timeout = Duration::from_secs(cfg.download_timeout_secs);
    tokio::task::spawn_blocking(move || download_text(&url, &user_agent, timeout))
        .await
        .context("download task failed")?
}

/// Refresh now and then every `refresh_interval_hours`, forever.
pub async fn run_periodic(db: &RuleDb, cfg: &LinkCleanConfig) {
    let hours = cfg.refresh_interval_hours.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(hours * 3600));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let report = refresh(db, cfg).await;
        tracing::info!(?report, "scheduled refresh finished");
    }
}
