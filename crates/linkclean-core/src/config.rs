use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::rules::{load_rule_file, RuleSpec};

/// AdGuard "Tracking Parameters" filter list.
pub const DEFAULT_FILTER_LIST_URL: &str =
    "https://raw.githubusercontent.com/AdguardTeam/FiltersRegistry/master/filters/filter_17_TrackParam/filter.txt";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15 (Bot; +https://github.com/TGBot-LinkCleaner)";

/// Global configuration loaded from `~/.config/linkclean/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkCleanConfig {
    /// Filter list downloaded by `update-rules`.
    pub filter_list_url: String,
    /// User-Agent sent with every probe and page fetch.
    pub user_agent: String,
    /// Timeout for the redirect-probe HEAD request.
    pub head_timeout_secs: u64,
    /// Timeout for GET requests (`get_redirect`, `dom_extract`).
    pub fetch_timeout_secs: u64,
    /// Timeout for downloading the filter list.
    pub download_timeout_secs: u64,
    /// Bytes of page body read before `dom_extract` stops.
    pub page_read_limit_bytes: usize,
    /// Rows per multi-row INSERT when replacing the rule store.
    pub insert_batch_size: usize,
    /// Interval between scheduled filter list refreshes.
    pub refresh_interval_hours: u64,
    /// Optional TOML file with additional `[[rule]]` entries.
    pub extra_rules_path: Option<PathBuf>,
    /// Override for the rule database location (default: XDG state dir).
    pub db_path: Option<PathBuf>,
}

impl Default for LinkCleanConfig {
    fn default() -> Self {
        Self {
            filter_list_url: DEFAULT_FILTER_LIST_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            head_timeout_secs: 6,
            fetch_timeout_secs: 8,
            download_timeout_secs: 60,
            page_read_limit_bytes: 128 * 1024,
            insert_batch_size: 100,
            refresh_interval_hours: 24,
            extra_rules_path: None,
            db_path: None,
        }
    }
}

impl LinkCleanConfig {
    /// Rules from `extra_rules_path`, or none if unset.
    pub fn load_extra_rules(&self) -> Result<Vec<RuleSpec>> {
        match &self.extra_rules_path {
            Some(path) => load_rule_file(path),
            None => Ok(Vec::new()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("linkclean")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LinkCleanConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LinkCleanConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: LinkCleanConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
