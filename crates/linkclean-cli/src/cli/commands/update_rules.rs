//! `linkclean update-rules` – refresh the tracking-rule store.

use anyhow::{Context, Result};
use linkclean_core::config::LinkCleanConfig;
use linkclean_core::rule_db::RuleDb;
use linkclean_core::updater::{self, UpdateReport};
use std::path::Path;

pub async fn run_update_rules(
    db: &RuleDb,
    cfg: &LinkCleanConfig,
    from_file: Option<&Path>,
    watch: bool,
) -> Result<()> {
    if watch {
        println!(
            "Refreshing {} every {}h (Ctrl-C to stop).",
            cfg.filter_list_url, cfg.refresh_interval_hours
        );
        updater::run_periodic(db, cfg).await;
        return Ok(());
    }

    let report = match from_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read filter list {}", path.display()))?;
            updater::refresh_from_text(db, &text, cfg.insert_batch_size).await
        }
        None => updater::refresh(db, cfg).await,
    };

    println!("{}", serde_json::to_string(&report)?);
    if let UpdateReport::Error { message } = report {
        anyhow::bail!("rule update failed: {}", message);
    }
    Ok(())
}
