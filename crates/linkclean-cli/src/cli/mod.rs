//! CLI for the linkclean URL cleaner.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkclean_core::config::{self, LinkCleanConfig};
use linkclean_core::resolver::Resolver;
use linkclean_core::rule_db::RuleDb;
use std::path::PathBuf;
use std::sync::Arc;

use commands::{run_clean, run_match, run_text, run_toggle, run_update_rules};

/// Top-level CLI for linkclean.
#[derive(Debug, Parser)]
#[command(name = "linkclean")]
#[command(about = "Strip tracking parameters, swap in mirror hosts and resolve short links", long_about = None)]
pub struct Cli {
    /// Skip the tracking-rule store (hand-written rules and redirects only).
    #[arg(long, global = true)]
    pub no_db: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Clean one or more links and print the results, one per line.
    Clean {
        /// Links to clean.
        #[arg(required = true)]
        links: Vec<String>,
    },

    /// Clean every link inside a piece of text and print the rewritten text.
    Text {
        /// Free text containing links.
        text: String,
    },

    /// Download the tracking filter list and replace the rule store.
    UpdateRules {
        /// Read the filter list from a local file instead of downloading it.
        #[arg(long, value_name = "PATH")]
        from_file: Option<PathBuf>,

        /// Keep running and refresh on the configured interval.
        #[arg(long, conflicts_with = "from_file")]
        watch: bool,
    },

    /// Show which hand-written rule applies to a hostname.
    Match {
        /// Hostname, e.g. `x.com`.
        host: String,
    },

    /// Add back (or remove again) a query parameter on a cleaned link.
    Toggle {
        /// Cleaned link.
        current: String,
        /// Link before cleaning (source of restored values).
        original: String,
        /// Parameter name.
        param: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Clean { links } => {
                let resolver = Arc::new(Resolver::from_config(&cfg)?);
                let db = open_db_unless(cli.no_db, &cfg).await?;
                run_clean(resolver, db, links).await?;
            }
            CliCommand::Text { text } => {
                let resolver = Arc::new(Resolver::from_config(&cfg)?);
                let db = open_db_unless(cli.no_db, &cfg).await?;
                run_text(resolver, db, &text).await?;
            }
            CliCommand::UpdateRules { from_file, watch } => {
                if cli.no_db {
                    anyhow::bail!("update-rules writes the rule store; drop --no-db");
                }
                let db = open_db(&cfg).await?;
                run_update_rules(&db, &cfg, from_file.as_deref(), watch).await?;
            }
            CliCommand::Match { host } => {
                let resolver = Resolver::from_config(&cfg)?;
                run_match(resolver.registry(), &host)?;
            }
            CliCommand::Toggle {
                current,
                original,
                param,
            } => run_toggle(&current, &original, &param)?,
        }

        Ok(())
    }
}

async fn open_db(cfg: &LinkCleanConfig) -> Result<RuleDb> {
    match &cfg.db_path {
        Some(path) => RuleDb::open_at(path).await,
        None => RuleDb::open_default().await,
    }
}

async fn open_db_unless(no_db: bool, cfg: &LinkCleanConfig) -> Result<Option<RuleDb>> {
    if no_db {
        return Ok(None);
    }
    Ok(Some(open_db(cfg).await?))
}

#[cfg(test)]
mod tests;
