//! SQLite-backed rule store: connection and migrations. Queries live in `rules`.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the tracking-rule database. Cheap to clone (shared pool).
///
/// The default file lives under the XDG state directory:
/// `~/.local/state/linkclean/rules.db`.
#[derive(Clone)]
pub struct RuleDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl RuleDb {
    /// Open (or create) the default rule database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("linkclean")?;
        let db_path = xdg_dirs
            .place_state_file("rules.db")
            .context("create state directory for rules.db")?;
        Self::open_at(&db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await
            .with_context(|| format!("open rule database {}", path.display()))?;
        let db = RuleDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // `path_pattern` is a literal prefix (NULL = any path); `param_name` is
        // either a literal name or `/regex/` when `is_regex` = 1.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracking_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain TEXT NOT NULL,
                path_pattern TEXT,
                param_name TEXT NOT NULL,
                rule_type INTEGER NOT NULL DEFAULT 0,
                is_regex INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tracking_rules_domain
            ON tracking_rules (domain);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<RuleDb> {
    // Single connection to avoid in-memory pool handing back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = RuleDb { pool };
    db.migrate().await?;
    Ok(db)
}
