//! Rule reads (candidate lookup) and the wholesale table replacement.

use anyhow::{Context, Result};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::db::RuleDb;
use crate::filter::{RuleType, TrackingRule};

/// Bound values per inserted row.
const BINDS_PER_ROW: usize = 5;

/// Rows per INSERT, keeping the statement under SQLite's 32766 bound-parameter limit.
const MAX_BATCH_ROWS: usize = 32766 / BINDS_PER_ROW;

impl RuleDb {
    /// All rows whose `domain` is one of `candidates`.
    pub async fn find_by_domains(&self, candidates: &[String]) -> Result<Vec<TrackingRule>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT domain, path_pattern, param_name, rule_type, is_regex \
             FROM tracking_rules WHERE domain IN (",
        );
        let mut list = qb.separated(", ");
        for candidate in candidates {
            list.push_bind(candidate.clone());
        }
        list.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_type: i64 = row.get("rule_type");
            let is_regex: i64 = row.get("is_regex");
            out.push(TrackingRule {
                domain: row.get("domain"),
                path_pattern: row.get("path_pattern"),
                param_name: row.get("param_name"),
                rule_type: RuleType::from_i64(rule_type),
                is_regex: is_regex != 0,
            });
        }
        Ok(out)
    }

    /// Replace the whole table with `rules`, inserting in chunks of `batch_size` rows.
    ///
    /// Delete and inserts share one transaction: if any insert fails the old
    /// rows are still there.
    pub async fn replace_all(&self, rules: &[TrackingRule], batch_size: usize) -> Result<u64> {
        let batch_size = batch_size.clamp(1, MAX_BATCH_ROWS);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tracking_rules")
            .execute(&mut *tx)
            .await
            .context("clear tracking_rules")?;

        let mut inserted = 0u64;
        for chunk in rules.chunks(batch_size) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO tracking_rules (domain, path_pattern, param_name, rule_type, is_regex) ",
            );
            qb.push_values(chunk, |mut row, rule| {
                row.push_bind(rule.domain.clone())
                    .push_bind(rule.path_pattern.clone())
                    .push_bind(rule.param_name.clone())
                    .push_bind(rule.rule_type.as_i64())
                    .push_bind(i64::from(rule.is_regex));
            });
            inserted += qb
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert batch after {inserted} rows"))?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Number of stored rules.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tracking_rules")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
