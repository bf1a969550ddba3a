//! Persistent tracking-rule store (SQLite via sqlx).
//!
//! Holds the rows parsed from the third-party filter list. Resolution only
//! reads (`find_by_domains`); the refresh job replaces the whole table.

mod db;
mod rules;

pub use db::RuleDb;

#[cfg(test)]
pub(crate) use db::open_memory;
