pub mod config;
pub mod logging;

pub mod fetch;
pub mod filter;
pub mod message;
pub mod resolver;
pub mod rule_db;
pub mod rules;
pub mod updater;
pub mod url_model;
