//! CLI command handlers, one per file.

mod clean;
mod match_host;
mod text;
mod toggle;
mod update_rules;

pub use clean::run_clean;
pub use match_host::run_match;
pub use text::run_text;
pub use toggle::run_toggle;
pub use update_rules::run_update_rules;
