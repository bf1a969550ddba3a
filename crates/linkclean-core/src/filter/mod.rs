//! Third-party tracking-parameter filters: parsing the `$removeparam` filter
//! list into [`TrackingRule`]s and stripping matching query parameters.

mod apply;
mod parse;
mod types;

pub use apply::{apply_tracking_rules, domain_candidates, strip_tracking_params, ParamRules};
pub use parse::{parse_filter_list, parse_rule};
pub use types::{RuleType, TrackingRule, GLOBAL_DOMAIN};
