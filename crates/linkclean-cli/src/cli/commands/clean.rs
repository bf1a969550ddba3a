//! `linkclean clean <link>...` – clean links and print them.

use anyhow::Result;
use linkclean_core::message::{clean_links, is_changed, restorable_params};
use linkclean_core::resolver::Resolver;
use linkclean_core::rule_db::RuleDb;
use std::sync::Arc;

pub async fn run_clean(resolver: Arc<Resolver>, db: Option<RuleDb>, links: Vec<String>) -> Result<()> {
    let cleaned = clean_links(resolver, links.clone(), db).await;
    for (raw, out) in links.iter().zip(&cleaned) {
        println!("{out}");
        if !is_changed(raw, out) {
            tracing::info!(link = %raw, "no cleanup needed");
        }
    }

    // A single cleaned link gets the list of parameters `toggle` can restore.
    if let ([raw], [out]) = (links.as_slice(), cleaned.as_slice()) {
        let params = restorable_params(raw, out);
        if is_changed(raw, out) && !params.is_empty() {
            eprintln!("restorable parameters: {}", params.join(", "));
        }
    }
    Ok(())
}
