//! `linkclean text <text>` – clean every link inside free text.

use anyhow::Result;
use linkclean_core::message::{clean_links, extract_links, rewrite_text};
use linkclean_core::resolver::Resolver;
use linkclean_core::rule_db::RuleDb;
use std::sync::Arc;

pub async fn run_text(resolver: Arc<Resolver>, db: Option<RuleDb>, text: &str) -> Result<()> {
    let links = extract_links(text);
    if links.is_empty() {
        eprintln!("No links found.");
        println!("{text}");
        return Ok(());
    }

    let cleaned = clean_links(resolver, links.clone(), db).await;
    let pairs: Vec<(String, String)> = links.into_iter().zip(cleaned).collect();
    println!("{}", rewrite_text(text, &pairs));
    Ok(())
}
