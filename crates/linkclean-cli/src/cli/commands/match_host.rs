//! `linkclean match <host>` – show the rule the matcher picks.

use anyhow::Result;
use linkclean_core::rules::RuleRegistry;

pub fn run_match(registry: &RuleRegistry, host: &str) -> Result<()> {
    match registry.find(host) {
        Some(rule) => {
            println!("{:<10} {}", "RULE", rule.name);
            println!("{:<10} {}", "TYPE", rule.kind().as_str());
            if let Some(path) = &rule.path_pattern {
                println!("{:<10} {}", "PATH", path.as_str());
            }
        }
        None => println!("No rule for {host} ({} rules loaded).", registry.len()),
    }
    Ok(())
}
