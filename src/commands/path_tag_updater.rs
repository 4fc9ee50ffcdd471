//! path-tag-updater command - add genres or tags to items whose path matches a regex

use anyhow::{Context, Result};
use colored::Colorize;

use super::runtime;
use crate::abs::AbsClient;
use crate::config::Connection;
use crate::genres::GenreTarget;
use crate::tagging::{plan_rules, PathTagRule};

pub fn run(
    connection: &Connection,
    library_id: &str,
    rules: &[PathTagRule],
    target: GenreTarget,
    no_dry_run: bool,
) -> Result<()> {
    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let items = client
            .library_items(library_id, None)
            .await
            .with_context(|| format!("Failed to list items of library {}", library_id))?;

        let plan = plan_rules(&items, rules, target);

        for (rule, matched) in rules.iter().zip(&plan.matched) {
            println!();
            println!(
                "{} -> {}",
                rule.pattern.as_str().bold(),
                rule.value.cyan()
            );
            if matched.is_empty() {
                println!("  No books matched for rule");
                continue;
            }
            for item in items.iter().filter(|i| matched.contains(&i.id)) {
                println!(
                    "  {} ({})",
                    item.title(),
                    item.path.as_deref().unwrap_or_default().dimmed()
                );
            }
        }

        println!();
        if plan.updates.is_empty() {
            println!("Every matching item already has its {}.", target.as_str());
            return Ok(());
        }
        if !no_dry_run {
            println!(
                "Dry run: would update {} item(s). Run with {} to apply.",
                plan.updates.len(),
                "--no-dry-run".cyan()
            );
            return Ok(());
        }

        client
            .batch_update(&plan.updates)
            .await
            .with_context(|| format!("Failed to update {}", target.as_str()))?;
        println!(
            "{} Updated {} of {} item(s)",
            "✓".green(),
            target.as_str(),
            plan.updates.len()
        );

        Ok::<_, anyhow::Error>(())
    })
}
