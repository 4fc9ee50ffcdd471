//! force-metadata command - tag every item so the server refreshes its metadata

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::{runtime, select_libraries};
use crate::abs::AbsClient;
use crate::config::Connection;
use crate::genres::GenreTarget;
use crate::tagging::{add_value_updates, FORCE_METADATA_TAG};

pub fn run(connection: &Connection, libraries: &[String], no_dry_run: bool) -> Result<()> {
    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let libraries = select_libraries(
            client.libraries().await.context("Failed to list libraries")?,
            libraries,
        )?;
        if !no_dry_run {
            println!("{}", "Dry run: no items will be changed".yellow());
        }

        let mut tagged = 0;
        let mut failed = 0;
        for library in &libraries {
            let items = match client.library_items(&library.id, None).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("Failed to list items of {}: {}", library.id, e);
                    println!("{}", format!("{}: failed to list items: {}", library.name, e).red());
                    failed += 1;
                    continue;
                }
            };

            let updates = add_value_updates(&items, GenreTarget::Tags, FORCE_METADATA_TAG);
            println!(
                "{}: {} of {} item(s) need the {} tag",
                library.name.bold(),
                updates.len(),
                items.len(),
                FORCE_METADATA_TAG.cyan()
            );
            if updates.is_empty() || !no_dry_run {
                continue;
            }

            match client.batch_update(&updates).await {
                Ok(()) => tagged += updates.len(),
                Err(e) => {
                    warn!("Batch update of {} failed: {}", library.id, e);
                    println!("{}", format!("{}: update failed: {}", library.name, e).red());
                    failed += 1;
                }
            }
        }

        println!();
        if no_dry_run {
            println!(
                "{} Tagged {} item(s), {} failure(s)",
                "✓".green(),
                tagged,
                failed
            );
        } else {
            println!("Run with {} to apply.", "--no-dry-run".cyan());
        }

        Ok::<_, anyhow::Error>(())
    })
}
