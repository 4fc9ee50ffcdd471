//! split-genres command - break compound genres or tags into single values

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::{runtime, select_libraries};
use crate::abs::AbsClient;
use crate::config::{Config, Connection};
use crate::genres::{compound_values, merged_values, GenreTarget};

/// Split every compound value in the selected libraries (all when `libraries` is empty)
pub fn run(
    config: &Config,
    connection: &Connection,
    libraries: &[String],
    target: GenreTarget,
    delimiter: Option<&str>,
    no_dry_run: bool,
) -> Result<()> {
    let delimiter = delimiter.unwrap_or(&config.genres.delimiter);
    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let values = match target {
            GenreTarget::Genres => client.genres().await,
            GenreTarget::Tags => client.tags().await,
        }
        .with_context(|| format!("Failed to list {}", target.as_str()))?;

        let compound = compound_values(&values, delimiter, &config.genres.skip);
        if compound.is_empty() {
            println!("No compound {} found.", target.as_str());
            return Ok(());
        }

        let libraries = select_libraries(
            client.libraries().await.context("Failed to list libraries")?,
            libraries,
        )?;
        if !no_dry_run {
            println!("{}", "Dry run: no items will be changed".yellow());
        }

        let mut updated = 0;
        let mut failed = 0;
        for value in &compound {
            println!();
            println!("{}", value.bold());

            let filter = target.filter(value);
            for library in &libraries {
                let items = match client.library_items(&library.id, Some(filter.as_str())).await {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Failed to list items of {} for {:?}: {}", library.id, value, e);
                        failed += 1;
                        continue;
                    }
                };

                for item in &items {
                    let merged = merged_values(target.values(item), value, delimiter);
                    println!("  {}: {}", item.title(), merged.join(" | ").cyan());
                    if !no_dry_run {
                        continue;
                    }

                    match client
                        .patch_media(&item.id, &target.patch_payload(&merged))
                        .await
                    {
                        Ok(()) => updated += 1,
                        Err(e) => {
                            warn!("Failed to update {}: {}", item.id, e);
                            println!("  {}", format!("Failed to update {}: {}", item.title(), e).red());
                            failed += 1;
                        }
                    }
                }
            }
        }

        println!();
        if no_dry_run {
            println!("{} Updated {} item(s), {} failure(s)", "✓".green(), updated, failed);
        } else {
            println!("Run with {} to apply.", "--no-dry-run".cyan());
        }

        Ok::<_, anyhow::Error>(())
    })
}
