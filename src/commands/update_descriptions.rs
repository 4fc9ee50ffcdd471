//! update-descriptions command - copy provider descriptions onto items

use anyhow::{Context, Result};
use colored::Colorize;

use super::{runtime, RATE_PROTECTION_DELAY};
use crate::abs::AbsClient;
use crate::config::{Config, Connection};
use crate::descriptions::refresh_item;
use crate::report::Report;

pub fn run(
    config: &Config,
    connection: &Connection,
    library: Option<&str>,
    no_dry_run: bool,
    rate_protection: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let library_id = config
        .library_id(library)
        .context("No library selected. Use --library or [chapters] library_id in config")?;
    let client = AbsClient::new(connection)?;

    let report = runtime()?.block_on(async {
        let items = client
            .library_items(&library_id, None)
            .await
            .with_context(|| format!("Failed to list items of library {}", library_id))?;

        if !quiet && !json {
            println!("Found {} items in library {}", items.len(), library_id);
        }

        let mut report = Report::new(client.host());
        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            let entry = refresh_item(&client, item, &config.chapters.provider, !no_dry_run).await;
            if !quiet && !json {
                let line = format!(
                    "{} {}: {}",
                    item.title().bold(),
                    entry.status.as_str(),
                    entry.comment
                );
                if entry.status.is_success() {
                    println!("{}", line);
                } else {
                    println!("{}", line.red());
                }
            }
            report.record(entry);

            if rate_protection && index + 1 < total {
                tokio::time::sleep(RATE_PROTECTION_DELAY).await;
            }
        }

        Ok::<_, anyhow::Error>(report)
    })?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
        if !no_dry_run {
            println!();
            println!("Run with {} to write the descriptions.", "--no-dry-run".cyan());
        }
    }

    Ok(())
}
