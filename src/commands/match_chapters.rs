//! match-chapters command - reconcile chapters of every item in a library

use anyhow::{Context, Result};
use colored::Colorize;

use super::{runtime, RATE_PROTECTION_DELAY};
use crate::abs::AbsClient;
use crate::chapters::{process_item, AbsChapterProvider, MatchOptions};
use crate::config::{Config, Connection};
use crate::report::{Report, Status};

pub fn run(
    config: &Config,
    connection: &Connection,
    library: Option<&str>,
    options: MatchOptions,
    rate_protection: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let library_id = config
        .library_id(library)
        .context("No library selected. Use --library or [chapters] library_id in config")?;
    let client = AbsClient::new(connection)?;

    let rt = runtime()?;
    let report = rt.block_on(async {
        let items = client
            .library_items(&library_id, None)
            .await
            .with_context(|| format!("Failed to list items of library {}", library_id))?;

        if !quiet && !json {
            println!("Found {} items in library {}", items.len(), library_id);
            if options.dry_run {
                println!("{}", "Dry run: no chapters will be written".yellow());
            }
        }

        let provider = AbsChapterProvider {
            client: &client,
            provider: &config.chapters.provider,
            region: &config.chapters.region,
        };

        let mut report = Report::new(client.host());
        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            if !quiet && !json {
                println!();
                println!(
                    "{} {}",
                    format!("[{}/{}]", index + 1, total).dimmed(),
                    item.title().bold()
                );
            }

            let entry = process_item(&provider, item, &options).await;
            if !quiet && !json {
                let line = format!("  {}: {}", entry.status.as_str(), entry.comment);
                match entry.status {
                    Status::Updated => println!("{}", line.green()),
                    s if s.is_success() => println!("{}", line),
                    _ => println!("{}", line.red()),
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
    }

    Ok(())
}
