//! import-plex command - copy Plex watch progress into the library

use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;

use super::runtime;
use crate::abs::AbsClient;
use crate::config::{Config, Connection};
use crate::plex::{correlate, PlexClient};

pub fn run(
    config: &Config,
    connection: &Connection,
    plex_host: Option<&str>,
    plex_token: Option<&str>,
    section: Option<u32>,
    no_dry_run: bool,
) -> Result<()> {
    let client = AbsClient::new(connection)?;
    let plex = PlexClient::new(
        plex_host.unwrap_or(&config.plex.host),
        plex_token.or(config.plex.token.as_deref()),
        Duration::from_secs(config.server.timeout_secs),
    )?;
    let section = section.unwrap_or(config.plex.section_id);

    runtime()?.block_on(async {
        let libraries = client.libraries().await.context("Failed to list libraries")?;

        let mut item_ids = Vec::new();
        for library in &libraries {
            let items = client
                .library_items(&library.id, None)
                .await
                .with_context(|| format!("Failed to list items of library {}", library.name))?;
            item_ids.extend(items.into_iter().map(|i| i.id));
        }

        println!("Fetching {} items from Audiobookshelf...", item_ids.len());
        let library_items = client
            .batch_items(&item_ids)
            .await
            .context("Failed to fetch library items")?;

        let plex_items = plex.section_items(section).await?;
        println!(
            "Found {} items in Audiobookshelf and {} in Plex",
            library_items.len(),
            plex_items.len()
        );

        let correlation = correlate(&plex_items, &library_items);

        println!();
        for (plex_title, title) in &correlation.matched {
            println!("  {} {} -> {}", "✓".green(), plex_title, title);
        }
        for title in &correlation.unmatched {
            println!("  {} {} (no matching file)", "✗".red(), title);
        }
        for title in &correlation.never_viewed {
            println!("  {} {} (never played)", "-".dimmed(), title.dimmed());
        }

        println!();
        if correlation.updates.is_empty() {
            println!("No progress to import.");
            return Ok(());
        }

        if !no_dry_run {
            println!(
                "Dry run: {} progress update(s) would be sent. Run with {} to apply.",
                correlation.updates.len(),
                "--no-dry-run".cyan()
            );
            return Ok(());
        }

        client
            .update_progress(&correlation.updates)
            .await
            .context("Failed to send progress updates")?;
        println!(
            "{} Sent {} progress update(s)",
            "✓".green(),
            correlation.updates.len()
        );

        Ok::<_, anyhow::Error>(())
    })
}
