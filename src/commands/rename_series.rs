//! rename-series command

use anyhow::{bail, Context, Result};
use colored::Colorize;

use super::runtime;
use crate::abs::AbsClient;
use crate::config::Connection;
use crate::genres::item_filter;
use crate::series::{current_name, rename_updates};

pub fn run(
    connection: &Connection,
    library_id: &str,
    series_id: &str,
    new_name: &str,
    no_dry_run: bool,
) -> Result<()> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        bail!("The new series name must not be empty");
    }

    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let filter = item_filter("series", series_id);
        let listed = client
            .library_items(library_id, Some(filter.as_str()))
            .await
            .with_context(|| format!("Failed to list books of series {}", series_id))?;
        if listed.is_empty() {
            println!("No books in series {} of library {}.", series_id, library_id);
            return Ok(());
        }

        // List items carry only the series name; the full entries need batch/get
        let ids: Vec<String> = listed.into_iter().map(|item| item.id).collect();
        let books = client
            .batch_items(&ids)
            .await
            .context("Failed to load the series' books")?;

        let old_name = current_name(&books, series_id).unwrap_or("?");
        let updates = rename_updates(&books, series_id, new_name);
        println!(
            "{} -> {}: {} of {} book(s) to update",
            old_name.bold(),
            new_name.green().bold(),
            updates.len(),
            books.len()
        );
        for book in books.iter().filter(|b| updates.iter().any(|u| u.id == b.id)) {
            println!("  {}", book.title());
        }

        if updates.is_empty() {
            return Ok(());
        }
        if !no_dry_run {
            println!();
            println!("Run with {} to apply.", "--no-dry-run".cyan());
            return Ok(());
        }

        client
            .batch_update(&updates)
            .await
            .context("Failed to rename the series")?;
        println!("{} Renamed series on {} book(s)", "✓".green(), updates.len());

        Ok::<_, anyhow::Error>(())
    })
}
