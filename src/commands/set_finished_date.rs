//! set-finished-date command - backdate when items were finished

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;

use super::runtime;
use crate::abs::{AbsClient, ProgressUpdate};
use crate::config::Connection;

/// Midnight UTC of a YYYY-MM-DD date, in milliseconds since the epoch
pub fn finished_at_ms(date: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD", date))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid date")?
        .and_utc();
    Ok(midnight.timestamp_millis())
}

pub fn updates(item_ids: &[String], finished_at: i64) -> Vec<ProgressUpdate> {
    item_ids
        .iter()
        .map(|id| ProgressUpdate {
            library_item_id: id.clone(),
            finished_at: Some(finished_at),
            ..Default::default()
        })
        .collect()
}

pub fn run(connection: &Connection, item_ids: &[String], date: &str, no_dry_run: bool) -> Result<()> {
    let finished_at = finished_at_ms(date)?;
    let updates = updates(item_ids, finished_at);

    if !no_dry_run {
        for id in item_ids {
            println!("  Would set finished date of {} to {}", id, date);
        }
        println!("Run with {} to apply.", "--no-dry-run".cyan());
        return Ok(());
    }

    let client = AbsClient::new(connection)?;
    runtime()?
        .block_on(client.update_progress(&updates))
        .context("Failed to update progress")?;

    println!(
        "{} Finished date set to {} for {} item(s)",
        "✓".green(),
        date,
        updates.len()
    );
    Ok(())
}
