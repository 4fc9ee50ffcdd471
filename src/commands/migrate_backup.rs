//! migrate-backup command - rewrite stored paths in an extracted backup database

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::database::{BackupDb, PathRule};
use crate::safety::{create_backup, format_size};

pub fn run(
    database: &Path,
    old_metadata: &str,
    new_metadata: &str,
    old_libraries: &str,
    new_libraries: &str,
    no_dry_run: bool,
    no_backup: bool,
) -> Result<()> {
    let mut db = BackupDb::open(database)?;

    let metadata = PathRule::new(old_metadata, new_metadata);
    let libraries = PathRule::new(old_libraries, new_libraries);

    println!("{}", db.path().display().to_string().bold());
    println!("  Metadata:  {} -> {}", metadata.from, metadata.to.cyan());
    println!("  Libraries: {} -> {}", libraries.from, libraries.to.cyan());
    println!();

    if no_dry_run && !no_backup {
        let backup = create_backup(database)?;
        let size = std::fs::metadata(&backup).map(|m| m.len()).unwrap_or(0);
        println!("Created backup: {} ({})", backup.display(), format_size(size));
        println!();
    }

    let summary = db.migrate(&metadata, &libraries, !no_dry_run)?;

    for change in &summary.changes {
        let label = format!("{}.{}", change.table, change.column);
        if change.rows > 0 {
            println!("  {:<32} {} row(s)", label, change.rows.to_string().green());
        } else {
            println!("  {:<32} {}", label, "unchanged".dimmed());
        }
    }
    println!(
        "  {:<32} {}",
        "settings.backupPath",
        if summary.settings_updated {
            "updated".green()
        } else {
            "unchanged".dimmed()
        }
    );
    for table in &summary.skipped_tables {
        println!("  {:<32} {}", table, "table missing, skipped".yellow());
    }

    println!();
    if no_dry_run {
        println!(
            "{} Rewrote {} row(s). Re-zip the database into the backup archive to restore it.",
            "✓".green(),
            summary.total_rows()
        );
    } else {
        println!(
            "Dry run: {} row(s) would be rewritten. Run with {} to apply.",
            summary.total_rows(),
            "--no-dry-run".cyan()
        );
    }

    Ok(())
}
