use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy a file to `<file>.bak` before modifying it.
///
/// An existing backup is never overwritten: later backups get a timestamp
/// so the copy taken before the first run survives repeated runs.
pub fn create_backup(file_path: &Path) -> Result<PathBuf> {
    let mut backup_path = backup_path_for(file_path);
    if backup_path.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let mut name = file_path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.bak", stamp));
        backup_path.set_file_name(name);
    }

    fs::copy(file_path, &backup_path).with_context(|| {
        format!(
            "Failed to create backup: {} -> {}",
            file_path.display(),
            backup_path.display()
        )
    })?;

    Ok(backup_path)
}

/// Get the backup path for a file
pub fn backup_path_for(file_path: &Path) -> PathBuf {
    let mut backup = file_path.to_path_buf();
    let mut name = backup.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    backup.set_file_name(name);
    backup
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
