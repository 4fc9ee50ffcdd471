pub mod cleanup_sessions;
pub mod correct_sessions;
pub mod force_metadata;
pub mod import_plex;
pub mod init;
pub mod match_chapters;
pub mod migrate_backup;
pub mod path_tag_updater;
pub mod remove_empty_authors;
pub mod rename_series;
pub mod set_finished_date;
pub mod split_genres;
pub mod update_descriptions;

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::time::Duration;

use crate::abs::models::Library;

/// Pause between items when rate protection is on
pub const RATE_PROTECTION_DELAY: Duration = Duration::from_secs(2);

/// Runtime driving the async client from a synchronous command
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

/// Ask a yes/no question on stdin; anything but y/yes is a no
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim();

    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Read one trimmed line after printing a prompt
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Libraries named by repeated `--library` flags, or all of them when none
/// were given. Unknown ids are an error so a typo never turns into a no-op.
pub fn select_libraries(all: Vec<Library>, wanted: &[String]) -> Result<Vec<Library>> {
    if wanted.is_empty() {
        return Ok(all);
    }

    let unknown: Vec<&str> = wanted
        .iter()
        .filter(|id| !all.iter().any(|l| &l.id == *id))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("Unknown library id(s): {}", unknown.join(", "));
    }

    Ok(all.into_iter().filter(|l| wanted.contains(&l.id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(id: &str) -> Library {
        Library {
            id: id.to_string(),
            name: format!("Library {}", id),
        }
    }

    fn ids(libraries: &[Library]) -> Vec<&str> {
        libraries.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_select_libraries_defaults_to_all() {
        let selected = select_libraries(vec![library("a"), library("b")], &[]).unwrap();
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn test_select_libraries_keeps_server_order() {
        let all = vec![library("a"), library("b"), library("c")];
        let wanted = vec!["c".to_string(), "a".to_string()];
        let selected = select_libraries(all, &wanted).unwrap();
        assert_eq!(ids(&selected), vec!["a", "c"]);
    }

    #[test]
    fn test_select_libraries_rejects_unknown_ids() {
        let wanted = vec!["a".to_string(), "nope".to_string()];
        let err = select_libraries(vec![library("a")], &wanted).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
