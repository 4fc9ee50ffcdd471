//! remove-empty-authors command

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::{confirm, runtime};
use crate::abs::{AbsClient, Author};
use crate::config::Connection;

/// Authors without a single book
pub fn empty_authors(authors: Vec<Author>) -> Vec<Author> {
    authors.into_iter().filter(|a| a.num_books == 0).collect()
}

pub fn run(connection: &Connection, library: Option<&str>, yes: bool) -> Result<()> {
    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let library_ids = match library {
            Some(id) => vec![id.to_string()],
            None => client
                .libraries()
                .await
                .context("Failed to list libraries")?
                .into_iter()
                .map(|l| l.id)
                .collect(),
        };

        let mut empty = Vec::new();
        for library_id in &library_ids {
            let authors = client
                .authors(library_id)
                .await
                .with_context(|| format!("Failed to list authors of library {}", library_id))?;
            empty.extend(empty_authors(authors));
        }

        if empty.is_empty() {
            println!("No authors without books.");
            return Ok(());
        }

        println!("{}", "Authors without books:".bold());
        for author in &empty {
            println!("  {} ({})", author.name, author.id.dimmed());
        }
        println!();

        if !yes && !confirm(&format!("Delete {} author(s)?", empty.len()))? {
            println!("Aborted.");
            return Ok(());
        }

        let mut deleted = 0;
        for author in &empty {
            match client.delete_author(&author.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!("Failed to delete author {}: {}", author.id, e);
                    println!("  {}", format!("Failed to delete {}: {}", author.name, e).red());
                }
            }
        }

        println!("{} Deleted {} of {} author(s)", "✓".green(), deleted, empty.len());
        Ok::<_, anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_authors() {
        let authors: Vec<Author> = serde_json::from_str(
            r#"[
                {"id": "aut_1", "name": "Andy Weir", "numBooks": 3},
                {"id": "aut_2", "name": "Nobody"},
                {"id": "aut_3", "name": "Ghost", "numBooks": 0}
            ]"#,
        )
        .unwrap();

        let empty: Vec<String> = empty_authors(authors).into_iter().map(|a| a.id).collect();
        assert_eq!(empty, vec!["aut_2", "aut_3"]);
    }
}
