//! Refreshing item descriptions from a metadata provider

use tracing::info;

use crate::abs::models::BookMatch;
use crate::abs::{AbsClient, LibraryItem};
use crate::report::{ReportEntry, Status};

/// Search terms for an item: the ASIN alone when known, else title and author
pub fn search_terms(item: &LibraryItem) -> (&str, Option<&str>) {
    match item.asin() {
        Some(asin) => (asin, None),
        None => (item.title(), Some(item.author())),
    }
}

/// Description of the best match
pub fn best_description(matches: &[BookMatch]) -> Result<&str, Status> {
    let best = matches.first().ok_or(Status::NoMatch)?;
    best.description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(Status::NoDescription)
}

/// Look up and write the description of one item
pub async fn refresh_item(
    client: &AbsClient,
    item: &LibraryItem,
    provider: &str,
    dry_run: bool,
) -> ReportEntry {
    let entry = |status, comment: String| {
        ReportEntry::new(&item.id, item.title(), status, comment).with_asin(item.asin())
    };

    let (title, author) = search_terms(item);
    let matches = match client.search_books(title, author, provider).await {
        Ok(matches) => matches,
        Err(e) => {
            info!("{}: {}", item.title(), e);
            return entry(Status::TransportError, format!("Book search failed: {}", e));
        }
    };

    let description = match best_description(&matches) {
        Ok(description) => description,
        Err(Status::NoMatch) => return entry(Status::NoMatch, "No results found".to_string()),
        Err(status) => {
            return entry(
                status,
                "Description retrieval failed - No description found".to_string(),
            )
        }
    };

    if item.media.metadata.description.as_deref().map(str::trim) == Some(description) {
        return entry(Status::Unchanged, "Description already up to date".to_string());
    }

    if dry_run {
        return entry(
            Status::DryRun,
            format!("Would update description ({} characters)", description.chars().count()),
        );
    }

    let payload = serde_json::json!({ "metadata": { "description": description } });
    match client.patch_media(&item.id, &payload).await {
        Ok(()) => entry(Status::Updated, "Description updated".to_string()),
        Err(e) => entry(
            Status::PersistError,
            format!("Description update failed: {}", e),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::models::{BookMetadata, Media};

    fn item(asin: Option<&str>) -> LibraryItem {
        LibraryItem {
            id: "li_1".to_string(),
            media: Media {
                metadata: BookMetadata {
                    title: Some("Project Hail Mary".to_string()),
                    author_name: Some("Andy Weir".to_string()),
                    asin: asin.map(String::from),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn book(description: Option<&str>) -> BookMatch {
        BookMatch {
            description: description.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_terms_prefer_asin() {
        assert_eq!(search_terms(&item(Some("B08FHBV4ZX"))), ("B08FHBV4ZX", None));
        assert_eq!(
            search_terms(&item(None)),
            ("Project Hail Mary", Some("Andy Weir"))
        );
    }

    #[test]
    fn test_best_description() {
        assert_eq!(best_description(&[]), Err(Status::NoMatch));
        assert_eq!(best_description(&[book(None)]), Err(Status::NoDescription));
        assert_eq!(best_description(&[book(Some("  "))]), Err(Status::NoDescription));
        assert_eq!(
            best_description(&[book(Some("A lone astronaut.")), book(Some("Other"))]),
            Ok("A lone astronaut.")
        );
    }
}
