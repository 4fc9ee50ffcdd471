//! Response and request bodies of the Audiobookshelf API
//!
//! Only the fields the tools read are modelled. Records that get written back
//! to the server (listening sessions) keep every other field in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Libraries and items
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LibrariesResponse {
    #[serde(default)]
    pub libraries: Vec<Library>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse {
    #[serde(default)]
    pub results: Vec<LibraryItem>,
}

/// Library item as returned by list and expanded item endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    /// Folder or file of the item on the server's disk
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub media: Media,
    /// Only present on expanded items
    #[serde(default)]
    pub library_files: Vec<LibraryFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default)]
    pub metadata: BookMetadata,
    #[serde(default)]
    pub num_chapters: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only present on expanded items
    #[serde(default)]
    pub audio_files: Vec<AudioFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub asin: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Only present on expanded and batch items; list items carry `seriesName`
    #[serde(default)]
    pub series: Vec<SeriesRef>,
}

/// Series membership of a book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sequence: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioFile {
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryFile {
    #[serde(default)]
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub path: String,
}

impl LibraryItem {
    pub fn title(&self) -> &str {
        self.media
            .metadata
            .title
            .as_deref()
            .unwrap_or("Unknown Title")
    }

    pub fn author(&self) -> &str {
        self.media
            .metadata
            .author_name
            .as_deref()
            .unwrap_or("Unknown Author")
    }

    /// ASIN, treating an empty string like a missing one
    pub fn asin(&self) -> Option<&str> {
        self.media
            .metadata
            .asin
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    pub fn chapter_count(&self) -> usize {
        self.media.num_chapters.unwrap_or(0) as usize
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchItemsResponse {
    #[serde(default)]
    pub library_items: Vec<LibraryItem>,
}

/// One entry of `POST /api/items/batch/update`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdate {
    pub id: String,
    pub media_payload: Value,
}

/// Body of `POST /api/items/{id}/match`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MatchResponse {
    pub library_item: Option<LibraryItem>,
    pub error: Option<Value>,
}

// ============================================================================
// Metadata search
// ============================================================================

/// Single result of `GET /api/search/books`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookMatch {
    pub asin: Option<String>,
    pub description: Option<String>,
}

/// Body of `GET /api/search/chapters`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChaptersResponse {
    #[serde(default)]
    pub chapters: Vec<CatalogChapter>,
    pub error: Option<String>,
}

/// Chapter as reported by the metadata provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogChapter {
    pub start_offset_ms: u64,
    pub length_ms: u64,
    #[serde(default)]
    pub title: String,
}

// ============================================================================
// Users and listening sessions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}

/// Listening session; unknown fields survive a delete/re-post cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningSession {
    pub id: String,
    #[serde(default)]
    pub time_listening: Option<f64>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub media_metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListeningSession {
    pub fn title(&self) -> &str {
        self.media_metadata
            .as_ref()
            .and_then(|m| m.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown Title")
    }
}

/// One page of `GET /api/users/{id}/listening-sessions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub num_pages: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub sessions: Vec<ListeningSession>,
}

// ============================================================================
// Authors, genres, progress
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub num_books: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorsResponse {
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenresResponse {
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One entry of `PATCH /api/me/progress/batch/update`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub library_item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_finished: Option<bool>,
    /// Serialized even when None so the server clears a stale date
    pub finished_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_item_from_list_response() {
        let json = r#"{
            "results": [{
                "id": "li_1",
                "path": "/audiobooks/Andy Weir/The Martian",
                "media": {
                    "metadata": {"title": "The Martian", "authorName": "Andy Weir", "asin": null, "genres": ["Sci-Fi"]},
                    "numChapters": 12,
                    "duration": 39000.5,
                    "tags": ["fav"]
                }
            }]
        }"#;

        let parsed: ItemsResponse = serde_json::from_str(json).unwrap();
        let item = &parsed.results[0];
        assert_eq!(item.title(), "The Martian");
        assert_eq!(item.path.as_deref(), Some("/audiobooks/Andy Weir/The Martian"));
        assert_eq!(item.author(), "Andy Weir");
        assert_eq!(item.asin(), None);
        assert_eq!(item.chapter_count(), 12);
        assert_eq!(item.media.duration, Some(39000.5));
        assert_eq!(item.media.metadata.genres, vec!["Sci-Fi"]);
    }

    #[test]
    fn test_library_item_defaults_when_fields_missing() {
        let item: LibraryItem = serde_json::from_str(r#"{"id": "li_2"}"#).unwrap();
        assert_eq!(item.title(), "Unknown Title");
        assert_eq!(item.author(), "Unknown Author");
        assert_eq!(item.chapter_count(), 0);
        assert!(item.media.duration.is_none());
    }

    #[test]
    fn test_blank_asin_is_treated_as_missing() {
        let item: LibraryItem =
            serde_json::from_str(r#"{"id": "li_3", "media": {"metadata": {"asin": "  "}}}"#)
                .unwrap();
        assert_eq!(item.asin(), None);
    }

    #[test]
    fn test_chapters_response_with_error_flag() {
        let parsed: ChaptersResponse =
            serde_json::from_str(r#"{"error": "Chapters not found"}"#).unwrap();
        assert!(parsed.chapters.is_empty());
        assert_eq!(parsed.error.as_deref(), Some("Chapters not found"));
    }

    #[test]
    fn test_batch_item_series() {
        let json = r#"{
            "libraryItems": [{
                "id": "li_1",
                "media": {"metadata": {"title": "Dune Messiah", "series": [
                    {"id": "ser_1", "name": "Dune", "sequence": "2"},
                    {"id": "ser_2", "name": "Dune Chronicles", "sequence": null}
                ]}}
            }]
        }"#;

        let parsed: BatchItemsResponse = serde_json::from_str(json).unwrap();
        let series = &parsed.library_items[0].media.metadata.series;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].sequence.as_deref(), Some("2"));
        assert_eq!(series[1].name, "Dune Chronicles");
    }

    #[test]
    fn test_match_response_variants() {
        let matched: MatchResponse = serde_json::from_str(
            r#"{"updated": true, "libraryItem": {"id": "li_1", "media": {"metadata": {"asin": "B002V1A0WE"}}}}"#,
        )
        .unwrap();
        assert_eq!(
            matched.library_item.as_ref().and_then(LibraryItem::asin),
            Some("B002V1A0WE")
        );

        let failed: MatchResponse =
            serde_json::from_str(r#"{"error": "Book not found"}"#).unwrap();
        assert!(failed.library_item.is_none());
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_batch_update_serializes_camel_case() {
        let update = BatchUpdate {
            id: "li_1".to_string(),
            media_payload: serde_json::json!({"tags": ["force-metadata"]}),
        };
        let out = serde_json::to_value(&update).unwrap();
        assert_eq!(out["id"], "li_1");
        assert_eq!(out["mediaPayload"]["tags"][0], "force-metadata");
    }

    #[test]
    fn test_session_keeps_unknown_fields() {
        let json = r#"{
            "id": "ses_1",
            "userId": "usr_1",
            "libraryItemId": "li_1",
            "timeListening": 7200,
            "startTime": 100,
            "currentTime": 3700,
            "mediaMetadata": {"title": "Dune"},
            "deviceInfo": {"browserName": "Firefox"}
        }"#;

        let session: ListeningSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.title(), "Dune");
        assert_eq!(session.time_listening, Some(7200.0));

        let out = serde_json::to_value(&session).unwrap();
        assert_eq!(out["userId"], "usr_1");
        assert_eq!(out["deviceInfo"]["browserName"], "Firefox");
        assert_eq!(out["timeListening"], 7200.0);
    }

    #[test]
    fn test_progress_update_serializes_camel_case() {
        let update = ProgressUpdate {
            library_item_id: "li_1".to_string(),
            finished_at: Some(1_700_000_000_000),
            ..Default::default()
        };
        let out = serde_json::to_value(&update).unwrap();
        assert_eq!(out["libraryItemId"], "li_1");
        assert_eq!(out["finishedAt"], 1_700_000_000_000i64);
        assert!(out.get("isFinished").is_none());
    }
}
