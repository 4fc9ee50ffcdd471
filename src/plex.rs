//! Plex watch progress and its translation into library progress updates

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::abs::{LibraryItem, ProgressUpdate, USER_AGENT};

/// Offsets at or above this share of the duration count as finished
const FINISHED_PERCENT: f64 = 99.0;

#[derive(Debug, Deserialize)]
struct SectionResponse {
    #[serde(rename = "MediaContainer")]
    container: MediaContainer,
}

#[derive(Debug, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexItem>,
}

/// Track entry of a Plex music/audiobook section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexItem {
    #[serde(default)]
    pub title: String,
    /// Milliseconds
    #[serde(default)]
    pub duration: u64,
    /// Milliseconds
    pub view_offset: Option<u64>,
    #[serde(default)]
    pub view_count: u64,
    /// Unix seconds
    pub last_viewed_at: Option<i64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<PlexMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlexMedia {
    #[serde(rename = "Part", default)]
    pub parts: Vec<PlexPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlexPart {
    #[serde(default)]
    pub file: String,
}

impl PlexItem {
    /// File of the first part of the first media entry
    pub fn file(&self) -> Option<&str> {
        self.media
            .first()
            .and_then(|m| m.parts.first())
            .map(|p| p.file.as_str())
            .filter(|f| !f.is_empty())
    }

    /// Listened offset in milliseconds; fully played when only a view count is known
    pub fn offset_ms(&self) -> u64 {
        match self.view_offset {
            Some(offset) => offset,
            None if self.view_count > 0 => self.duration,
            None => 0,
        }
    }

    /// Percentage listened, snapped to 100 near the end
    pub fn percent(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }

        let percent = self.offset_ms() as f64 / self.duration as f64 * 100.0;
        if percent >= FINISHED_PERCENT {
            100.0
        } else {
            percent
        }
    }

    /// Progress update for the matching library item, None when never viewed
    pub fn progress_update(&self, library_item_id: &str) -> Option<ProgressUpdate> {
        let viewed_at_ms = self.last_viewed_at? * 1000;
        let percent = self.percent();
        let finished = percent >= 100.0;

        Some(ProgressUpdate {
            library_item_id: library_item_id.to_string(),
            duration: Some(self.duration as f64 / 1000.0),
            progress: Some(percent / 100.0),
            current_time: Some(self.offset_ms() as f64 / 1000.0),
            is_finished: Some(finished),
            finished_at: finished.then_some(viewed_at_ms),
            started_at: Some(viewed_at_ms),
        })
    }
}

/// Last path component, for either separator style
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// First library item owning a file with the same name as `file`
pub fn find_match<'a>(items: &'a [LibraryItem], file: &str) -> Option<&'a LibraryItem> {
    let wanted = basename(file);
    items.iter().find(|item| {
        item.library_files
            .iter()
            .any(|f| basename(&f.metadata.path) == wanted)
    })
}

/// Result of matching all Plex items against the library
#[derive(Debug, Default)]
pub struct Correlation {
    pub updates: Vec<ProgressUpdate>,
    /// (Plex title, library item title) per update
    pub matched: Vec<(String, String)>,
    pub never_viewed: Vec<String>,
    pub unmatched: Vec<String>,
}

pub fn correlate(plex_items: &[PlexItem], library_items: &[LibraryItem]) -> Correlation {
    let mut correlation = Correlation::default();

    for plex_item in plex_items {
        if plex_item.last_viewed_at.is_none() {
            correlation.never_viewed.push(plex_item.title.clone());
            continue;
        }

        let matched = plex_item
            .file()
            .and_then(|file| find_match(library_items, file));
        let Some(item) = matched else {
            correlation.unmatched.push(plex_item.title.clone());
            continue;
        };

        if let Some(update) = plex_item.progress_update(&item.id) {
            correlation
                .matched
                .push((plex_item.title.clone(), item.title().to_string()));
            correlation.updates.push(update);
        }
    }

    correlation
}

/// Read-only client for a Plex Media Server
pub struct PlexClient {
    http: reqwest::Client,
    host: String,
    token: Option<String>,
}

impl PlexClient {
    pub fn new(host: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(String::from),
        })
    }

    /// All tracks of a library section, including their media parts
    pub async fn section_items(&self, section_id: u32) -> Result<Vec<PlexItem>> {
        let url = format!("{}/library/sections/{}/all", self.host, section_id);
        debug!("{}", url);

        let mut query: Vec<(&str, String)> = vec![
            ("type", "10".to_string()),
            ("includeCollections", "1".to_string()),
            ("includeExternalMedia", "1".to_string()),
            ("includeAdvanced", "1".to_string()),
            ("includeMeta", "1".to_string()),
        ];
        if let Some(token) = &self.token {
            query.push(("X-Plex-Token", token.clone()));
        }

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to reach Plex at {}", self.host))?
            .error_for_status()
            .context("Plex rejected the section request")?;

        let body: SectionResponse = response
            .json()
            .await
            .context("Failed to parse Plex section response")?;

        Ok(body.container.metadata)
    }
}
