//! Per-item chapter reconciliation
//!
//! [`process_item`] resolves a chapter source for one library item, decides
//! whether the existing chapters should go and writes the replacement. All
//! remote access goes through [`ChapterProvider`], so the procedure runs the
//! same against the real server and against an in-memory fake.

use tracing::{debug, info};

use super::error::ItemFailure;
use super::resolve::{decide, from_catalog, from_tracks, Decision, ResolvedChapter};
use crate::abs::models::BookMatch;
use crate::abs::{AbsClient, AbsError, CatalogChapter, LibraryItem};
use crate::report::{ReportEntry, Status};

/// Remote operations the reconciliation needs
#[allow(async_fn_in_trait)]
pub trait ChapterProvider {
    /// Provider search by title and author, best match first
    async fn search(&self, title: &str, author: &str) -> Result<Vec<BookMatch>, AbsError>;

    /// Have the server match the item and store the result; returns the updated item
    async fn quick_match(&self, item: &LibraryItem) -> Result<LibraryItem, AbsError>;

    /// Chapters the provider knows for an ASIN
    async fn catalog_chapters(&self, asin: &str) -> Result<Vec<CatalogChapter>, AbsError>;

    /// Durations (seconds) of the item's audio files, in playback order
    async fn track_durations(&self, item_id: &str) -> Result<Vec<f64>, AbsError>;

    async fn replace_chapters(
        &self,
        item_id: &str,
        chapters: &[ResolvedChapter],
    ) -> Result<(), AbsError>;
}

/// Knobs of a match-chapters run
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub threshold: u32,
    /// Server-side match for items without an ASIN. Skipped on dry runs,
    /// which search instead, because a match writes the item's metadata.
    pub quick_match: bool,
    pub search_for_asin: bool,
    pub use_tracks: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Catalog,
    Tracks,
}

/// Reconcile one item and describe the outcome as a report entry.
///
/// Never fails: every problem is recorded in the returned entry.
pub async fn process_item<P: ChapterProvider>(
    provider: &P,
    item: &LibraryItem,
    options: &MatchOptions,
) -> ReportEntry {
    let mut asin = item.asin().map(String::from);

    match reconcile(provider, item, options, &mut asin).await {
        Ok((status, comment)) => {
            ReportEntry::new(&item.id, item.title(), status, comment).with_asin(asin.as_deref())
        }
        Err(failure) => {
            info!("{}: {}", item.title(), failure);
            ReportEntry::new(&item.id, item.title(), failure.status(), failure.to_string())
                .with_asin(asin.as_deref())
        }
    }
}

async fn reconcile<P: ChapterProvider>(
    provider: &P,
    item: &LibraryItem,
    options: &MatchOptions,
    asin: &mut Option<String>,
) -> Result<(Status, String), ItemFailure> {
    let duration = item
        .media
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or(ItemFailure::InvalidItem)?;

    let mut matched_item = None;
    if asin.is_none() && options.quick_match && !options.dry_run {
        match quick_match(provider, item).await {
            Ok(matched) => {
                debug!("Asin quick matched: {:?}", matched.asin());
                *asin = matched.asin().map(String::from);
                matched_item = Some(matched);
            }
            Err(ItemFailure::NoCatalogMatch | ItemFailure::MatchWithoutAsin)
                if options.use_tracks =>
            {
                debug!("Quick match of '{}' failed, falling back to tracks", item.title());
            }
            Err(failure) => return Err(failure),
        }
    } else if asin.is_none() && options.search_for_asin {
        match search_asin(provider, item).await {
            Ok(found) => {
                debug!("ASIN found: {}", found);
                *asin = Some(found);
            }
            Err(ItemFailure::NoCatalogMatch | ItemFailure::MatchWithoutAsin)
                if options.use_tracks =>
            {
                debug!("No ASIN for '{}', falling back to tracks", item.title());
            }
            Err(failure) => return Err(failure),
        }
    }

    let (status, comment) = match &matched_item {
        Some(matched) => {
            let (status, comment) =
                apply_source(provider, matched, duration, asin.as_deref(), options).await?;
            (status, format!("Asin quick matched - {}", comment))
        }
        None => apply_source(provider, item, duration, asin.as_deref(), options).await?,
    };
    Ok((status, comment))
}

/// Fetch chapters from the resolved source, decide, and write them
async fn apply_source<P: ChapterProvider>(
    provider: &P,
    item: &LibraryItem,
    duration: f64,
    asin: Option<&str>,
    options: &MatchOptions,
) -> Result<(Status, String), ItemFailure> {
    let (found, chapters, origin) = match asin {
        Some(asin) => {
            let candidates = provider
                .catalog_chapters(asin)
                .await
                .map_err(|source| match source {
                    AbsError::Api { .. } => ItemFailure::NoCandidateChapters,
                    source => ItemFailure::Transport {
                        stage: "Chapters retrieval",
                        source,
                    },
                })?;
            debug!("Chapters found for '{}': {}", item.title(), candidates.len());
            (
                candidates.len(),
                from_catalog(&candidates, duration),
                Origin::Catalog,
            )
        }
        None if options.use_tracks => {
            let tracks = provider
                .track_durations(&item.id)
                .await
                .map_err(|source| ItemFailure::Transport {
                    stage: "Tracks retrieval",
                    source,
                })?;
            if tracks.len() < 2 {
                return Err(ItemFailure::NotEnoughTracks(tracks.len()));
            }
            (tracks.len(), from_tracks(&tracks, duration), Origin::Tracks)
        }
        None => return Err(ItemFailure::NoSource),
    };

    let current = item.chapter_count();
    debug!("Current chapter count: {}", current);

    match decide(current, found, options.threshold) {
        Decision::NothingFound => Err(ItemFailure::NoCandidateChapters),
        Decision::Keep => Ok((
            Status::Unchanged,
            format!("No chapters to update ({} current, {} found)", current, found),
        )),
        Decision::Replace => {
            if chapters.is_empty() {
                return Err(ItemFailure::NoCandidateChapters);
            }

            if options.dry_run {
                return Ok((
                    Status::DryRun,
                    format!(
                        "Would replace {} chapters with {}",
                        current,
                        chapters.len()
                    ),
                ));
            }

            provider
                .replace_chapters(&item.id, &chapters)
                .await
                .map_err(ItemFailure::Persist)?;

            let comment = match origin {
                Origin::Catalog => format!("Chapters updated ({} -> {})", current, chapters.len()),
                Origin::Tracks => {
                    format!("Tracks used as chapters ({} -> {})", current, chapters.len())
                }
            };
            Ok((Status::Updated, comment))
        }
    }
}

/// Let the server match the item; the match only counts when it carries an ASIN
async fn quick_match<P: ChapterProvider>(
    provider: &P,
    item: &LibraryItem,
) -> Result<LibraryItem, ItemFailure> {
    let matched = provider
        .quick_match(item)
        .await
        .map_err(|source| match source {
            AbsError::Api { .. } | AbsError::Status { .. } => {
                info!("Quick match of '{}' failed: {}", item.title(), source);
                ItemFailure::NoCatalogMatch
            }
            source => ItemFailure::Transport {
                stage: "Quick match",
                source,
            },
        })?;

    if matched.asin().is_none() {
        return Err(ItemFailure::NoCatalogMatch);
    }
    Ok(matched)
}

/// Take the ASIN of the provider's best match for the item
async fn search_asin<P: ChapterProvider>(
    provider: &P,
    item: &LibraryItem,
) -> Result<String, ItemFailure> {
    let matches = provider
        .search(item.title(), item.author())
        .await
        .map_err(|source| ItemFailure::Transport {
            stage: "Book search",
            source,
        })?;

    let best = matches.into_iter().next().ok_or(ItemFailure::NoCatalogMatch)?;
    best.asin
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(ItemFailure::MatchWithoutAsin)
}

/// [`ChapterProvider`] backed by the server's search and item endpoints
pub struct AbsChapterProvider<'a> {
    pub client: &'a AbsClient,
    pub provider: &'a str,
    pub region: &'a str,
}

impl ChapterProvider for AbsChapterProvider<'_> {
    async fn search(&self, title: &str, author: &str) -> Result<Vec<BookMatch>, AbsError> {
        self.client
            .search_books(title, Some(author), self.provider)
            .await
    }

    async fn quick_match(&self, item: &LibraryItem) -> Result<LibraryItem, AbsError> {
        self.client
            .match_item(&item.id, self.provider, item.title(), item.author())
            .await
    }

    async fn catalog_chapters(&self, asin: &str) -> Result<Vec<CatalogChapter>, AbsError> {
        self.client.search_chapters(asin, self.region).await
    }

    async fn track_durations(&self, item_id: &str) -> Result<Vec<f64>, AbsError> {
        let item = self.client.expanded_item(item_id).await?;
        Ok(item
            .media
            .audio_files
            .iter()
            .map(|track| track.duration)
            .collect())
    }

    async fn replace_chapters(
        &self,
        item_id: &str,
        chapters: &[ResolvedChapter],
    ) -> Result<(), AbsError> {
        self.client.update_chapters(item_id, chapters).await
    }
}
