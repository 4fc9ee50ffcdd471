//! Turning provider chapters or audio tracks into a chapter list
//!
//! Everything here is pure: the caller fetches the inputs and persists the
//! result.

use serde::Serialize;

use crate::abs::CatalogChapter;

/// Gap left between consecutive track chapters so boundaries never overlap
pub const TRACK_EPSILON_SECONDS: f64 = 0.001;

/// Chapter in the shape the server's chapter endpoint expects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedChapter {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub title: String,
    pub error: Option<String>,
}

impl ResolvedChapter {
    fn new(id: usize, start: f64, end: f64, title: String) -> Self {
        Self {
            id,
            start,
            end,
            title,
            error: None,
        }
    }
}

/// What to do with an item's existing chapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The source had nothing; existing chapters stay whatever `current` is
    NothingFound,
    /// Counts are within the threshold
    Keep,
    Replace,
}

/// Compare the recorded chapter count with the freshly found one.
///
/// An empty source never replaces anything, even an item without chapters.
/// Otherwise chapters are replaced when the item has none or when the counts
/// differ by more than `threshold`.
pub fn decide(current: usize, found: usize, threshold: u32) -> Decision {
    if found == 0 {
        return Decision::NothingFound;
    }

    if current == 0 || current.abs_diff(found) > threshold as usize {
        Decision::Replace
    } else {
        Decision::Keep
    }
}

/// Convert provider chapters (milliseconds) to chapters in seconds.
///
/// Chapters starting at or past the end of the book truncate the list; ends
/// are clipped to `duration`. A chapter that does not start after the
/// previously kept one is dropped, so starts are strictly ascending.
pub fn from_catalog(candidates: &[CatalogChapter], duration: f64) -> Vec<ResolvedChapter> {
    let mut chapters: Vec<ResolvedChapter> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let start = candidate.start_offset_ms as f64 / 1000.0;
        if start >= duration {
            break;
        }

        let end = ((candidate.start_offset_ms + candidate.length_ms) as f64 / 1000.0).min(duration);
        if end <= start {
            continue;
        }
        if chapters.last().is_some_and(|previous| start <= previous.start) {
            continue;
        }

        chapters.push(ResolvedChapter::new(
            chapters.len(),
            start,
            end,
            candidate.title.clone(),
        ));
    }

    chapters
}

/// Build one chapter per audio track, named "Chapter N".
///
/// Each chapter starts where the previous one ended and is one epsilon
/// shorter than its track. The chapter that reaches the end of the book is
/// clipped to `duration` and ends the list.
pub fn from_tracks(track_durations: &[f64], duration: f64) -> Vec<ResolvedChapter> {
    let mut chapters: Vec<ResolvedChapter> = Vec::with_capacity(track_durations.len());
    let mut start = 0.0;

    for &track in track_durations {
        if start >= duration {
            break;
        }

        let end = start + track - TRACK_EPSILON_SECONDS;
        if end <= start {
            continue;
        }

        let id = chapters.len();
        chapters.push(ResolvedChapter::new(
            id,
            start,
            end.min(duration),
            format!("Chapter {}", id + 1),
        ));

        if end >= duration {
            break;
        }
        start = end;
    }

    chapters
}
