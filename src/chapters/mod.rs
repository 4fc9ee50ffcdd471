//! Chapter matching: source resolution, overwrite policy and conversion

mod error;
mod reconcile;
mod resolve;

pub use reconcile::{process_item, AbsChapterProvider, MatchOptions};
pub use resolve::ResolvedChapter;
