use thiserror::Error;

use crate::abs::AbsError;
use crate::report::Status;

/// Why an item's chapters were not written
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error("Book duration unknown")]
    InvalidItem,

    #[error("Asin retrieval failed")]
    NoCatalogMatch,

    #[error("Asin retrieval failed - No ASIN found")]
    MatchWithoutAsin,

    #[error("Skipped - no ASIN and tracks not used as source")]
    NoSource,

    #[error("No chapters found")]
    NoCandidateChapters,

    #[error("Tracks retrieval failed - {0} track(s) found")]
    NotEnoughTracks(usize),

    #[error("{stage} failed: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: AbsError,
    },

    #[error("Chapters update failed: {0}")]
    Persist(#[source] AbsError),
}

impl ItemFailure {
    pub fn status(&self) -> Status {
        match self {
            ItemFailure::InvalidItem => Status::InvalidItem,
            ItemFailure::NoCatalogMatch | ItemFailure::MatchWithoutAsin => Status::NoAsin,
            ItemFailure::NoSource => Status::NoSource,
            ItemFailure::NoCandidateChapters => Status::NoChapters,
            ItemFailure::NotEnoughTracks(_) => Status::NoTracks,
            ItemFailure::Transport { .. } => Status::TransportError,
            ItemFailure::Persist(_) => Status::PersistError,
        }
    }
}
