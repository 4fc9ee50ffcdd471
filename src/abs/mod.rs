//! Audiobookshelf API access

mod client;
mod error;
pub mod models;

pub use client::AbsClient;
pub(crate) use client::USER_AGENT;
pub use error::AbsError;
pub use models::{
    Author, CatalogChapter, LibraryItem, ListeningSession, ProgressUpdate, SessionPage,
};
