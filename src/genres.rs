//! Splitting compound genres and tags into their parts, plus the helpers
//! every tool that edits genres or tags shares

use base64::{engine::general_purpose, Engine as _};
use clap::ValueEnum;
use serde_json::{json, Value};

use crate::abs::LibraryItem;

/// Library item filter `<field>.<value>`, value in URL-safe base64
pub fn item_filter(field: &str, value: &str) -> String {
    format!(
        "{}.{}",
        field,
        general_purpose::URL_SAFE_NO_PAD.encode(value.as_bytes())
    )
}

/// Which item field split-genres works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenreTarget {
    Genres,
    Tags,
}

impl GenreTarget {
    /// Name used in filters and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            GenreTarget::Genres => "genres",
            GenreTarget::Tags => "tags",
        }
    }

    /// Library item filter selecting items that carry `value`
    pub fn filter(&self, value: &str) -> String {
        item_filter(self.as_str(), value)
    }

    /// Current genres or tags of an item
    pub fn values<'a>(&self, item: &'a LibraryItem) -> &'a [String] {
        match self {
            GenreTarget::Genres => &item.media.metadata.genres,
            GenreTarget::Tags => &item.media.tags,
        }
    }

    /// Body for `PATCH /api/items/{id}/media` replacing the whole list
    pub fn patch_payload(&self, values: &[String]) -> Value {
        match self {
            GenreTarget::Genres => json!({ "metadata": { "genres": values } }),
            GenreTarget::Tags => json!({ "tags": values }),
        }
    }
}

/// Values containing the delimiter that are not explicitly skipped
pub fn compound_values(values: &[String], delimiter: &str, skip: &[String]) -> Vec<String> {
    if delimiter.is_empty() {
        return Vec::new();
    }

    values
        .iter()
        .filter(|v| v.contains(delimiter) && !skip.contains(v))
        .cloned()
        .collect()
}

/// Replace `compound` in `existing` with its trimmed parts.
///
/// Existing order is kept, new parts are appended, duplicates dropped.
pub fn merged_values(existing: &[String], compound: &str, delimiter: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + 2);

    let kept = existing.iter().filter(|v| v.as_str() != compound).cloned();
    let parts = compound
        .split(delimiter)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);

    for value in kept.chain(parts) {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }

    merged
}

/// `existing` plus `value`, unless it is already there
pub fn with_value(existing: &[String], value: &str) -> Option<Vec<String>> {
    if existing.iter().any(|v| v == value) {
        return None;
    }

    let mut values = existing.to_vec();
    values.push(value.to_string());
    Some(values)
}
