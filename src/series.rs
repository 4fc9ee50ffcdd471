//! Renaming a series on every book that belongs to it

use serde_json::json;

use crate::abs::models::{BatchUpdate, SeriesRef};
use crate::abs::LibraryItem;

/// Series list with `series_id` renamed, None when there is nothing to change
pub fn renamed(series: &[SeriesRef], series_id: &str, new_name: &str) -> Option<Vec<SeriesRef>> {
    if !series
        .iter()
        .any(|s| s.id == series_id && s.name != new_name)
    {
        return None;
    }

    Some(
        series
            .iter()
            .map(|s| {
                let mut s = s.clone();
                if s.id == series_id {
                    s.name = new_name.to_string();
                }
                s
            })
            .collect(),
    )
}

/// Batch entries renaming the series. Sequences and other series stay as they are.
pub fn rename_updates(items: &[LibraryItem], series_id: &str, new_name: &str) -> Vec<BatchUpdate> {
    items
        .iter()
        .filter_map(|item| {
            let series = renamed(&item.media.metadata.series, series_id, new_name)?;
            Some(BatchUpdate {
                id: item.id.clone(),
                media_payload: json!({ "metadata": { "series": series } }),
            })
        })
        .collect()
}

/// Name the series currently has on the first book carrying it
pub fn current_name<'a>(items: &'a [LibraryItem], series_id: &str) -> Option<&'a str> {
    items
        .iter()
        .flat_map(|item| &item.media.metadata.series)
        .find(|s| s.id == series_id)
        .map(|s| s.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: &str, name: &str, sequence: Option<&str>) -> SeriesRef {
        SeriesRef {
            id: id.to_string(),
            name: name.to_string(),
            sequence: sequence.map(String::from),
        }
    }

    fn book(id: &str, series: Vec<SeriesRef>) -> LibraryItem {
        let mut item = LibraryItem {
            id: id.to_string(),
            ..Default::default()
        };
        item.media.metadata.series = series;
        item
    }

    #[test]
    fn test_renamed_only_touches_matching_series() {
        let list = vec![
            series("ser_1", "Dune Chronicle", Some("2")),
            series("ser_2", "Herbert Classics", None),
        ];

        let renamed = renamed(&list, "ser_1", "Dune Chronicles").unwrap();
        assert_eq!(renamed[0], series("ser_1", "Dune Chronicles", Some("2")));
        assert_eq!(renamed[1], list[1]);
    }

    #[test]
    fn test_renamed_without_change() {
        let list = vec![series("ser_1", "Dune", Some("1"))];
        assert_eq!(renamed(&list, "ser_1", "Dune"), None);
        assert_eq!(renamed(&list, "ser_9", "Other"), None);
        assert_eq!(renamed(&[], "ser_1", "Dune"), None);
    }

    #[test]
    fn test_rename_updates() {
        let items = vec![
            book("li_1", vec![series("ser_1", "Dune Chronicle", Some("1"))]),
            book("li_2", vec![series("ser_1", "Dune Chronicles", Some("2"))]),
            book("li_3", vec![]),
        ];

        assert_eq!(current_name(&items, "ser_1"), Some("Dune Chronicle"));

        let updates = rename_updates(&items, "ser_1", "Dune Chronicles");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "li_1");
        assert_eq!(
            updates[0].media_payload,
            json!({"metadata": {"series": [
                {"id": "ser_1", "name": "Dune Chronicles", "sequence": "1"}
            ]}})
        );
    }
}
