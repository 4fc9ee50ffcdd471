//! Per-run report shared by the per-item tools

use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;

/// Outcome tag of one processed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Updated,
    Unchanged,
    DryRun,
    NoAsin,
    NoSource,
    NoChapters,
    NoTracks,
    NoMatch,
    NoDescription,
    InvalidItem,
    TransportError,
    PersistError,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Updated => "UPDATED",
            Status::Unchanged => "UNCHANGED",
            Status::DryRun => "DRY_RUN",
            Status::NoAsin => "NO_ASIN",
            Status::NoSource => "NO_SOURCE",
            Status::NoChapters => "NO_CHAPTERS",
            Status::NoTracks => "NO_TRACKS",
            Status::NoMatch => "NO_MATCH",
            Status::NoDescription => "NO_DESCRIPTION",
            Status::InvalidItem => "INVALID_ITEM",
            Status::TransportError => "TRANSPORT_ERROR",
            Status::PersistError => "PERSIST_ERROR",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Updated | Status::Unchanged | Status::DryRun)
    }
}

/// One line of the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub id: String,
    pub title: String,
    pub asin: Option<String>,
    pub status: Status,
    pub comment: String,
}

impl ReportEntry {
    pub fn new(id: &str, title: &str, status: Status, comment: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            asin: None,
            status,
            comment: comment.into(),
        }
    }

    pub fn with_asin(mut self, asin: Option<&str>) -> Self {
        self.asin = asin.map(String::from);
        self
    }
}

/// Entries keyed by item id, in the order items were processed
#[derive(Debug)]
pub struct Report {
    host: String,
    entries: Vec<ReportEntry>,
    /// Item id to position in `entries`
    index: HashMap<String, usize>,
}

impl Report {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add an entry, replacing an earlier one for the same item
    pub fn record(&mut self, entry: ReportEntry) {
        match self.index.get(&entry.id) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.status.is_success())
    }

    pub fn link(&self, id: &str) -> String {
        format!("{}/item/{}", self.host, id)
    }

    /// "Title (TAG): comment" plus the deep link, as printed in the summary
    pub fn format_entry(&self, entry: &ReportEntry) -> String {
        format!(
            "{} ({}): {}\nLink: {}",
            entry.title,
            entry.status.as_str(),
            entry.comment,
            self.link(&entry.id)
        )
    }

    pub fn print(&self) {
        let separator = "-".repeat(50);

        println!();
        println!("{}", "--- Summary ---".bold());
        for entry in &self.entries {
            println!("{}", self.format_entry(entry));
            println!("{}", separator);
        }

        println!();
        println!("{}", "--- Failed Books ---".bold());
        let mut failures = 0;
        for entry in self.failed() {
            println!("{}", self.format_entry(entry).red());
            println!("{}", separator);
            failures += 1;
        }
        if failures == 0 {
            println!("{}", "None".green());
        }

        let updated = self
            .entries
            .iter()
            .filter(|e| e.status == Status::Updated)
            .count();
        println!();
        println!(
            "{} items: {} updated, {} without changes, {} failed",
            self.entries.len(),
            updated,
            self.entries.len() - updated - failures,
            failures
        );
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let mut report = Report::new("https://abs.example.com");
        report.record(
            ReportEntry::new("li_1", "Dune", Status::Updated, "Chapters updated")
                .with_asin(Some("B002V1A0WE")),
        );
        report.record(ReportEntry::new(
            "li_2",
            "Unknown Book",
            Status::NoAsin,
            "Asin retrieval failed",
        ));
        report.record(ReportEntry::new(
            "li_3",
            "Hyperion",
            Status::Unchanged,
            "No chapters to update",
        ));
        report
    }

    #[test]
    fn test_status_success_split() {
        assert!(Status::Updated.is_success());
        assert!(Status::Unchanged.is_success());
        assert!(Status::DryRun.is_success());
        assert!(!Status::NoSource.is_success());
        assert!(!Status::PersistError.is_success());
        assert!(!Status::TransportError.is_success());
    }

    #[test]
    fn test_failed_lists_only_failures() {
        let report = sample_report();
        let failed: Vec<&str> = report.failed().map(|e| e.id.as_str()).collect();
        assert_eq!(failed, vec!["li_2"]);
    }

    #[test]
    fn test_record_replaces_same_item() {
        let mut report = sample_report();
        report.record(ReportEntry::new(
            "li_2",
            "Unknown Book",
            Status::Updated,
            "Tracks used as chapters",
        ));
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.failed().count(), 0);
        assert_eq!(report.entries[1].comment, "Tracks used as chapters");
    }

    #[test]
    fn test_record_keeps_first_seen_order_across_many_items() {
        let mut report = Report::new("https://abs.example.com");
        for i in 0..5000 {
            report.record(ReportEntry::new(&format!("li_{}", i), "Book", Status::DryRun, ""));
        }
        for i in (0..5000).step_by(2) {
            report.record(ReportEntry::new(&format!("li_{}", i), "Book", Status::NoChapters, "retry"));
        }

        assert_eq!(report.entries.len(), 5000);
        assert_eq!(report.entries[4].id, "li_4");
        assert_eq!(report.entries[4].status, Status::NoChapters);
        assert_eq!(report.entries[5].status, Status::DryRun);
        assert_eq!(report.failed().count(), 2500);
    }

    #[test]
    fn test_format_entry() {
        let report = sample_report();
        let line = report.format_entry(&report.entries[0]);
        assert_eq!(
            line,
            "Dune (UPDATED): Chapters updated\nLink: https://abs.example.com/item/li_1"
        );

        let line = report.format_entry(&report.entries[1]);
        assert!(line.starts_with("Unknown Book (NO_ASIN): Asin retrieval failed\n"));
    }

    #[test]
    fn test_json_uses_screaming_tags() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"NO_ASIN\""));
        assert!(json.contains("\"status\": \"UPDATED\""));
        assert!(json.contains("\"asin\": \"B002V1A0WE\""));
    }
}
