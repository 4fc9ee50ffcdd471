//! Path rewriting inside an Audiobookshelf backup database
//!
//! The server stores absolute paths in plain columns and inside JSON-encoded
//! file records. Moving a server to a different storage layout means every
//! one of them has to be rewritten before the backup is restored.

use anyhow::{bail, Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Plain columns holding paths below the metadata directory
const METADATA_COLUMNS: &[(&str, &str)] = &[
    ("authors", "imagePath"),
    ("books", "coverPath"),
    ("feeds", "coverPath"),
    ("playbackSessions", "coverPath"),
    ("podcasts", "coverPath"),
];

/// Plain columns holding paths below the libraries directory
const LIBRARY_COLUMNS: &[(&str, &str)] = &[
    ("feedEpisodes", "filePath"),
    ("libraryFolders", "path"),
    ("libraryItems", "path"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonShape {
    Object,
    Array,
}

/// JSON columns whose records carry `metadata.path` below the libraries directory
const LIBRARY_JSON_COLUMNS: &[(&str, &str, JsonShape)] = &[
    ("books", "audioFiles", JsonShape::Array),
    ("books", "ebookFile", JsonShape::Object),
    ("libraryItems", "libraryFiles", JsonShape::Array),
    ("podcastEpisodes", "audioFile", JsonShape::Object),
];

const SERVER_SETTINGS_KEY: &str = "server-settings";

/// Normalize a directory: forward slashes, no doubled slashes, trailing slash
pub fn normalize_dir(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for c in path.trim().chars().map(|c| if c == '\\' { '/' } else { c }) {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Replace one directory prefix with another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub from: String,
    pub to: String,
}

impl PathRule {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: normalize_dir(from),
            to: normalize_dir(to),
        }
    }

    /// Rewritten value, or None when the value is not below `from`
    pub fn apply(&self, value: &str) -> Option<String> {
        // An unset path is not the root directory
        if value.is_empty() {
            return None;
        }

        let rewritten = if let Some(rest) = value.strip_prefix(&self.from) {
            format!("{}{}", self.to, rest)
        } else if value == self.from.trim_end_matches('/') {
            // The directory itself, stored without its trailing slash
            self.to.trim_end_matches('/').to_string()
        } else {
            return None;
        };

        (rewritten != value).then_some(rewritten)
    }
}

/// Number of rows rewritten in one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub table: &'static str,
    pub column: &'static str,
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct MigrationSummary {
    pub changes: Vec<ColumnChange>,
    pub skipped_tables: Vec<&'static str>,
    pub settings_updated: bool,
}

impl MigrationSummary {
    pub fn total_rows(&self) -> usize {
        self.changes.iter().map(|c| c.rows).sum()
    }
}

/// Handle on the SQLite database extracted from a backup
pub struct BackupDb {
    conn: Connection,
    path: PathBuf,
}

impl BackupDb {
    /// Open an existing database; never creates one
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("Database not found: {}", path.display());
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite every stored path. With `dry_run` the changes are counted
    /// and rolled back.
    pub fn migrate(
        &mut self,
        metadata: &PathRule,
        libraries: &PathRule,
        dry_run: bool,
    ) -> Result<MigrationSummary> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;
        let mut summary = MigrationSummary::default();

        let plain = METADATA_COLUMNS
            .iter()
            .map(|&(t, c)| (t, c, metadata))
            .chain(LIBRARY_COLUMNS.iter().map(|&(t, c)| (t, c, libraries)));

        for (table, column, rule) in plain {
            if !table_exists(&tx, table)? {
                warn!("Table {} not found, skipping", table);
                summary.skipped_tables.push(table);
                continue;
            }
            let rows = rewrite_column(&tx, table, column, rule)
                .with_context(|| format!("Failed to rewrite {}.{}", table, column))?;
            summary.changes.push(ColumnChange { table, column, rows });
        }

        for &(table, column, shape) in LIBRARY_JSON_COLUMNS {
            if !table_exists(&tx, table)? {
                if !summary.skipped_tables.contains(&table) {
                    warn!("Table {} not found, skipping", table);
                    summary.skipped_tables.push(table);
                }
                continue;
            }
            let rows = rewrite_json_column(&tx, table, column, shape, libraries)
                .with_context(|| format!("Failed to rewrite {}.{}", table, column))?;
            summary.changes.push(ColumnChange { table, column, rows });
        }

        if table_exists(&tx, "settings")? {
            summary.settings_updated = rewrite_server_settings(&tx, metadata)
                .context("Failed to rewrite server settings")?;
        } else {
            warn!("Table settings not found, skipping");
            summary.skipped_tables.push("settings");
        }

        if dry_run {
            tx.rollback().context("Failed to roll back")?;
        } else {
            tx.commit().context("Failed to commit changes")?;
        }

        Ok(summary)
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn rewrite_column(conn: &Connection, table: &str, column: &str, rule: &PathRule) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        r#"SELECT id, "{column}" FROM "{table}" WHERE "{column}" IS NOT NULL"#
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, SqlValue>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut update = conn.prepare(&format!(
        r#"UPDATE "{table}" SET "{column}" = ?1 WHERE id = ?2"#
    ))?;
    let mut changed = 0;
    for (id, value) in rows {
        if let Some(new_value) = rule.apply(&value) {
            update.execute(params![new_value, id])?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rewrite `metadata.path` of a file record; true when it changed
fn rewrite_record_path(record: &mut Value, rule: &PathRule) -> bool {
    let Some(Value::String(path)) = record
        .get_mut("metadata")
        .and_then(|metadata| metadata.get_mut("path"))
    else {
        return false;
    };

    match rule.apply(path) {
        Some(new_path) => {
            *path = new_path;
            true
        }
        None => false,
    }
}

fn rewrite_json_column(
    conn: &Connection,
    table: &str,
    column: &str,
    shape: JsonShape,
    rule: &PathRule,
) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        r#"SELECT id, "{column}" FROM "{table}" WHERE "{column}" IS NOT NULL"#
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, SqlValue>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut update = conn.prepare(&format!(
        r#"UPDATE "{table}" SET "{column}" = ?1 WHERE id = ?2"#
    ))?;
    let mut changed = 0;
    for (id, raw) in rows {
        let mut json: Value = match serde_json::from_str(&raw) {
            Ok(json) => json,
            Err(e) => {
                warn!("Skipping unreadable {}.{} row {:?}: {}", table, column, id, e);
                continue;
            }
        };

        let modified = match (shape, &mut json) {
            (JsonShape::Array, Value::Array(records)) => records
                .iter_mut()
                .fold(false, |acc, record| rewrite_record_path(record, rule) | acc),
            (JsonShape::Object, record @ Value::Object(_)) => rewrite_record_path(record, rule),
            _ => false,
        };

        if modified {
            update.execute(params![serde_json::to_string(&json)?, id])?;
            changed += 1;
        }
    }
    Ok(changed)
}

fn rewrite_server_settings(conn: &Connection, rule: &PathRule) -> Result<bool> {
    let raw: Option<String> = conn
        .query_row(
            r#"SELECT "value" FROM settings WHERE "key" = ?1"#,
            params![SERVER_SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Ok(false);
    };

    let mut settings: Value = serde_json::from_str(&raw).context("server-settings is not JSON")?;
    let Some(Value::String(backup_path)) = settings.get_mut("backupPath") else {
        return Ok(false);
    };
    let Some(new_path) = rule.apply(backup_path) else {
        return Ok(false);
    };
    *backup_path = new_path;

    conn.execute(
        r#"UPDATE settings SET "value" = ?1 WHERE "key" = ?2"#,
        params![serde_json::to_string(&settings)?, SERVER_SETTINGS_KEY],
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("absdatabase.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE authors (id TEXT PRIMARY KEY, imagePath TEXT);
            CREATE TABLE books (id TEXT PRIMARY KEY, coverPath TEXT, audioFiles JSON, ebookFile JSON);
            CREATE TABLE libraryFolders (id TEXT PRIMARY KEY, path TEXT);
            CREATE TABLE libraryItems (id TEXT PRIMARY KEY, path TEXT, libraryFiles JSON);
            CREATE TABLE settings ("key" TEXT PRIMARY KEY, "value" JSON);

            INSERT INTO authors VALUES ('a1', '/metadata/authors/a1.jpg');
            INSERT INTO authors VALUES ('a2', NULL);
            INSERT INTO authors VALUES ('a3', '/elsewhere/metadata/a3.jpg');
            INSERT INTO books VALUES (
                'b1',
                '/metadata/items/b1/cover.jpg',
                '[{"index":1,"metadata":{"filename":"01.mp3","path":"/audiobooks/Dune/01.mp3"}},{"index":2,"metadata":{"filename":"02.mp3","path":"/audiobooks/Dune/02.mp3"}}]',
                NULL
            );
            INSERT INTO books VALUES (
                'b2',
                NULL,
                NULL,
                '{"ino":"1","metadata":{"filename":"book.epub","path":"/audiobooks/Book/book.epub"}}'
            );
            INSERT INTO libraryFolders VALUES ('f1', '/audiobooks');
            INSERT INTO libraryItems VALUES (
                'li1',
                '/audiobooks/Dune',
                '[{"metadata":{"path":"/audiobooks/Dune/01.mp3"}}]'
            );
            INSERT INTO settings VALUES ('server-settings', '{"backupPath":"/metadata/backups","scannerParseSubtitle":false}');
            INSERT INTO settings VALUES ('email-settings', '{"host":"smtp"}');
            "#,
        )
        .unwrap();
        path
    }

    fn query_string(path: &Path, sql: &str) -> Option<String> {
        let conn = Connection::open(path).unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("/metadata"), "/metadata/");
        assert_eq!(normalize_dir("/"), "/");
        assert_eq!(normalize_dir(r"C:\Users\finn\metadata"), "C:/Users/finn/metadata/");
        assert_eq!(normalize_dir("/data//books/"), "/data/books/");
    }

    #[test]
    fn test_path_rule_only_rewrites_prefix() {
        let rule = PathRule::new("/metadata", "/config/metadata");
        assert_eq!(
            rule.apply("/metadata/items/x/cover.jpg"),
            Some("/config/metadata/items/x/cover.jpg".to_string())
        );
        assert_eq!(rule.apply("/metadata"), Some("/config/metadata".to_string()));
        assert_eq!(rule.apply("/other/metadata/x.jpg"), None);
        assert_eq!(rule.apply("/metadatax/file"), None);
    }

    #[test]
    fn test_path_rule_from_root() {
        let rule = PathRule::new("/", r"D:\media\libraries");
        assert_eq!(
            rule.apply("/audiobooks/Dune/01.mp3"),
            Some("D:/media/libraries/audiobooks/Dune/01.mp3".to_string())
        );
    }

    #[test]
    fn test_path_rule_leaves_empty_values_alone() {
        assert_eq!(PathRule::new("/", "/mnt").apply(""), None);
        assert_eq!(PathRule::new("/audiobooks", "/mnt").apply(""), None);
        assert_eq!(PathRule::new("/", "/mnt").apply("/"), Some("/mnt/".to_string()));
    }

    #[test]
    fn test_path_rule_identity_is_no_change() {
        let rule = PathRule::new("/books", "/books/");
        assert_eq!(rule.apply("/books/a.mp3"), None);
    }

    #[test]
    fn test_open_missing_database() {
        let temp = TempDir::new().unwrap();
        let result = BackupDb::open(&temp.path().join("absdatabase.sqlite"));
        assert!(result.is_err());
        // Opening must not create the file
        assert!(!temp.path().join("absdatabase.sqlite").exists());
    }

    #[test]
    fn test_migrate_rewrites_all_paths() {
        let temp = TempDir::new().unwrap();
        let path = create_fixture(temp.path());

        let mut db = BackupDb::open(&path).unwrap();
        let summary = db
            .migrate(
                &PathRule::new("/metadata", "/config/metadata"),
                &PathRule::new("/audiobooks", "/mnt/media/audiobooks"),
                false,
            )
            .unwrap();
        drop(db);

        assert!(summary.settings_updated);
        assert!(summary.skipped_tables.contains(&"feeds"));
        assert!(summary.skipped_tables.contains(&"podcastEpisodes"));

        assert_eq!(
            query_string(&path, "SELECT imagePath FROM authors WHERE id = 'a1'"),
            Some("/config/metadata/authors/a1.jpg".to_string())
        );
        assert_eq!(query_string(&path, "SELECT imagePath FROM authors WHERE id = 'a2'"), None);
        assert_eq!(
            query_string(&path, "SELECT imagePath FROM authors WHERE id = 'a3'"),
            Some("/elsewhere/metadata/a3.jpg".to_string())
        );
        assert_eq!(
            query_string(&path, "SELECT path FROM libraryFolders WHERE id = 'f1'"),
            Some("/mnt/media/audiobooks".to_string())
        );

        let audio_files: Value = serde_json::from_str(
            &query_string(&path, "SELECT audioFiles FROM books WHERE id = 'b1'").unwrap(),
        )
        .unwrap();
        assert_eq!(
            audio_files[1]["metadata"]["path"],
            "/mnt/media/audiobooks/Dune/02.mp3"
        );
        // Other fields of the record survive
        assert_eq!(audio_files[0]["metadata"]["filename"], "01.mp3");
        assert_eq!(audio_files[0]["index"], 1);

        let ebook: Value = serde_json::from_str(
            &query_string(&path, "SELECT ebookFile FROM books WHERE id = 'b2'").unwrap(),
        )
        .unwrap();
        assert_eq!(ebook["metadata"]["path"], "/mnt/media/audiobooks/Book/book.epub");

        let settings: Value = serde_json::from_str(
            &query_string(&path, "SELECT value FROM settings WHERE key = 'server-settings'").unwrap(),
        )
        .unwrap();
        assert_eq!(settings["backupPath"], "/config/metadata/backups");
        assert_eq!(settings["scannerParseSubtitle"], false);

        let books = summary
            .changes
            .iter()
            .find(|c| c.table == "books" && c.column == "audioFiles")
            .unwrap();
        assert_eq!(books.rows, 1);
    }

    #[test]
    fn test_dry_run_leaves_database_untouched() {
        let temp = TempDir::new().unwrap();
        let path = create_fixture(temp.path());

        let mut db = BackupDb::open(&path).unwrap();
        let summary = db
            .migrate(
                &PathRule::new("/metadata", "/config/metadata"),
                &PathRule::new("/audiobooks", "/mnt/audiobooks"),
                true,
            )
            .unwrap();
        drop(db);

        assert!(summary.total_rows() > 0);
        assert_eq!(
            query_string(&path, "SELECT imagePath FROM authors WHERE id = 'a1'"),
            Some("/metadata/authors/a1.jpg".to_string())
        );
        assert_eq!(
            query_string(&path, "SELECT path FROM libraryItems WHERE id = 'li1'"),
            Some("/audiobooks/Dune".to_string())
        );
    }

    #[test]
    fn test_unreadable_json_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = create_fixture(temp.path());
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "INSERT INTO libraryItems VALUES ('li2', '/audiobooks/Broken', 'not json')",
                [],
            )
            .unwrap();
        }

        let mut db = BackupDb::open(&path).unwrap();
        let summary = db
            .migrate(
                &PathRule::new("/metadata", "/m"),
                &PathRule::new("/audiobooks", "/a"),
                false,
            )
            .unwrap();
        drop(db);

        let files = summary
            .changes
            .iter()
            .find(|c| c.table == "libraryItems" && c.column == "libraryFiles")
            .unwrap();
        assert_eq!(files.rows, 1);
        assert_eq!(
            query_string(&path, "SELECT libraryFiles FROM libraryItems WHERE id = 'li2'"),
            Some("not json".to_string())
        );
    }
}
