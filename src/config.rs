use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from ~/.config/absctl/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chapters: ChaptersConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub genres: GenresConfig,
    #[serde(default)]
    pub plex: PlexConfig,
}

/// Connection settings for the Audiobookshelf server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. "https://abs.example.com"
    pub host: Option<String>,

    /// API token from the user settings page
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout in seconds for batch requests, which touch the whole library
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_timeout_secs() -> u64 {
    6000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            batch_timeout_secs: default_batch_timeout_secs(),
        }
    }
}

/// Configuration for the match-chapters command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaptersConfig {
    /// Library processed when --library is not given
    pub library_id: Option<String>,

    /// Metadata provider used for ASIN searches (audible.com, audible.de, ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Region code for chapter lookups (US, DE, ...)
    #[serde(default = "default_region")]
    pub region: String,

    /// Maximum tolerated difference between recorded and found chapter counts
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Sleep between items to stay clear of the server's rate limiting
    #[serde(default = "default_true")]
    pub rate_protection: bool,

    /// Search the provider for an ASIN when an item has none
    #[serde(default = "default_true")]
    pub search_for_asin: bool,

    /// Use audio tracks as chapters when no ASIN is available
    #[serde(default)]
    pub use_tracks_as_chapters: bool,

    /// Let the server match items without an ASIN instead of searching.
    /// The server stores the matched metadata, so this changes items even
    /// when their chapters are kept.
    #[serde(default)]
    pub quick_match: bool,
}

fn default_provider() -> String {
    "audible.com".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_threshold() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for ChaptersConfig {
    fn default() -> Self {
        Self {
            library_id: None,
            provider: default_provider(),
            region: default_region(),
            threshold: default_threshold(),
            rate_protection: true,
            search_for_asin: true,
            use_tracks_as_chapters: false,
            quick_match: false,
        }
    }
}

/// Configuration for the listening session tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Sessions longer than this many hours are deleted by cleanup-sessions
    #[serde(default = "default_threshold_hours")]
    pub threshold_hours: f64,

    /// Number of sessions requested per user (no pagination)
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

fn default_threshold_hours() -> f64 {
    16.0
}

fn default_fetch_limit() -> u32 {
    2_000_000
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            threshold_hours: default_threshold_hours(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

/// Configuration for split-genres
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenresConfig {
    /// Separator inside compound genre names
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Compound values that are left alone
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,
}

fn default_delimiter() -> String {
    ", ".to_string()
}

fn default_skip() -> Vec<String> {
    vec!["Mystery, Thriller & Suspense".to_string()]
}

impl Default for GenresConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            skip: default_skip(),
        }
    }
}

/// Configuration for import-plex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    #[serde(default = "default_plex_host")]
    pub host: String,

    pub token: Option<String>,

    /// Plex library section holding the audiobooks
    #[serde(default = "default_section_id")]
    pub section_id: u32,
}

fn default_plex_host() -> String {
    "http://localhost:32400".to_string()
}

fn default_section_id() -> u32 {
    1
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            host: default_plex_host(),
            token: None,
            section_id: default_section_id(),
        }
    }
}

/// Resolved server connection: host without trailing slash plus token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub token: String,
    pub timeout: Duration,
    /// Applied per request to the batch endpoints
    pub batch_timeout: Duration,
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("absctl").join("config.toml"))
    }

    /// Resolve host and token, with CLI/env values taking precedence
    pub fn connection(&self, host: Option<&str>, token: Option<&str>) -> Result<Connection> {
        let host = host
            .map(String::from)
            .or_else(|| self.server.host.clone())
            .filter(|h| !h.trim().is_empty());
        let token = token
            .map(String::from)
            .or_else(|| self.server.token.clone())
            .filter(|t| !t.trim().is_empty());

        let Some(host) = host else {
            bail!("No server host configured. Use --host, ABS_HOST or [server] host in config");
        };
        let Some(token) = token else {
            bail!("No API token configured. Use --token, ABS_TOKEN or [server] token in config");
        };

        Ok(Connection {
            host: host.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            timeout: Duration::from_secs(self.server.timeout_secs),
            batch_timeout: Duration::from_secs(self.server.batch_timeout_secs),
        })
    }

    /// Get the library for match-chapters, with CLI override taking precedence
    pub fn library_id(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(String::from)
            .or_else(|| self.chapters.library_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.server.host.is_none());
        assert_eq!(config.chapters.threshold, 3);
        assert_eq!(config.chapters.provider, "audible.com");
        assert!(config.chapters.rate_protection);
        assert!(!config.chapters.use_tracks_as_chapters);
        assert!(!config.chapters.quick_match);
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "https://abs.example.com/"
token = "secret"

[chapters]
library_id = "lib-1"
provider = "audible.de"
region = "DE"
threshold = 5
use_tracks_as_chapters = true
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.chapters.provider, "audible.de");
        assert_eq!(config.chapters.region, "DE");
        assert_eq!(config.chapters.threshold, 5);
        assert!(config.chapters.use_tracks_as_chapters);
        // Unset fields keep their defaults
        assert!(config.chapters.search_for_asin);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.server.batch_timeout_secs, 6000);

        let conn = config.connection(None, None).unwrap();
        assert_eq!(conn.host, "https://abs.example.com");
        assert_eq!(conn.token, "secret");
        assert_eq!(conn.timeout, Duration::from_secs(30));
        assert_eq!(conn.batch_timeout, Duration::from_secs(6000));
    }

    #[test]
    fn test_batch_timeout_is_configurable() {
        let config: Config = toml::from_str(
            r#"
[server]
host = "http://localhost:13378"
token = "secret"
timeout_secs = 10
batch_timeout_secs = 900
"#,
        )
        .unwrap();

        let conn = config.connection(None, None).unwrap();
        assert_eq!(conn.timeout, Duration::from_secs(10));
        assert_eq!(conn.batch_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        config.server.host = Some("http://config-host".to_string());
        config.server.token = Some("config-token".to_string());
        config.chapters.library_id = Some("config-lib".to_string());

        let conn = config
            .connection(Some("http://cli-host"), Some("cli-token"))
            .unwrap();
        assert_eq!(conn.host, "http://cli-host");
        assert_eq!(conn.token, "cli-token");

        assert_eq!(config.library_id(Some("cli-lib")), Some("cli-lib".to_string()));
        assert_eq!(config.library_id(None), Some("config-lib".to_string()));
    }

    #[test]
    fn test_missing_host_is_an_error() {
        let config = Config::default();
        let err = config.connection(None, Some("token")).unwrap_err();
        assert!(err.to_string().contains("No server host configured"));

        let err = config.connection(Some("http://host"), Some("  ")).unwrap_err();
        assert!(err.to_string().contains("No API token configured"));
    }

    #[test]
    fn test_sessions_and_genres_defaults() {
        let config = Config::default();
        assert_eq!(config.sessions.threshold_hours, 16.0);
        assert_eq!(config.sessions.fetch_limit, 2_000_000);
        assert_eq!(config.genres.delimiter, ", ");
        assert_eq!(config.genres.skip, vec!["Mystery, Thriller & Suspense"]);
        assert_eq!(config.plex.section_id, 1);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = Config::default();
        config.server.host = Some("http://localhost:13378".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.genres.skip, config.genres.skip);
    }
}
