use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::genres::GenreTarget;
use crate::tagging::PathTagRule;

#[derive(Parser)]
#[command(name = "absctl")]
#[command(about = "Maintenance tools for an Audiobookshelf server: chapters, sessions, backups and metadata")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of ~/.config/absctl/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server URL, e.g. https://abs.example.com
    #[arg(long, global = true, env = "ABS_HOST")]
    pub host: Option<String>,

    /// API token
    #[arg(long, global = true, env = "ABS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match chapters of every book in a library against the metadata provider
    MatchChapters {
        /// Library id (uses config default if not specified)
        #[arg(long)]
        library: Option<String>,

        /// Maximum tolerated difference between current and found chapter counts
        #[arg(long)]
        threshold: Option<u32>,

        /// Use audio tracks as chapters when no ASIN is available
        #[arg(long)]
        use_tracks: bool,

        /// Do not search the provider for missing ASINs
        #[arg(long)]
        no_search: bool,

        /// Let the server match books without an ASIN (stores the matched metadata)
        #[arg(long)]
        quick_match: bool,

        /// Do not pause between items
        #[arg(long)]
        no_rate_protection: bool,

        /// Actually write chapters (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete listening sessions longer than a threshold
    CleanupSessions {
        /// User ids (default: all users)
        #[arg(long = "user")]
        users: Vec<String>,

        /// Sessions longer than this many hours are deleted
        #[arg(long)]
        threshold_hours: Option<f64>,

        /// Number of sessions to fetch per user
        #[arg(long)]
        limit: Option<u32>,

        /// Actually delete sessions (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Interactively correct the listening time of a user's sessions
    CorrectSessions {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Rewrite stored paths in a backup's absdatabase.sqlite
    MigrateBackup {
        /// Path to absdatabase.sqlite extracted from the backup
        database: PathBuf,

        /// Metadata directory on the old server
        #[arg(long)]
        old_metadata: String,

        /// Metadata directory on the new server
        #[arg(long)]
        new_metadata: String,

        /// Libraries root on the old server
        #[arg(long)]
        old_libraries: String,

        /// Libraries root on the new server
        #[arg(long)]
        new_libraries: String,

        /// Actually write changes (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,

        /// Skip creating backup file
        #[arg(long = "no-backup-i-void-my-warranty")]
        no_backup: bool,
    },

    /// Import watch progress from a Plex library section
    ImportPlex {
        /// Plex server URL (uses config default if not specified)
        #[arg(long)]
        plex_host: Option<String>,

        /// Plex token
        #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
        plex_token: Option<String>,

        /// Plex library section id
        #[arg(long)]
        section: Option<u32>,

        /// Actually send progress (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Delete authors that have no books
    RemoveEmptyAuthors {
        /// Library id (default: all libraries)
        #[arg(long)]
        library: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Split compound genres or tags ("Sci-Fi, Fantasy") into single values
    SplitGenres {
        /// Library id, repeatable (default: all libraries)
        #[arg(long = "library")]
        libraries: Vec<String>,

        /// Field to split
        #[arg(long, value_enum, default_value = "genres")]
        target: GenreTarget,

        /// Separator inside compound values (uses config default if not specified)
        #[arg(long)]
        delimiter: Option<String>,

        /// Actually update items (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Tag every item with "force-metadata" so the server refreshes its metadata
    ForceMetadata {
        /// Library id, repeatable (default: all libraries)
        #[arg(long = "library")]
        libraries: Vec<String>,

        /// Actually tag items (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Rename a series on every book that belongs to it
    RenameSeries {
        /// Library id (uses config default if not specified)
        #[arg(long)]
        library: Option<String>,

        /// Series id
        #[arg(long)]
        series: String,

        /// New series name
        #[arg(long)]
        name: String,

        /// Actually rename (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Add a genre or tag to items whose path matches a regex
    PathTagUpdater {
        /// Library id (uses config default if not specified)
        #[arg(long)]
        library: Option<String>,

        /// Rule "<regex>:<value>", repeatable; the value follows the last colon
        #[arg(long = "rule", required = true)]
        rules: Vec<PathTagRule>,

        /// Field the value is added to
        #[arg(long, value_enum, default_value = "tags")]
        target: GenreTarget,

        /// Actually update items (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Replace item descriptions with the metadata provider's
    UpdateDescriptions {
        /// Library id (uses config default if not specified)
        #[arg(long)]
        library: Option<String>,

        /// Do not pause between items
        #[arg(long)]
        no_rate_protection: bool,

        /// Actually write descriptions (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the finished date of items
    SetFinishedDate {
        /// Library item ids
        #[arg(required = true)]
        items: Vec<String>,

        /// Date the items were finished (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Actually update progress (default: dry-run)
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Create a config file interactively
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}
