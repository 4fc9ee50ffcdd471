mod abs;
mod chapters;
mod cli;
mod commands;
mod config;
mod database;
mod descriptions;
mod genres;
mod plex;
mod report;
mod safety;
mod series;
mod sessions;
mod tagging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::EnvFilter;

use chapters::MatchOptions;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    if let Commands::Init { force } = cli.command {
        return commands::init::run(&config_path, force);
    }

    let config = Config::load_from(&config_path)?;
    let connection = || config.connection(cli.host.as_deref(), cli.token.as_deref());

    match cli.command {
        Commands::MatchChapters {
            library,
            threshold,
            use_tracks,
            no_search,
            quick_match,
            no_rate_protection,
            no_dry_run,
            json,
        } => {
            let options = MatchOptions {
                threshold: threshold.unwrap_or(config.chapters.threshold),
                quick_match: quick_match || config.chapters.quick_match,
                search_for_asin: config.chapters.search_for_asin && !no_search,
                use_tracks: use_tracks || config.chapters.use_tracks_as_chapters,
                dry_run: !no_dry_run,
            };
            commands::match_chapters::run(
                &config,
                &connection()?,
                library.as_deref(),
                options,
                config.chapters.rate_protection && !no_rate_protection,
                json,
                cli.quiet,
            )?;
        }
        Commands::CleanupSessions {
            users,
            threshold_hours,
            limit,
            no_dry_run,
        } => {
            commands::cleanup_sessions::run(
                &config,
                &connection()?,
                &users,
                threshold_hours,
                limit,
                no_dry_run,
            )?;
        }
        Commands::CorrectSessions { user } => {
            commands::correct_sessions::run(&connection()?, &user)?;
        }
        Commands::MigrateBackup {
            database,
            old_metadata,
            new_metadata,
            old_libraries,
            new_libraries,
            no_dry_run,
            no_backup,
        } => {
            commands::migrate_backup::run(
                &database,
                &old_metadata,
                &new_metadata,
                &old_libraries,
                &new_libraries,
                no_dry_run,
                no_backup,
            )?;
        }
        Commands::ImportPlex {
            plex_host,
            plex_token,
            section,
            no_dry_run,
        } => {
            commands::import_plex::run(
                &config,
                &connection()?,
                plex_host.as_deref(),
                plex_token.as_deref(),
                section,
                no_dry_run,
            )?;
        }
        Commands::RemoveEmptyAuthors { library, yes } => {
            commands::remove_empty_authors::run(&connection()?, library.as_deref(), yes)?;
        }
        Commands::SplitGenres {
            libraries,
            target,
            delimiter,
            no_dry_run,
        } => {
            commands::split_genres::run(
                &config,
                &connection()?,
                &libraries,
                target,
                delimiter.as_deref(),
                no_dry_run,
            )?;
        }
        Commands::ForceMetadata {
            libraries,
            no_dry_run,
        } => {
            commands::force_metadata::run(&connection()?, &libraries, no_dry_run)?;
        }
        Commands::RenameSeries {
            library,
            series,
            name,
            no_dry_run,
        } => {
            let connection = connection()?;
            let library_id = config
                .library_id(library.as_deref())
                .context("No library selected. Use --library or [chapters] library_id in config")?;
            commands::rename_series::run(&connection, &library_id, &series, &name, no_dry_run)?;
        }
        Commands::PathTagUpdater {
            library,
            rules,
            target,
            no_dry_run,
        } => {
            let connection = connection()?;
            let library_id = config
                .library_id(library.as_deref())
                .context("No library selected. Use --library or [chapters] library_id in config")?;
            commands::path_tag_updater::run(&connection, &library_id, &rules, target, no_dry_run)?;
        }
        Commands::UpdateDescriptions {
            library,
            no_rate_protection,
            no_dry_run,
            json,
        } => {
            commands::update_descriptions::run(
                &config,
                &connection()?,
                library.as_deref(),
                no_dry_run,
                config.chapters.rate_protection && !no_rate_protection,
                json,
                cli.quiet,
            )?;
        }
        Commands::SetFinishedDate {
            items,
            date,
            no_dry_run,
        } => {
            commands::set_finished_date::run(&connection()?, &items, &date, no_dry_run)?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}
