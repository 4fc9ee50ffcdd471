//! cleanup-sessions command - delete listening sessions that ran implausibly long

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::runtime;
use crate::abs::AbsClient;
use crate::config::{Config, Connection};
use crate::sessions::select_oversized;

pub fn run(
    config: &Config,
    connection: &Connection,
    users: &[String],
    threshold_hours: Option<f64>,
    limit: Option<u32>,
    no_dry_run: bool,
) -> Result<()> {
    let threshold = threshold_hours.unwrap_or(config.sessions.threshold_hours);
    let limit = limit.unwrap_or(config.sessions.fetch_limit);
    let client = AbsClient::new(connection)?;

    runtime()?.block_on(async {
        let targets: Vec<(String, String)> = if users.is_empty() {
            client
                .users()
                .await
                .context("Failed to list users")?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        } else {
            users.iter().map(|id| (id.clone(), id.clone())).collect()
        };

        println!(
            "Deleting sessions longer than {} hours for {} user(s)",
            threshold,
            targets.len()
        );
        if !no_dry_run {
            println!("{}", "Dry run: nothing will be deleted".yellow());
        }

        for (user_id, name) in &targets {
            println!();
            println!("{}", name.bold());

            let page = match client.listening_sessions(user_id, 0, limit).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Failed to list sessions of {}: {}", user_id, e);
                    println!("  {}", format!("Could not list sessions: {}", e).red());
                    continue;
                }
            };

            let selection = select_oversized(&page.sessions, threshold);
            let mut deleted = 0;
            for (session_id, hours) in &selection.to_delete {
                if !no_dry_run {
                    println!("  Would delete {} ({:.2} hours)", session_id, hours);
                    continue;
                }

                match client.delete_session(session_id).await {
                    Ok(()) => {
                        deleted += 1;
                        println!("  Deleted {} ({:.2} hours)", session_id, hours);
                    }
                    Err(e) => {
                        warn!("Failed to delete session {}: {}", session_id, e);
                        println!("  {}", format!("Failed to delete {}: {}", session_id, e).red());
                    }
                }
            }

            println!(
                "  {} of {} session(s) over the threshold {}",
                if no_dry_run { deleted } else { selection.to_delete.len() },
                selection.to_delete.len(),
                if no_dry_run { "deleted" } else { "selected" }
            );
            println!(
                "  {:.2} hours removed, {:.2} hours kept",
                selection.hours_deleted, selection.hours_kept
            );
        }

        Ok::<_, anyhow::Error>(())
    })
}
