//! correct-sessions command - interactively fix the listening time of sessions

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use super::{prompt, runtime};
use crate::abs::{AbsClient, ListeningSession, SessionPage};
use crate::config::Connection;
use crate::sessions::{
    display_number, format_hms, parse_listening_time, session_for_number, session_json,
    suggested_hours, MenuInput, PAGE_SIZE,
};

pub fn run(connection: &Connection, user: &str) -> Result<()> {
    let client = AbsClient::new(connection)?;
    let rt = runtime()?;

    let mut page_number = 0u64;
    loop {
        let page = rt
            .block_on(client.listening_sessions(user, page_number, PAGE_SIZE))
            .with_context(|| format!("Failed to list sessions of user {}", user))?;
        print_page(&page);

        match MenuInput::parse(&prompt("Session number, next, prev or exit: ")?) {
            MenuInput::Exit => break,
            MenuInput::Next => {
                if page.num_pages > 0 && page_number + 1 >= page.num_pages {
                    println!("{}", "Already on the last page".yellow());
                } else {
                    page_number += 1;
                }
            }
            MenuInput::Previous => {
                if page_number == 0 {
                    println!("{}", "Already on the first page".yellow());
                } else {
                    page_number -= 1;
                }
            }
            MenuInput::Select(number) => match session_for_number(&page, number) {
                Some(session) => edit_session(&rt, &client, session)?,
                None => println!("{}", format!("No session {} on this page", number).red()),
            },
            MenuInput::Invalid => println!("{}", "Invalid input".red()),
        }
    }

    Ok(())
}

fn print_page(page: &SessionPage) {
    println!();
    println!(
        "{}",
        format!(
            "Page {} of {} ({} sessions)",
            page.page + 1,
            page.num_pages.max(1),
            page.total
        )
        .bold()
    );
    for (index, session) in page.sessions.iter().enumerate() {
        println!(
            "{}. {} - {}",
            display_number(page.page, index),
            session.title(),
            format_hms(session.time_listening.unwrap_or(0.0))
        );
    }
}

fn edit_session(
    rt: &tokio::runtime::Runtime,
    client: &AbsClient,
    session: &ListeningSession,
) -> Result<()> {
    let suggested = suggested_hours(session);

    println!();
    println!("{}", session.title().bold());
    println!(
        "  Listening time: {}",
        format_hms(session.time_listening.unwrap_or(0.0))
    );
    println!("  Start position: {}", format_hms(session.start_time));
    println!("  End position:   {}", format_hms(session.current_time));

    let seconds = loop {
        let input = prompt(&format!(
            "New listening time in hours [{}]: ",
            format!("{:.2}", suggested).green()
        ))?;
        match parse_listening_time(&input, suggested) {
            Some(seconds) => break seconds,
            None => println!("{}", "Enter a number of hours or leave empty".red()),
        }
    };

    let mut corrected = session.clone();
    corrected.time_listening = Some(seconds);

    // The server has no session update endpoint: delete and re-create
    if let Err(e) = rt.block_on(client.delete_session(&session.id)) {
        warn!("Failed to delete session {}: {}", session.id, e);
        println!(
            "{}",
            format!("Session {} was not changed: {}", session.id, e).red()
        );
        return Ok(());
    }

    if let Err(e) = rt.block_on(client.create_local_session(&corrected)) {
        let json = session_json(&corrected)
            .unwrap_or_else(|json_error| format!("<unprintable session: {}>", json_error));
        warn!(
            "Session {} was deleted but re-creating it failed: {}\n{}",
            session.id, e, json
        );
        println!(
            "{}",
            format!(
                "Session {} was deleted but could not be re-created: {}",
                session.id, e
            )
            .red()
        );
        println!("Post this to /api/session/local to restore it:");
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{} Listening time set to {}",
        "✓".green(),
        format_hms(seconds)
    );
    Ok(())
}
