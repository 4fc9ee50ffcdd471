//! Listening session selection and the correction menu's input handling

use crate::abs::{ListeningSession, SessionPage};

/// Sessions shown per page in the correction menu
pub const PAGE_SIZE: u32 = 10;

/// Sessions picked for deletion, with the hours on each side of the threshold
#[derive(Debug, Default)]
pub struct Selection {
    pub to_delete: Vec<(String, f64)>,
    pub hours_deleted: f64,
    pub hours_kept: f64,
}

/// Pick sessions that ran strictly longer than `threshold_hours`.
///
/// Sessions without a recorded listening time are ignored entirely.
pub fn select_oversized(sessions: &[ListeningSession], threshold_hours: f64) -> Selection {
    let mut selection = Selection::default();

    for session in sessions {
        let seconds = match session.time_listening {
            Some(s) if s > 0.0 => s,
            _ => continue,
        };

        let hours = seconds / 3600.0;
        if hours > threshold_hours {
            selection.hours_deleted += hours;
            selection.to_delete.push((session.id.clone(), hours));
        } else {
            selection.hours_kept += hours;
        }
    }

    selection
}

/// A line typed at the correction menu prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuInput {
    Next,
    Previous,
    Exit,
    Select(u64),
    Invalid,
}

impl MenuInput {
    pub fn parse(input: &str) -> Self {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "next" | "n" => MenuInput::Next,
            "prev" | "previous" | "p" => MenuInput::Previous,
            "exit" | "quit" | "q" => MenuInput::Exit,
            other => other
                .parse::<u64>()
                .map(MenuInput::Select)
                .unwrap_or(MenuInput::Invalid),
        }
    }
}

/// Number shown in front of the `index`-th (zero-based) session of a page
pub fn display_number(page: u64, index: usize) -> u64 {
    page * PAGE_SIZE as u64 + index as u64 + 1
}

/// Session behind a displayed number, if it is on this page
pub fn session_for_number(page: &SessionPage, number: u64) -> Option<&ListeningSession> {
    let first = display_number(page.page, 0);
    let index = number.checked_sub(first)?;
    page.sessions.get(usize::try_from(index).ok()?)
}

/// Hours between the session's start and end position
pub fn suggested_hours(session: &ListeningSession) -> f64 {
    ((session.current_time - session.start_time) / 3600.0).max(0.0)
}

/// Parse the new listening time typed in hours; empty input takes the
/// suggestion. Returns seconds.
pub fn parse_listening_time(input: &str, suggested_hours: f64) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return Some(suggested_hours * 3600.0);
    }

    input
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite() && *h >= 0.0)
        .map(|h| h * 3600.0)
}

/// Format seconds as HH:MM:SS
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Full session as pretty JSON, enough to re-post it by hand
pub fn session_json(session: &ListeningSession) -> serde_json::Result<String> {
    serde_json::to_string_pretty(session)
}
