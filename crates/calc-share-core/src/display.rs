//! Presentation helpers for shared values.

use chrono::{DateTime, Utc};

use crate::binding::AvailableImport;

/// Relative time string (e.g., "2 hours ago", "Yesterday").
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(then);

    if duration.num_minutes() < 1 {
        "Just now".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if duration.num_days() == 1 {
        "Yesterday".to_string()
    } else if duration.num_days() < 7 {
        let days = duration.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if duration.num_weeks() < 4 {
        let weeks = duration.num_weeks();
        format!("{} week{} ago", weeks, if weeks == 1 { "" } else { "s" })
    } else {
        then.format("%b %d, %Y").to_string()
    }
}

/// Relative time for an epoch-millisecond timestamp.
pub fn time_ago(saved_at: i64, now: i64) -> String {
    match (
        DateTime::from_timestamp_millis(saved_at),
        DateTime::from_timestamp_millis(now),
    ) {
        (Some(then), Some(now)) => relative_time(then, now),
        _ => "Unknown".to_string(),
    }
}

/// Banner text for a set of available imports, e.g.
/// "2 values available from Salary Calculator (5 minutes ago)".
///
/// Names the most recent writer; `None` when nothing is available.
pub fn banner_message(imports: &[AvailableImport], now: i64) -> Option<String> {
    let newest = imports.iter().max_by_key(|import| import.entry.saved_at)?;
    let count = imports.len();
    let mut sources: Vec<&str> = imports
        .iter()
        .map(|import| import.entry.source_name.as_str())
        .collect();
    sources.sort_unstable();
    sources.dedup();

    let from = if sources.len() == 1 {
        newest.entry.source_name.clone()
    } else {
        format!("{} calculators", sources.len())
    };
    Some(format!(
        "{} value{} available from {} ({})",
        count,
        if count == 1 { "" } else { "s" },
        from,
        banner_age(newest.entry.saved_at, now)
    ))
}

/// [`time_ago`] for use mid-sentence. Dates keep their month capitalized.
fn banner_age(saved_at: i64, now: i64) -> String {
    let age = time_ago(saved_at, now);
    match age.as_str() {
        "Just now" | "Yesterday" | "Unknown" => age.to_lowercase(),
        _ => age,
    }
}
