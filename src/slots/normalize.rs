//! Canonical forms for primitive matches, and the confidence scorer.

use chrono::NaiveDate;

use super::{Confidence, Slots, TimeUnit};

/// Maps a matched unit word ("day", "Weeks") to its unit.
pub fn time_unit(word: &str) -> Option<TimeUnit> {
    match word.to_ascii_lowercase().trim_end_matches('s') {
        "day" => Some(TimeUnit::Days),
        "week" => Some(TimeUnit::Weeks),
        "month" => Some(TimeUnit::Months),
        "year" => Some(TimeUnit::Years),
        _ => None,
    }
}

/// Parses `raw` with `format`, rejecting strings that are not real calendar days.
pub fn calendar_date(raw: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, format).ok()
}

/// A positive result limit, or nothing.
pub fn positive_limit(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|limit| *limit > 0)
}

/// Trims surrounding quotes and whitespace from a captured name.
pub fn clean_capture(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// High when app, environment and a time filter are all present, medium for
/// two of the three, low otherwise. Advisory only.
pub fn confidence(slots: &Slots) -> Confidence {
    let filled = [
        slots.app_name.is_some(),
        slots.environment.is_some(),
        slots.time_range.is_some() || slots.specific_date.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    match filled {
        3 => Confidence::High,
        2 => Confidence::Medium,
        _ => Confidence::Low,
    }
}
