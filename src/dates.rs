//! Date normalization for heterogeneous filing dates.
//!
//! Filings carry dates as ISO strings, German dot notation, or free text
//! inside a larger blob. [`to_iso_date`] tries a fixed strategy chain and
//! returns the first real calendar date, formatted `YYYY-MM-DD`.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn re_iso_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(20\d{2}|19\d{2})[-/.](\d{1,2})[-/.](\d{1,2})\b").unwrap())
}

fn re_day_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[.\-/](\d{1,2})[.\-/](\d{2,4})\b").unwrap())
}

fn re_german_month() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,2})\.?\s*(januar|februar|märz|maerz|april|mai|juni|juli|august|september|oktober|november|dezember)\s+(\d{4})\b",
        )
        .unwrap()
    })
}

fn german_month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "januar" => Some(1),
        "februar" => Some(2),
        "märz" | "maerz" => Some(3),
        "april" => Some(4),
        "mai" => Some(5),
        "juni" => Some(6),
        "juli" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "oktober" => Some(10),
        "november" => Some(11),
        "dezember" => Some(12),
        _ => None,
    }
}

/// Normalize an arbitrary string (possibly a whole document) to an
/// ISO-8601 date. Strategies in tie-break order, first real calendar
/// date wins:
///
/// 1. year-first pattern `YYYY-M-D` (also `/` and `.` separators),
/// 2. day-first pattern `D.M.Y` (2-digit years get 2000 added),
/// 3. day-first free text, including German month names.
///
/// Invalid calendar dates (e.g. February 30) are rejected per stage and
/// parsing continues; `None` means no usable date was found.
pub fn to_iso_date(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = re_iso_like().captures(s) {
        let y: i32 = caps[1].parse().ok()?;
        let mo: u32 = caps[2].parse().ok()?;
        let d: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(y, mo, d) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    if let Some(caps) = re_day_first().captures(s) {
        let d: u32 = caps[1].parse().ok()?;
        let mo: u32 = caps[2].parse().ok()?;
        let mut y: i32 = caps[3].parse().ok()?;
        if y < 100 {
            y += 2000;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(y, mo, d) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    if let Some(caps) = re_german_month().captures(s) {
        let d: u32 = caps[1].parse().ok()?;
        let mo = german_month_number(&caps[2])?;
        let y: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(y, mo, d) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    // Last resort: day-first interpretations of the whole (short) string.
    for fmt in ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    None
}

/// Strict ISO-8601 calendar-date check used by the validator.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_like_padded() {
        assert_eq!(to_iso_date("2024-3-5").as_deref(), Some("2024-03-05"));
        assert_eq!(to_iso_date("2024/3/5").as_deref(), Some("2024-03-05"));
        assert_eq!(to_iso_date("2024.12.01").as_deref(), Some("2024-12-01"));
    }

    #[test]
    fn test_german_dot_format() {
        assert_eq!(to_iso_date("5.3.2024").as_deref(), Some("2024-03-05"));
        assert_eq!(to_iso_date("05.03.24").as_deref(), Some("2024-03-05"));
        assert_eq!(to_iso_date("17/06/2023").as_deref(), Some("2023-06-17"));
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        assert_eq!(to_iso_date("31.02.2024"), None);
        assert_eq!(to_iso_date("2024-13-01"), None);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(to_iso_date("not a date"), None);
        assert_eq!(to_iso_date(""), None);
        assert_eq!(to_iso_date("   "), None);
    }

    #[test]
    fn test_embedded_in_text() {
        let blob = "Bezirksverordnetenversammlung\nSitzung vom 14.05.2024\nDrucksache 1234/XXI";
        assert_eq!(to_iso_date(blob).as_deref(), Some("2024-05-14"));
    }

    #[test]
    fn test_year_first_wins_over_day_first() {
        // Both patterns present; strategy 1 is tried first.
        assert_eq!(
            to_iso_date("2024-03-05 bzw. 06.04.2024").as_deref(),
            Some("2024-03-05")
        );
    }

    #[test]
    fn test_german_month_names() {
        assert_eq!(to_iso_date("5. März 2024").as_deref(), Some("2024-03-05"));
        assert_eq!(
            to_iso_date("Berlin, den 12. Oktober 2023").as_deref(),
            Some("2023-10-12")
        );
    }

    #[test]
    fn test_parse_iso_strict() {
        assert!(parse_iso("2024-03-05").is_some());
        assert!(parse_iso("2024-3-5").is_none());
        assert!(parse_iso("05.03.2024").is_none());
        assert!(parse_iso("2024-02-30").is_none());
    }
}
