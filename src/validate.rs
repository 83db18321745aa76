//! Admission checks for a candidate filing.
//!
//! All checks are evaluated (no short-circuit) so a single call reports
//! every violation at once. The minimum-content-length rule is a warning
//! here; the batch ingest path treats warnings as blocking while the
//! interactive extract path only prints them.

use crate::dates;
use crate::models::{DocTable, Vorgang};

/// Minimum admissible content length, in characters.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Outcome of validating one candidate record.
#[derive(Debug, Default)]
pub struct Report {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Errors and warnings as one list, errors first.
    pub fn all(&self) -> Vec<String> {
        let mut out = self.errors.clone();
        out.extend(self.warnings.iter().cloned());
        out
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Validate a candidate record against the required-field schema.
///
/// Checks: every required field present and non-empty (all missing ones
/// listed by name), `tabelle` one of the four allowed tables, `datum` a
/// real ISO-8601 calendar date, `inhalt` at least [`MIN_CONTENT_CHARS`]
/// characters (warning). Pure; no side effects.
pub fn validate(v: &Vorgang) -> Report {
    let mut report = Report::default();

    let mut missing = Vec::new();
    for (name, value) in [
        ("tabelle", &v.tabelle),
        ("titel", &v.titel),
        ("datum", &v.datum),
        ("drucksache", &v.drucksache),
        ("inhalt", &v.inhalt),
        ("status", &v.status),
        ("fraktion", &v.fraktion),
    ] {
        if is_blank(value) {
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        report
            .errors
            .push(format!("missing required fields: {}", missing.join(", ")));
    }

    if let Some(tabelle) = v.tabelle.as_deref() {
        if !tabelle.trim().is_empty() && DocTable::parse(tabelle).is_none() {
            report.errors.push(format!(
                "tabelle '{}' is not one of: {}",
                tabelle,
                DocTable::allowed_list()
            ));
        }
    }

    if let Some(datum) = v.datum.as_deref() {
        if !datum.trim().is_empty() && dates::parse_iso(datum).is_none() {
            report
                .errors
                .push("datum must be an ISO-8601 calendar date (YYYY-MM-DD)".to_string());
        }
    }

    let content_len = v.inhalt().chars().count();
    if content_len > 0 && content_len < MIN_CONTENT_CHARS {
        report.warnings.push(format!(
            "inhalt is short ({} chars, minimum {})",
            content_len, MIN_CONTENT_CHARS
        ));
    }

    report
}
