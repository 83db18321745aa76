//! PDF to committee-record extraction.
//!
//! Reads a council PDF, pulls its plain text, and guesses the structured
//! fields (Drucksache number, document type, title, date) from that text.
//! Every guess can be overridden on the command line. The result is a JSON
//! record ready for `bvv ingest`.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::Config;
use crate::dates;
use crate::models::{DocTable, Vorgang, STATUS_VALUES};
use crate::sanitize;
use crate::validate;

/// Exit code when the PDF yields no usable text.
pub const EXIT_NO_TEXT: i32 = 2;
/// Exit code when the assembled record fails validation.
pub const EXIT_INVALID: i32 = 3;

/// Field values supplied on the command line. Any set field wins over the
/// corresponding guess from the PDF text.
#[derive(Debug, Default)]
pub struct FieldOverrides {
    pub titel: Option<String>,
    pub datum: Option<String>,
    pub drucksache: Option<String>,
    pub tabelle: Option<String>,
    pub status: Option<String>,
    pub fraktion: Option<String>,
    pub pdf_url: Option<String>,
}

/// Extract a record from `pdf_path` and write it as JSON into `out_dir`.
/// Returns the process exit code: 0 on success, [`EXIT_NO_TEXT`] or
/// [`EXIT_INVALID`] on failure.
pub fn run_extract(
    _cfg: &Config,
    pdf_path: &Path,
    out_dir: &Path,
    overrides: &FieldOverrides,
) -> Result<i32> {
    let bytes = std::fs::read(pdf_path)
        .with_context(|| format!("failed to read {}", pdf_path.display()))?;

    let raw = match pdf_extract::extract_text_from_mem(&bytes) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: text extraction failed for {}: {}", pdf_path.display(), e);
            return Ok(EXIT_NO_TEXT);
        }
    };
    let text = sanitize::clean_text_extended(&raw);
    if text.is_empty() {
        eprintln!(
            "error: {} contains no extractable text (scanned image?)",
            pdf_path.display()
        );
        return Ok(EXIT_NO_TEXT);
    }

    let drucksache = overrides
        .drucksache
        .clone()
        .or_else(|| guess_drucksache(&text));
    let tabelle = overrides
        .tabelle
        .clone()
        .or_else(|| guess_table(&text).map(|t| t.as_str().to_string()));
    let titel = overrides.titel.clone().or_else(|| guess_title(&text));
    let datum = overrides
        .datum
        .clone()
        .or_else(|| dates::to_iso_date(&text))
        .or_else(|| file_mtime_date(pdf_path));

    let record = Vorgang {
        tabelle,
        titel,
        datum,
        drucksache,
        inhalt: Some(strip_content(&text)),
        // New filings start in the first workflow state.
        status: overrides
            .status
            .clone()
            .or_else(|| Some(STATUS_VALUES[0].to_string())),
        fraktion: overrides.fraktion.clone(),
        pdf_url: overrides.pdf_url.clone(),
        ..Vorgang::default()
    };

    let report = validate::validate(&record);
    for w in &report.warnings {
        eprintln!("warning: {}", w);
    }
    if !report.errors.is_empty() {
        for e in &report.errors {
            eprintln!("error: {}", e);
        }
        eprintln!("record is incomplete; supply the missing fields via flags");
        return Ok(EXIT_INVALID);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let out_path = out_dir.join(output_file_name(&record, pdf_path));
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&out_path, json)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    println!("Extracted {} -> {}", pdf_path.display(), out_path.display());
    println!(
        "  drucksache: {}  typ: {}  datum: {}",
        record.drucksache.as_deref().unwrap_or("-"),
        record.tabelle.as_deref().unwrap_or("-"),
        record.datum.as_deref().unwrap_or("-")
    );
    Ok(0)
}

/// Find a Drucksache number like `1234/XX` in free text. Whitespace around
/// the slash is tolerated on the page and removed from the result.
pub fn guess_drucksache(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d{3,4}\s*/\s*[XVI]{2,4}").unwrap());
    re.find(text)
        .map(|m| m.as_str().chars().filter(|c| !c.is_whitespace()).collect())
}

/// Classify the document from its heading phrases. More specific phrases
/// win: a große Anfrage also contains the word "Anfrage", and every document
/// type may mention "Antrag" somewhere in its body.
pub fn guess_table(text: &str) -> Option<DocTable> {
    let lower = text.to_lowercase();
    if lower.contains("mündliche anfrage") {
        Some(DocTable::AnfragenMuendlich)
    } else if lower.contains("große anfrage") {
        Some(DocTable::AnfragenGross)
    } else if lower.contains("kleine anfrage") {
        Some(DocTable::AnfragenKlein)
    } else if lower.contains("antrag") {
        Some(DocTable::Antraege)
    } else {
        None
    }
}

/// Pick a title line: the first early line that is long enough and is not
/// letterhead, a heading keyword, or the Drucksache line itself.
pub fn guess_title(text: &str) -> Option<String> {
    const SKIP_PREFIXES: [&str; 5] = [
        "drucksache",
        "bezirksverordnetenversammlung",
        "bvv ",
        "begründung",
        "fragen:",
    ];
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(50)
        .find(|l| {
            l.chars().count() > 8 && {
                let lower = l.to_lowercase();
                !SKIP_PREFIXES.iter().any(|p| lower.starts_with(p))
            }
        })
        .map(str::to_string)
}

/// Reduce the page text to the record body: drop Drucksache header lines
/// and everything from an attachments section onward.
pub fn strip_content(text: &str) -> String {
    static ANLAGE: OnceLock<Regex> = OnceLock::new();
    let anlage = ANLAGE.get_or_init(|| Regex::new(r"(?i)\n\s*anlagen?:").unwrap());

    let body = match anlage.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };
    let kept: Vec<&str> = body
        .lines()
        .filter(|l| !l.trim().to_lowercase().starts_with("drucksache"))
        .collect();
    sanitize::clean_text(&kept.join("\n"))
}

fn file_mtime_date(path: &Path) -> Option<String> {
    let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
    let dt: chrono::DateTime<chrono::Local> = mtime.into();
    Some(dt.format("%Y-%m-%d").to_string())
}

fn output_file_name(record: &Vorgang, pdf_path: &Path) -> String {
    match &record.drucksache {
        Some(d) => {
            let safe: String = d
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { '_' })
                .collect();
            format!("{}.json", safe)
        }
        None => {
            let stem = pdf_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("vorgang");
            format!("{}.json", stem)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_drucksache_with_spacing() {
        assert_eq!(
            guess_drucksache("Drucksache Nr. 1234 / XXI vom 5.3.2024"),
            Some("1234/XXI".to_string())
        );
        assert_eq!(guess_drucksache("kein Aktenzeichen hier"), None);
    }

    #[test]
    fn table_guess_prefers_specific_phrases() {
        assert_eq!(
            guess_table("Große Anfrage der Fraktion, hilfsweise Antrag"),
            Some(DocTable::AnfragenGross)
        );
        assert_eq!(
            guess_table("Mündliche Anfrage zur Einwohnerfragestunde"),
            Some(DocTable::AnfragenMuendlich)
        );
        assert_eq!(
            guess_table("Kleine Anfrage gem. § 51 BezVG"),
            Some(DocTable::AnfragenKlein)
        );
        assert_eq!(guess_table("Antrag der Fraktion"), Some(DocTable::Antraege));
        assert_eq!(guess_table("Protokollnotiz"), None);
    }

    #[test]
    fn title_skips_letterhead_and_short_lines() {
        let text = "Bezirksverordnetenversammlung Pankow\n\
                    Drucksache 0123/XXI\n\
                    BVV 2024\n\
                    Nr. 7\n\
                    Radwege auf der Berliner Allee sanieren\n\
                    Begründung folgt";
        assert_eq!(
            guess_title(text),
            Some("Radwege auf der Berliner Allee sanieren".to_string())
        );
    }

    #[test]
    fn title_none_when_everything_filtered() {
        assert_eq!(guess_title("kurz\nBVV 2024\n"), None);
    }

    #[test]
    fn strip_content_drops_header_and_attachments() {
        let text = "Drucksache 0123/XXI\n\
                    Der Antragstext.\n\
                    Mehr Text.\n\
                    Anlagen:\n\
                    1. Lageplan";
        let got = strip_content(text);
        assert_eq!(got, "Der Antragstext.\nMehr Text.");
    }
}
