//! Batch ingestion pipeline: JSON records in, embedded store rows out.
//!
//! Each input file walks a fixed sequence of stages: read, parse (with one
//! repair attempt for broken control characters), field check, sanitize,
//! hash, embed, then table and identity resolution, and finally the two
//! upserts (destination table + embeddings mirror). A failure at any stage
//! skips that file with a reason; it never aborts the batch. The run exits
//! zero even when every file was skipped — the summary line and journal
//! carry the outcome.

use anyhow::{bail, Context, Result};
use globset::Glob;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::embedding;
use crate::journal::{Journal, Tag};
use crate::models::{DocTable, Vorgang};
use crate::sanitize;
use crate::store::{KeyRole, Store};
use crate::validate;

/// Why a file was dropped from the batch. One variant per pipeline stage
/// that can fail.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("unreadable: {0}")]
    Unreadable(String),
    #[error("malformed JSON: {0}")]
    Malformed(String),
    #[error("missing required fields: {0}")]
    MissingFields(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("store write failed: {0}")]
    Store(String),
}

/// Hex SHA-256 over title and content, concatenated without a separator.
/// Used as a change indicator for re-embedding decisions downstream.
pub fn content_hash(titel: &str, inhalt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(titel.as_bytes());
    hasher.update(inhalt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve an input argument to a sorted list of JSON files: a single
/// file, a directory (its `*.json` entries), or a glob pattern.
pub fn collect_inputs(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
            })
            .collect();
        files.sort();
        return Ok(files);
    }
    if input.contains('*') || input.contains('?') || input.contains('[') {
        let matcher = Glob::new(input)
            .with_context(|| format!("invalid glob pattern: {}", input))?
            .compile_matcher();
        let root = glob_root(input);
        let mut files: Vec<PathBuf> = std::fs::read_dir(&root)
            .with_context(|| format!("failed to read directory {}", root.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && matcher.is_match(p))
            .collect();
        files.sort();
        return Ok(files);
    }
    bail!("input not found: {}", input)
}

/// Directory portion of a glob pattern, up to the first wildcard segment.
fn glob_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for part in Path::new(pattern).iter() {
        let s = part.to_string_lossy();
        if s.contains('*') || s.contains('?') || s.contains('[') {
            break;
        }
        root.push(part);
    }
    if root.as_os_str().is_empty() {
        root.push(".");
    }
    root
}

#[derive(Debug, Default)]
struct Counters {
    updated: usize,
    skipped: usize,
}

/// Run the batch over `input`. `dry_run` performs everything up to and
/// including embedding but writes nothing to the store.
pub async fn run_ingest(
    cfg: &Config,
    input: &str,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut files = collect_inputs(input)?;
    if let Some(n) = limit {
        files.truncate(n);
    }
    if files.is_empty() {
        println!("No input files matched {}", input);
        return Ok(());
    }

    let journal = if cfg.ingest.journal_path.as_os_str().is_empty() {
        Journal::disabled()
    } else {
        Journal::new(Some(&cfg.ingest.journal_path))
    };
    let store = if dry_run {
        None
    } else {
        Some(Store::new(&cfg.store, KeyRole::Service)?)
    };

    journal.log(
        Tag::Info,
        &format!("starting batch: {} file(s) from {}", files.len(), input),
    );

    let mut counters = Counters::default();
    for file in &files {
        match process_file(cfg, store.as_ref(), &journal, file, dry_run).await {
            Ok(id) => {
                counters.updated += 1;
                let verb = if dry_run { "would update" } else { "updated" };
                println!("{} {} ({})", verb, file.display(), id);
                journal.log(Tag::Ok, &format!("{} {} ({})", verb, file.display(), id));
            }
            Err(reason) => {
                counters.skipped += 1;
                println!("skip {}: {}", file.display(), reason);
                journal.log(Tag::Skip, &format!("{}: {}", file.display(), reason));
            }
        }
    }

    let summary = format!("{} updated, {} skipped", counters.updated, counters.skipped);
    println!("{}", summary);
    journal.log(Tag::Info, &format!("batch done: {}", summary));
    Ok(())
}

async fn process_file(
    cfg: &Config,
    store: Option<&Store>,
    journal: &Journal,
    file: &Path,
    dry_run: bool,
) -> std::result::Result<String, SkipReason> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw).to_string();

    let value = parse_with_repair(&raw, journal, file)?;
    let mut record = extract_record(value)?;

    let titel = record
        .titel
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SkipReason::MissingFields("titel".to_string()))?
        .to_string();
    let inhalt = record
        .inhalt
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SkipReason::MissingFields("inhalt".to_string()))?
        .to_string();

    let clean_titel = sanitize::clean_text_extended(&titel);
    let clean_inhalt = sanitize::clean_text_extended(&inhalt);
    if clean_inhalt != inhalt {
        journal.log(
            Tag::Adjusted,
            &format!(
                "{}: inhalt sanitized ({} -> {} chars)",
                file.display(),
                inhalt.chars().count(),
                clean_inhalt.chars().count()
            ),
        );
    }
    record.titel = Some(clean_titel.clone());
    record.inhalt = Some(clean_inhalt.clone());

    let report = validate::validate(&record);
    if !report.is_clean() {
        return Err(SkipReason::Validation(report.all().join("; ")));
    }

    let hash = content_hash(&clean_titel, &clean_inhalt);

    let provider = embedding::create_provider(&cfg.embedding)
        .map_err(|e| SkipReason::Embedding(e.to_string()))?;
    let input_text = embedding::embedding_input(&clean_titel, &clean_inhalt);
    let vectors = embedding::embed_texts(provider.as_ref(), &cfg.embedding, &[input_text])
        .await
        .map_err(|e| SkipReason::Embedding(e.to_string()))?;
    let vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| SkipReason::Embedding("provider returned no vector".to_string()))?;

    if dry_run {
        return Ok(record
            .id
            .clone()
            .unwrap_or_else(|| "dry-run".to_string()));
    }

    // Table membership was already checked by the validator.
    let table = record.table().ok_or_else(|| {
        SkipReason::Validation(format!(
            "tabelle '{}' is not one of: {}",
            record.tabelle.as_deref().unwrap_or_default(),
            DocTable::allowed_list()
        ))
    })?;
    let store = store.ok_or_else(|| SkipReason::Store("store not configured".to_string()))?;

    let id = resolve_identity(store, table, &record).await?;

    let row = source_row(&id, &record, &vector, &hash);
    store
        .upsert(table.as_str(), &row)
        .await
        .map_err(|e| SkipReason::Store(e.to_string()))?;

    store
        .upsert(&cfg.store.embeddings_table, &mirror_row(&id, &vector))
        .await
        .map_err(|e| SkipReason::Store(e.to_string()))?;

    Ok(id)
}

/// Row written to the destination table. Optional fields are left out of
/// the payload entirely rather than sent as null.
fn source_row(id: &str, record: &Vorgang, embedding: &[f32], hash: &str) -> serde_json::Value {
    let mut row = serde_json::json!({
        "id": id,
        "titel": record.titel(),
        "inhalt": record.inhalt(),
        "embedding": embedding,
        "content_hash": hash,
        "published": record.published,
    });
    for (key, value) in [
        ("datum", &record.datum),
        ("drucksache", &record.drucksache),
        ("status", &record.status),
        ("fraktion", &record.fraktion),
        ("thema", &record.thema),
        ("kategorie", &record.kategorie),
        ("pdf_url", &record.pdf_url),
    ] {
        if let Some(v) = value {
            row[key] = serde_json::Value::String(v.clone());
        }
    }
    row
}

/// Row written to the embeddings mirror. Its schema holds nothing but the
/// identity and the vector.
fn mirror_row(id: &str, embedding: &[f32]) -> serde_json::Value {
    serde_json::json!({ "id": id, "embedding": embedding })
}

/// Parse the raw bytes as JSON; if that fails, run the control-character
/// repair pass once and try again.
fn parse_with_repair(
    raw: &str,
    journal: &Journal,
    file: &Path,
) -> std::result::Result<serde_json::Value, SkipReason> {
    match serde_json::from_str(raw) {
        Ok(v) => Ok(v),
        Err(first) => {
            let repaired = sanitize::pre_sanitize_json(raw);
            match serde_json::from_str(&repaired) {
                Ok(v) => {
                    journal.log(
                        Tag::Adjusted,
                        &format!("{}: parsed after control-character repair", file.display()),
                    );
                    Ok(v)
                }
                Err(_) => Err(SkipReason::Malformed(first.to_string())),
            }
        }
    }
}

/// Accept both record shapes: a flat object, or an envelope with the
/// record under a `vorgang` key. The destination table may live on the
/// record body, the envelope's `meta` object, or the envelope itself; the
/// body wins, envelope fields only fill the gap.
fn extract_record(value: serde_json::Value) -> std::result::Result<Vorgang, SkipReason> {
    let (inner, envelope) = match value {
        serde_json::Value::Object(map) if map.contains_key("vorgang") => {
            let inner = map.get("vorgang").cloned().unwrap();
            (inner, Some(map))
        }
        other => (other, None),
    };
    let mut record: Vorgang =
        serde_json::from_value(inner).map_err(|e| SkipReason::Malformed(e.to_string()))?;
    if record.tabelle.is_none() {
        if let Some(map) = &envelope {
            record.tabelle = map
                .get("meta")
                .and_then(|m| m.get("tabelle"))
                .and_then(|v| v.as_str())
                .or_else(|| map.get("tabelle").and_then(|v| v.as_str()))
                .map(str::to_string);
        }
    }
    Ok(record)
}

/// Settle on a row id: an explicit id wins, then a natural-key lookup by
/// Drucksache in the destination table, then a fresh UUID. The lookup is
/// what keeps re-ingesting the same filing an update instead of a
/// duplicate row.
async fn resolve_identity(
    store: &Store,
    table: DocTable,
    record: &Vorgang,
) -> std::result::Result<String, SkipReason> {
    let existing = match (&record.id, &record.drucksache) {
        (Some(_), _) | (None, None) => None,
        (None, Some(drucksache)) => store
            .find_id_by_drucksache(table, drucksache)
            .await
            .map_err(|e| SkipReason::Store(e.to_string()))?,
    };
    Ok(pick_id(record.id.clone(), existing))
}

fn pick_id(explicit: Option<String>, existing: Option<String>) -> String {
    explicit
        .or(existing)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_has_no_separator() {
        // "ab" + "c" and "a" + "bc" hash the same; the digest marks content
        // change, not field boundaries.
        assert_eq!(content_hash("ab", "c"), content_hash("a", "bc"));
        assert_ne!(content_hash("ab", "c"), content_hash("ab", "d"));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = content_hash("Titel", "Inhalt");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn extract_record_accepts_both_shapes() {
        let flat = serde_json::json!({"titel": "T", "inhalt": "I"});
        let record = extract_record(flat).unwrap();
        assert_eq!(record.titel.as_deref(), Some("T"));

        let nested = serde_json::json!({
            "meta": {"source": "extractor"},
            "vorgang": {"titel": "N", "inhalt": "I"}
        });
        let record = extract_record(nested).unwrap();
        assert_eq!(record.titel.as_deref(), Some("N"));
    }

    #[test]
    fn extract_record_fills_tabelle_from_envelope() {
        // meta carries the table, the body does not.
        let nested = serde_json::json!({
            "tabelle": "antraege",
            "meta": {"tabelle": "antraege"},
            "vorgang": {"titel": "T", "inhalt": "I"}
        });
        let record = extract_record(nested).unwrap();
        assert_eq!(record.tabelle.as_deref(), Some("antraege"));

        // Envelope top level alone is enough.
        let nested = serde_json::json!({
            "tabelle": "anfragen_klein",
            "vorgang": {"titel": "T", "inhalt": "I"}
        });
        let record = extract_record(nested).unwrap();
        assert_eq!(record.tabelle.as_deref(), Some("anfragen_klein"));

        // The body wins over both envelope locations.
        let nested = serde_json::json!({
            "tabelle": "antraege",
            "meta": {"tabelle": "anfragen_gross"},
            "vorgang": {"tabelle": "anfragen_muendlich", "titel": "T", "inhalt": "I"}
        });
        let record = extract_record(nested).unwrap();
        assert_eq!(record.tabelle.as_deref(), Some("anfragen_muendlich"));
    }

    #[test]
    fn source_row_carries_optional_fields() {
        let record = Vorgang {
            tabelle: Some("antraege".to_string()),
            titel: Some("T".to_string()),
            inhalt: Some("I".to_string()),
            thema: Some("Verkehr".to_string()),
            kategorie: Some("Mobilität".to_string()),
            fraktion: Some("SPD".to_string()),
            ..Vorgang::default()
        };
        let row = source_row("abc", &record, &[0.5, 0.25], "deadbeef");
        assert_eq!(row["thema"], "Verkehr");
        assert_eq!(row["kategorie"], "Mobilität");
        assert_eq!(row["fraktion"], "SPD");
        assert_eq!(row["published"], true);
        // Absent optionals stay out of the payload.
        assert!(row.get("datum").is_none());
        assert!(row.get("pdf_url").is_none());
    }

    #[test]
    fn mirror_row_is_id_and_embedding_only() {
        let row = mirror_row("abc", &[0.5, 0.25]);
        let obj = row.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(row["id"], "abc");
        assert_eq!(row["embedding"], serde_json::json!([0.5, 0.25]));
    }

    #[test]
    fn collect_inputs_sorts_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = collect_inputs(dir.path().to_str().unwrap()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
    }

    #[test]
    fn collect_inputs_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.json"), "{}").unwrap();
        std::fs::write(dir.path().join("y.txt"), "").unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let files = collect_inputs(&pattern).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn pick_id_precedence() {
        let explicit = Some("given".to_string());
        let existing = Some("found".to_string());
        assert_eq!(pick_id(explicit.clone(), existing.clone()), "given");
        assert_eq!(pick_id(None, existing), "found");

        let minted = pick_id(None, None);
        assert!(uuid::Uuid::parse_str(&minted).is_ok());
    }

    #[test]
    fn collect_inputs_missing_path_errors() {
        assert!(collect_inputs("/nonexistent/path.json").is_err());
    }
}
