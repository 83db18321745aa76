//! Core data types for BVV filings.
//!
//! A [`Vorgang`] is one normalized filing awaiting storage. Field names on
//! the wire are German because they mirror the store's column names and the
//! JSON interchange files produced by the extractor.

use serde::{Deserialize, Serialize};

/// The four allowed destination tables. Each filing belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTable {
    /// Applications ("Anträge").
    Antraege,
    /// Minor written questions ("Kleine Anfragen").
    AnfragenKlein,
    /// Major written questions ("Große Anfragen").
    AnfragenGross,
    /// Oral questions ("Mündliche Anfragen").
    AnfragenMuendlich,
}

impl DocTable {
    pub const ALL: [DocTable; 4] = [
        DocTable::Antraege,
        DocTable::AnfragenKlein,
        DocTable::AnfragenGross,
        DocTable::AnfragenMuendlich,
    ];

    /// Store table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocTable::Antraege => "antraege",
            DocTable::AnfragenKlein => "anfragen_klein",
            DocTable::AnfragenGross => "anfragen_gross",
            DocTable::AnfragenMuendlich => "anfragen_muendlich",
        }
    }

    /// Per-document type label as used by the unified view's `typ` column.
    pub fn type_label(&self) -> &'static str {
        match self {
            DocTable::Antraege => "antrag",
            DocTable::AnfragenKlein => "anfrage_klein",
            DocTable::AnfragenGross => "anfrage_gross",
            DocTable::AnfragenMuendlich => "anfrage_muendlich",
        }
    }

    pub fn parse(s: &str) -> Option<DocTable> {
        match s {
            "antraege" => Some(DocTable::Antraege),
            "anfragen_klein" => Some(DocTable::AnfragenKlein),
            "anfragen_gross" => Some(DocTable::AnfragenGross),
            "anfragen_muendlich" => Some(DocTable::AnfragenMuendlich),
            _ => None,
        }
    }

    /// Comma-joined list for error messages and CLI help.
    pub fn allowed_list() -> String {
        DocTable::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for DocTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow states a filing can carry. The validator only requires the
/// field to be non-empty; this list feeds defaults and CLI help.
pub const STATUS_VALUES: [&str; 7] = [
    "eingereicht",
    "beantwortet",
    "abgelehnt",
    "in Bearbeitung",
    "zurückgezogen",
    "überwiesen",
    "sonstiges",
];

fn default_published() -> bool {
    true
}

/// One normalized filing as read from a JSON input file (flat shape) or the
/// `vorgang` sub-object of the nested shape. All fields are optional at
/// parse time; [`crate::validate::validate`] decides admissibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vorgang {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub tabelle: Option<String>,
    #[serde(default)]
    pub titel: Option<String>,
    #[serde(default)]
    pub datum: Option<String>,
    #[serde(default)]
    pub thema: Option<String>,
    #[serde(default)]
    pub drucksache: Option<String>,
    #[serde(default)]
    pub inhalt: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fraktion: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub kategorie: Option<String>,
}

impl Default for Vorgang {
    fn default() -> Self {
        Vorgang {
            id: None,
            tabelle: None,
            titel: None,
            datum: None,
            thema: None,
            drucksache: None,
            inhalt: None,
            published: true,
            status: None,
            fraktion: None,
            pdf_url: None,
            kategorie: None,
        }
    }
}

impl Vorgang {
    pub fn titel(&self) -> &str {
        self.titel.as_deref().unwrap_or("")
    }

    pub fn inhalt(&self) -> &str {
        self.inhalt.as_deref().unwrap_or("")
    }

    /// Destination table, resolving the `tabelle` field against the
    /// allowed set. `None` when absent or not one of the four tables.
    pub fn table(&self) -> Option<DocTable> {
        self.tabelle.as_deref().and_then(DocTable::parse)
    }
}

/// A row returned by the store's similarity RPC or the unified
/// `bvv_dokumente` view.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRow {
    pub id: String,
    #[serde(default)]
    pub titel: Option<String>,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub datum: Option<String>,
    #[serde(default)]
    pub fraktion: Option<String>,
    #[serde(default)]
    pub drucksache: Option<String>,
    #[serde(default)]
    pub inhalt: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    /// Only present on RPC results.
    #[serde(default)]
    pub similarity: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_roundtrip() {
        for t in DocTable::ALL {
            assert_eq!(DocTable::parse(t.as_str()), Some(t));
        }
        assert_eq!(DocTable::parse("unknown_table"), None);
        assert_eq!(DocTable::parse(""), None);
    }

    #[test]
    fn test_published_defaults_true() {
        let v: Vorgang = serde_json::from_str(r#"{"titel":"x"}"#).unwrap();
        assert!(v.published);
        assert_eq!(v.titel(), "x");
        assert_eq!(v.inhalt(), "");
    }

    #[test]
    fn test_flat_record_parses() {
        let v: Vorgang = serde_json::from_str(
            r#"{"tabelle":"antraege","titel":"Radwege ausbauen","datum":"2024-03-05",
                "drucksache":"1234/XXI","inhalt":"Text","published":true,
                "status":"eingereicht","fraktion":"Fraktion A"}"#,
        )
        .unwrap();
        assert_eq!(v.table(), Some(DocTable::Antraege));
        assert_eq!(v.drucksache.as_deref(), Some("1234/XXI"));
    }
}
