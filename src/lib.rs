//! # BVV Harness
//!
//! An ingestion and retrieval pipeline for Bezirksverordnetenversammlung
//! (district council) filings: Anträge and the three Anfrage variants.
//! PDFs are extracted into structured JSON records, records are sanitized,
//! validated, embedded, and upserted into a hosted PostgREST-style store,
//! and the stored corpus is searchable semantically (vector RPC) or by
//! keyword (view select).
//!
//! ## Pipeline
//!
//! | Stage | Module | Responsibility |
//! |-------|--------|----------------|
//! | Extract | [`extract`] | PDF text + field guessing -> JSON record |
//! | Parse | [`ingest`] | JSON decode with control-character repair |
//! | Sanitize | [`sanitize`] | Whitespace, control chars, typographic quotes |
//! | Validate | [`validate`] | Required fields, table and date checks |
//! | Embed | [`embedding`] | OpenAI / Ollama vectors with retry |
//! | Store | [`store`] | Table upserts and the similarity RPC |
//! | Search | [`search`] | Semantic and keyword retrieval |
//!
//! Supporting modules: [`models`] (record and table types), [`dates`]
//! (German-format date normalization), [`config`] (TOML configuration),
//! [`journal`] (append-only run log).

pub mod config;
pub mod dates;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod journal;
pub mod models;
pub mod sanitize;
pub mod search;
pub mod store;
pub mod validate;
