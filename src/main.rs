//! # BVV Harness CLI (`bvv`)
//!
//! The `bvv` binary drives the filing pipeline end to end.
//!
//! ## Usage
//!
//! ```bash
//! bvv --config ./config/bvv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bvv extract <pdf>` | Extract a council PDF into a JSON record |
//! | `bvv ingest <input>` | Sanitize, embed, and upsert JSON records |
//! | `bvv search "<query>"` | Search stored filings |
//!
//! ## Examples
//!
//! ```bash
//! # Extract a PDF, overriding the guessed type
//! bvv extract drucksache_1234.pdf --tabelle antraege --out ./records
//!
//! # Ingest a directory of records without writing to the store
//! bvv ingest ./records --dry-run
//!
//! # Semantic search with a date window
//! bvv search "Radwege Sanierung" --von 2024-01-01 --bis 2024-12-31
//!
//! # Keyword search instead of vectors
//! bvv search "Drucksache 1234" --mode keyword
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bvv_harness::{config, extract, ingest, search};

/// BVV Harness — ingestion and semantic search for district council filings.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "bvv",
    about = "BVV Harness — ingestion and semantic search for district council filings",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bvv.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a council PDF into a JSON record.
    ///
    /// Guesses Drucksache number, document type, title, and date from the
    /// page text. Any guess can be overridden with a flag. Exits 2 when
    /// the PDF has no extractable text, 3 when the record stays invalid.
    Extract {
        /// Path to the PDF file.
        pdf: PathBuf,

        /// Output directory for the JSON record.
        #[arg(long, default_value = "./records")]
        out: PathBuf,

        /// Override the guessed title.
        #[arg(long)]
        titel: Option<String>,

        /// Override the guessed date (YYYY-MM-DD).
        #[arg(long)]
        datum: Option<String>,

        /// Override the guessed Drucksache number.
        #[arg(long)]
        drucksache: Option<String>,

        /// Override the guessed destination table
        /// (antraege, anfragen_klein, anfragen_gross, anfragen_muendlich).
        #[arg(long)]
        tabelle: Option<String>,

        /// Processing status (defaults to "eingereicht").
        #[arg(long)]
        status: Option<String>,

        /// Submitting Fraktion.
        #[arg(long)]
        fraktion: Option<String>,

        /// Public URL of the source PDF.
        #[arg(long)]
        pdf_url: Option<String>,
    },

    /// Sanitize, validate, embed, and upsert JSON records.
    ///
    /// Accepts a single file, a directory (its `*.json` files), or a glob
    /// pattern. Files that fail a stage are skipped with a reason; the
    /// batch always runs to completion and exits 0.
    Ingest {
        /// Record file, directory, or glob pattern.
        input: String,

        /// Run every stage through embedding but write nothing to the store.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of files to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search stored filings.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `semantic` (vector RPC) or `keyword` (view select).
        #[arg(long, default_value = "semantic")]
        mode: String,

        /// Filter by document type (antrag, anfrage_klein, anfrage_gross,
        /// anfrage_muendlich).
        #[arg(long)]
        typ: Option<String>,

        /// Only documents dated on or after this date (YYYY-MM-DD).
        #[arg(long)]
        von: Option<String>,

        /// Only documents dated on or before this date (YYYY-MM-DD).
        #[arg(long)]
        bis: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<i64>,

        /// Include unpublished documents in the results.
        #[arg(long)]
        include_unpublished: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing required argument exits 1; other usage errors keep
    // clap's default handling.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.kind() == clap::error::ErrorKind::MissingRequiredArgument {
                let _ = err.print();
                std::process::exit(1);
            }
            err.exit()
        }
    };
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Extract {
            pdf,
            out,
            titel,
            datum,
            drucksache,
            tabelle,
            status,
            fraktion,
            pdf_url,
        } => {
            let overrides = extract::FieldOverrides {
                titel,
                datum,
                drucksache,
                tabelle,
                status,
                fraktion,
                pdf_url,
            };
            let code = extract::run_extract(&cfg, &pdf, &out, &overrides)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Ingest {
            input,
            dry_run,
            limit,
        } => {
            ingest::run_ingest(&cfg, &input, dry_run, limit).await?;
        }
        Commands::Search {
            query,
            mode,
            typ,
            von,
            bis,
            limit,
            include_unpublished,
        } => {
            search::run_search(&cfg, &query, &mode, typ, von, bis, limit, include_unpublished)
                .await?;
        }
    }

    Ok(())
}
