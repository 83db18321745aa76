use anyhow::{bail, Result};

use crate::config::Config;
use crate::dates;
use crate::embedding;
use crate::models::{DocTable, MatchRow};
use crate::store::{KeyRole, MatchParams, Store, ViewFilter};

/// Characters of content shown per result.
const EXCERPT_CHARS: usize = 240;

#[allow(clippy::too_many_arguments)]
pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    typ: Option<String>,
    von: Option<String>,
    bis: Option<String>,
    limit: Option<i64>,
    include_unpublished: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    match mode {
        "semantic" | "keyword" => {}
        _ => bail!("Unknown search mode: {}. Use semantic or keyword.", mode),
    }

    if mode == "semantic" && !config.embedding.is_enabled() {
        bail!("Mode 'semantic' requires embeddings. Set [embedding] provider in config.");
    }

    for date in [&von, &bis].into_iter().flatten() {
        if dates::parse_iso(date).is_none() {
            bail!("Invalid date filter (expected YYYY-MM-DD): {}", date);
        }
    }

    if let Some(t) = &typ {
        if !DocTable::ALL.iter().any(|d| d.type_label() == t) {
            bail!(
                "Unknown document type: {}. Use one of: {}",
                t,
                DocTable::ALL
                    .iter()
                    .map(|d| d.type_label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    let store = Store::new(&config.store, KeyRole::Anon)?;
    let final_limit = limit.unwrap_or(config.search.match_count);

    let results = match mode {
        "semantic" => {
            let provider = embedding::create_provider(&config.embedding)?;
            let query_vec =
                embedding::embed_query(provider.as_ref(), &config.embedding, query).await?;
            let params = MatchParams {
                query_embedding: query_vec,
                match_threshold: config.search.match_threshold,
                match_count: final_limit,
                typ_filter: typ,
                von,
                bis,
                published_only: !include_unpublished,
            };
            store
                .match_documents(&config.store.match_rpc, &params)
                .await?
        }
        _ => {
            let filter = ViewFilter {
                query: Some(query.to_string()),
                typ,
                von,
                bis,
                limit: final_limit,
            };
            store
                .select_documents(&config.store.documents_view, &filter)
                .await?
        }
    };

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, row) in results.iter().enumerate() {
        print_result(i + 1, row);
    }
    Ok(())
}

fn print_result(rank: usize, row: &MatchRow) {
    let titel = row.titel.as_deref().unwrap_or("(ohne Titel)");
    match row.similarity {
        Some(sim) => println!("{}. [{:.2}] {}", rank, sim, titel),
        None => println!("{}. {}", rank, titel),
    }
    if let Some(typ) = &row.typ {
        println!("    typ: {}", typ);
    }
    if let Some(datum) = &row.datum {
        println!("    datum: {}", datum);
    }
    if let Some(drucksache) = &row.drucksache {
        println!("    drucksache: {}", drucksache);
    }
    if let Some(fraktion) = &row.fraktion {
        println!("    fraktion: {}", fraktion);
    }
    if let Some(status) = &row.status {
        println!("    status: {}", status);
    }
    if let Some(inhalt) = &row.inhalt {
        println!("    excerpt: \"{}\"", excerpt(inhalt));
    }
    if let Some(url) = &row.pdf_url {
        println!("    url: {}", url);
    }
    println!("    id: {}", row.id);
    println!();
}

/// One-line excerpt, truncated at a char boundary.
fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat.to_string();
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("kurz\nund gut"), "kurz und gut");

        let long = "x".repeat(500);
        let e = excerpt(&long);
        assert!(e.ends_with("..."));
        assert_eq!(e.chars().count(), EXCERPT_CHARS + 3);
    }
}
