//! Client for the hosted table/RPC store.
//!
//! The store is a PostgREST-style service: table-scoped selects with
//! filter/order/range, upserts keyed by a conflict column, and a named
//! remote procedure for vector similarity search. This module only speaks
//! the wire protocol — ranking and similarity happen inside the store.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::models::{DocTable, MatchRow};

/// Which credential the client authenticates with. Ingestion writes need
/// the service key; search runs read-only and prefers the anon key.
#[derive(Debug, Clone, Copy)]
pub enum KeyRole {
    Service,
    Anon,
}

pub struct Store {
    client: reqwest::Client,
    base: String,
    key: String,
}

impl Store {
    pub fn new(config: &StoreConfig, role: KeyRole) -> Result<Store> {
        let base = config
            .url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok())
            .context("store.url not configured and SUPABASE_URL not set")?;
        let base = base.trim_end_matches('/').to_string();

        let key = match role {
            KeyRole::Service => std::env::var(&config.service_key_env)
                .with_context(|| format!("{} not set", config.service_key_env))?,
            // Read paths fall back to the service key so a single-key
            // setup still works.
            KeyRole::Anon => std::env::var(&config.anon_key_env)
                .or_else(|_| std::env::var(&config.service_key_env))
                .with_context(|| {
                    format!(
                        "neither {} nor {} is set",
                        config.anon_key_env, config.service_key_env
                    )
                })?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Store { client, base, key })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    /// Look up an existing identity by natural key (`drucksache`) within a
    /// destination table. Returns at most one id.
    pub async fn find_id_by_drucksache(
        &self,
        table: DocTable,
        drucksache: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/rest/v1/{}", self.base, table.as_str());
        let resp = self
            .auth(self.client.get(&url))
            .query(&[
                ("select", "id".to_string()),
                ("drucksache", format!("eq.{}", drucksache)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("store select on {} failed {}: {}", table, status, body);
        }

        let rows: Vec<serde_json::Value> = resp.json().await?;
        Ok(rows
            .first()
            .and_then(|r| r.get("id"))
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    /// Upsert one row into `table`, replacing on `id` conflict.
    pub async fn upsert(&self, table: &str, row: &serde_json::Value) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base, table);
        let resp = self
            .auth(self.client.post(&url))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&serde_json::json!([row]))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("store upsert into {} failed {}: {}", table, status, body);
        }
        Ok(())
    }

    /// Call the similarity-search procedure. The store computes similarity
    /// and returns rows already ranked and score-augmented.
    pub async fn match_documents(&self, rpc: &str, params: &MatchParams) -> Result<Vec<MatchRow>> {
        let url = format!("{}/rest/v1/rpc/{}", self.base, rpc);
        let resp = self.auth(self.client.post(&url)).json(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("store rpc {} failed {}: {}", rpc, status, body);
        }

        Ok(resp.json().await?)
    }

    /// Filtered, ordered select against the unified documents view, used
    /// by keyword search.
    pub async fn select_documents(&self, view: &str, filter: &ViewFilter) -> Result<Vec<MatchRow>> {
        let url = format!("{}/rest/v1/{}", self.base, view);
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];

        if let Some(q) = &filter.query {
            let like = format!("*{}*", escape_filter_value(q));
            query.push((
                "or".to_string(),
                format!(
                    "(titel.ilike.{like},inhalt.ilike.{like},drucksache.ilike.{like},fraktion.ilike.{like})",
                    like = like
                ),
            ));
        }
        if let Some(typ) = &filter.typ {
            query.push(("typ".to_string(), format!("eq.{}", typ)));
        }
        if let Some(von) = &filter.von {
            query.push(("datum".to_string(), format!("gte.{}", von)));
        }
        if let Some(bis) = &filter.bis {
            query.push(("datum".to_string(), format!("lte.{}", bis)));
        }
        query.push(("order".to_string(), "datum.desc".to_string()));
        query.push(("limit".to_string(), filter.limit.to_string()));

        let resp = self
            .auth(self.client.get(&url))
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("store select on {} failed {}: {}", view, status, body);
        }

        Ok(resp.json().await?)
    }
}

/// Parameters for the similarity-search procedure. Field names match the
/// procedure's argument names.
#[derive(Debug, Serialize)]
pub struct MatchParams {
    pub query_embedding: Vec<f32>,
    pub match_threshold: f64,
    pub match_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub von: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bis: Option<String>,
    pub published_only: bool,
}

/// Filters for the keyword/list path over the documents view.
#[derive(Debug, Default)]
pub struct ViewFilter {
    pub query: Option<String>,
    pub typ: Option<String>,
    pub von: Option<String>,
    pub bis: Option<String>,
    pub limit: i64,
}

/// Strip characters that would break out of a PostgREST `or=(...)` filter
/// expression. Searching for them literally is not supported.
fn escape_filter_value(q: &str) -> String {
    q.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '.'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("radwege"), "radwege");
        assert_eq!(escape_filter_value("a,b(c)d.e"), "abcde");
    }

    #[test]
    fn test_match_params_serialization() {
        let params = MatchParams {
            query_embedding: vec![0.1, 0.2],
            match_threshold: 0.4,
            match_count: 10,
            typ_filter: None,
            von: Some("2024-01-01".to_string()),
            bis: None,
            published_only: false,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["match_count"], 10);
        assert_eq!(json["von"], "2024-01-01");
        // Absent filters must not appear at all, so the procedure's
        // defaults apply.
        assert!(json.get("typ_filter").is_none());
        assert!(json.get("bis").is_none());
    }
}
