//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when embeddings are not configured.
//! - **[`OpenAIProvider`]** — calls the OpenAI embeddings API with retry and backoff.
//! - **[`OllamaProvider`]** — calls a local Ollama instance's `/api/embed` endpoint.
//!
//! # Retry Strategy
//!
//! Transient errors retry with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
///
/// The actual embedding computation is performed by [`embed_texts`]
/// (kept as a free function due to async trait limitations).
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
}

/// Embed a batch of texts using the configured provider.
///
/// Returns one vector per input text, in input order. Every returned
/// vector is checked against the configured dimensionality; a provider
/// responding with the wrong width is an error, not silently accepted.
///
/// # Errors
///
/// - `"disabled"` provider: always returns an error.
/// - `"openai"` provider: missing API key, non-retryable API error, or
///   exhausted retries.
pub async fn embed_texts(
    _provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let vectors = match config.provider.as_str() {
        "openai" => embed_openai(config, texts).await?,
        "ollama" => embed_ollama(config, texts).await?,
        "disabled" => bail!("Embedding provider is disabled"),
        other => bail!("Unknown embedding provider: {}", other),
    };

    if vectors.len() != texts.len() {
        bail!(
            "Embedding response count mismatch: sent {}, got {}",
            texts.len(),
            vectors.len()
        );
    }
    for vec in &vectors {
        if config.dims != 0 && vec.len() != config.dims {
            bail!(
                "Embedding dimensionality mismatch: expected {}, got {}",
                config.dims,
                vec.len()
            );
        }
    }

    Ok(vectors)
}

/// Embed a single text. Convenience wrapper around [`embed_texts`] used by
/// the ingest pipeline (one document per call) and semantic search.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let results = embed_texts(provider, config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls the `POST /v1/embeddings` endpoint with the configured model.
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model: config.model_name().to_string(),
            dims: config.dims,
        })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_openai(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model_name(),
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_openai_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "OpenAI API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). Requires an embedding model pulled locally.
pub struct OllamaProvider {
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;

        Ok(Self {
            model,
            dims: config.dims,
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_ollama(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required"))?;

    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/embed", url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_ollama_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Ollama API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("Ollama API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    url,
                    e
                ));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama embedding failed after retries")))
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Build the canonical string that gets embedded for one filing.
pub fn embedding_input(titel: &str, inhalt: &str) -> String {
    format!("Titel: {}\n\n{}", titel, inhalt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_input_shape() {
        let input = embedding_input("Radwege ausbauen", "Die BVV möge beschließen…");
        assert!(input.starts_with("Titel: Radwege ausbauen\n\n"));
        assert!(input.ends_with("Die BVV möge beschließen…"));
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.1, 0.2, 0.3] },
                { "embedding": [0.4, 0.5, 0.6] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[0].len(), 3);
        assert!((vecs[1][0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        let json = serde_json::json!({ "error": "nope" });
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "embeddings": [[1.0, 2.0]] });
        let vecs = parse_ollama_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0f32, 2.0]]);
    }

    #[test]
    fn test_disabled_provider() {
        let provider = DisabledProvider;
        assert_eq!(provider.model_name(), "disabled");
        assert_eq!(provider.dims(), 0);
    }

    #[tokio::test]
    async fn test_disabled_embed_fails() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..EmbeddingConfig::default()
        };
        let provider = DisabledProvider;
        let result = embed_query(&provider, &config, "text").await;
        assert!(result.is_err());
    }
}
