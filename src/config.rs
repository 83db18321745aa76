use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the hosted store. Falls back to the `SUPABASE_URL`
    /// environment variable when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the write-capable key.
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,
    /// Environment variable holding the read-only key used for search.
    #[serde(default = "default_anon_key_env")]
    pub anon_key_env: String,
    /// Mirror table holding `(id, embedding)` rows.
    #[serde(default = "default_embeddings_table")]
    pub embeddings_table: String,
    /// Unified read view across the four source tables.
    #[serde(default = "default_documents_view")]
    pub documents_view: String,
    /// Remote procedure performing vector similarity search.
    #[serde(default = "default_match_rpc")]
    pub match_rpc: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            url: None,
            service_key_env: default_service_key_env(),
            anon_key_env: default_anon_key_env(),
            embeddings_table: default_embeddings_table(),
            documents_view: default_documents_view(),
            match_rpc: default_match_rpc(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_service_key_env() -> String {
    "SUPABASE_SERVICE_ROLE".to_string()
}
fn default_anon_key_env() -> String {
    "SUPABASE_ANON_KEY".to_string()
}
fn default_embeddings_table() -> String {
    "vorgang_embeddings".to_string()
}
fn default_documents_view() -> String {
    "bvv_dokumente".to_string()
}
fn default_match_rpc() -> String {
    "match_bvv_dokumente".to_string()
}
fn default_store_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai`, `ollama`, or `disabled`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or("text-embedding-3-small")
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Append-only journal file; empty string disables it.
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            journal_path: default_journal_path(),
        }
    }
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("log/embedding_log.txt")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_match_count")]
    pub match_count: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            match_threshold: default_match_threshold(),
            match_count: default_match_count(),
        }
    }
}

fn default_match_threshold() -> f64 {
    0.4
}
fn default_match_count() -> i64 {
    10
}

/// Load configuration from a TOML file. A missing file yields the
/// defaults, so the tool runs with nothing but environment variables set.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    if !(0.0..=1.0).contains(&config.search.match_threshold) {
        anyhow::bail!("search.match_threshold must be in [0.0, 1.0]");
    }

    if config.search.match_count < 1 {
        anyhow::bail!("search.match_count must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config(Path::new("/nonexistent/bvv.toml")).unwrap();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.store.match_rpc, "match_bvv_dokumente");
    }

    #[test]
    fn test_parse_and_validate() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bvv.toml");
        std::fs::write(
            &path,
            r#"
[store]
url = "https://example.supabase.co"

[embedding]
provider = "disabled"

[search]
match_threshold = 0.3
match_count = 5
"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.search.match_count, 5);
        assert_eq!(config.store.url.as_deref(), Some("https://example.supabase.co"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bvv.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"local\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bvv.toml");
        std::fs::write(&path, "[search]\nmatch_threshold = 1.5\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
