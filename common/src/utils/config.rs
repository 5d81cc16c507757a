use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime configuration, read from an optional `config` file and the
/// process environment. Environment variables override file values.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    /// Key presented by the dashboard backend on authenticated routes.
    pub admin_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_chat_rate_limit")]
    pub chat_rate_limit_max_requests: u32,
    #[serde(default = "default_chat_rate_limit_window")]
    pub chat_rate_limit_window_minutes: i64,
    #[serde(default = "default_ingest_rate_limit")]
    pub ingest_rate_limit_max_requests: u32,
    #[serde(default = "default_ingest_rate_limit_window")]
    pub ingest_rate_limit_window_minutes: i64,
    #[serde(default = "default_rate_limit_sweep_interval_secs")]
    pub rate_limit_sweep_interval_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimensions() -> u32 {
    1536
}

const fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_extraction_timeout_secs() -> u64 {
    30
}

const fn default_max_chunk_chars() -> usize {
    1000
}

const fn default_embedding_batch_size() -> usize {
    10
}

const fn default_retrieval_top_k() -> usize {
    5
}

const fn default_chat_rate_limit() -> u32 {
    20
}

const fn default_chat_rate_limit_window() -> i64 {
    1
}

const fn default_ingest_rate_limit() -> u32 {
    10
}

const fn default_ingest_rate_limit_window() -> i64 {
    10
}

const fn default_rate_limit_sweep_interval_secs() -> u64 {
    300
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: "test-key".to_string(),
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "test".to_string(),
            surrealdb_database: "test".to_string(),
            http_port: 0,
            admin_api_key: "test-admin-key".to_string(),
            openai_base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            max_file_bytes: default_max_file_bytes(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            max_chunk_chars: default_max_chunk_chars(),
            embedding_batch_size: default_embedding_batch_size(),
            retrieval_top_k: default_retrieval_top_k(),
            chat_rate_limit_max_requests: default_chat_rate_limit(),
            chat_rate_limit_window_minutes: default_chat_rate_limit_window(),
            ingest_rate_limit_max_requests: default_ingest_rate_limit(),
            ingest_rate_limit_window_minutes: default_ingest_rate_limit_window(),
            rate_limit_sweep_interval_secs: default_rate_limit_sweep_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_budgets() {
        let config = AppConfig::default();
        assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.extraction_timeout_secs, 30);
        assert_eq!(config.max_chunk_chars, 1000);
        assert_eq!(config.embedding_batch_size, 10);
        assert_eq!(config.retrieval_top_k, 5);
        assert_eq!(config.embedding_dimensions, 1536);
    }
}
