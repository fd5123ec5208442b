//! TOML configuration for Askbase.
//!
//! Every table has serde defaults so a minimal file (or none at all, via
//! [`Config::default`]) still produces a runnable configuration.
//! [`load_config`] validates cross-field constraints up front so bad
//! parameters fail at startup, not mid-pipeline. Secrets (API keys) come
//! from the environment, never from the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

/// Chunk window parameters, in characters.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved as grounding context per question.
    #[serde(default = "default_context_chunks")]
    pub context_chunks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            context_chunks: default_context_chunks(),
        }
    }
}

fn default_context_chunks() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"hash"` (deterministic local vectors).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_embedding_dims() -> usize {
    3072
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// `"openai"` is the only shipped provider; tests inject their own
    /// [`LlmClient`](crate::llm::LlmClient).
    #[serde(default = "default_chat_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    /// Character budget for the conversation-history suffix included in
    /// the prompt; oldest turns are dropped first once exceeded.
    #[serde(default = "default_history_budget")]
    pub history_budget: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            model: default_chat_model(),
            max_tokens: default_chat_max_tokens(),
            temperature: default_chat_temperature(),
            history_budget: default_history_budget(),
            max_retries: default_max_retries(),
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

fn default_chat_provider() -> String {
    "openai".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o".to_string()
}
fn default_chat_max_tokens() -> u32 {
    1000
}
fn default_chat_temperature() -> f32 {
    0.3
}
fn default_history_budget() -> usize {
    6000
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// `"http"` (remote document API) or `"memory"` (in-process).
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_document_collection")]
    pub document_collection: String,
    #[serde(default = "default_chunk_collection")]
    pub chunk_collection: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            endpoint: String::new(),
            document_collection: default_document_collection(),
            chunk_collection: default_chunk_collection(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_index_backend() -> String {
    "http".to_string()
}
fn default_document_collection() -> String {
    "documents".to_string()
}
fn default_chunk_collection() -> String {
    "chunks".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    /// Bounded fan-out for multi-document runs; respects the embedding
    /// service's rate limits.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::validation("config", e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Cross-field validation shared by file loading and programmatic
/// construction.
pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.size == 0 {
        return Err(Error::validation("chunking.size", "must be > 0"));
    }
    if config.chunking.overlap >= config.chunking.size {
        return Err(Error::validation(
            "chunking.overlap",
            "must be smaller than chunking.size",
        ));
    }
    if config.retrieval.context_chunks == 0 {
        return Err(Error::validation("retrieval.context_chunks", "must be >= 1"));
    }
    if config.embedding.dims == 0 {
        return Err(Error::validation("embedding.dims", "must be > 0"));
    }
    match config.embedding.provider.as_str() {
        "openai" | "hash" => {}
        other => {
            return Err(Error::validation(
                "embedding.provider",
                format!("unknown provider '{other}', expected openai or hash"),
            ))
        }
    }
    match config.index.backend.as_str() {
        "memory" => {}
        "http" => {
            if config.index.endpoint.is_empty() {
                return Err(Error::validation(
                    "index.endpoint",
                    "required for the http backend",
                ));
            }
        }
        other => {
            return Err(Error::validation(
                "index.backend",
                format!("unknown backend '{other}', expected memory or http"),
            ))
        }
    }
    if config.ingestion.concurrency == 0 {
        return Err(Error::validation("ingestion.concurrency", "must be >= 1"));
    }
    Ok(())
}
