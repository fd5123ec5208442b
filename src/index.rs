//! Vector index client: upserts and nearest-neighbour queries against a
//! named-collection document store.
//!
//! The [`VectorIndex`] trait is the seam between the pipeline and the
//! backing store. Two backends are provided:
//! - **[`MemoryIndex`]** — in-process, brute-force cosine scan; used for
//!   tests and local runs without an index service.
//! - **[`HttpIndex`]** — JSON document API over HTTP; entries travel as
//!   `{id, fields: {id, text, embedding, metadata}}` with `metadata`
//!   JSON-encoded as a string.
//!
//! Upserts are idempotent by entry id: re-upserting replaces the stored
//! vector, text, and metadata. Query results are ordered by descending
//! score with ties broken most-recently-upserted first, which keeps result
//! order deterministic. The only consistency promise is that a successful
//! upsert is visible to a query issued after it returns.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::config::IndexConfig;
use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{EntryMetadata, IndexEntry};

/// One query result: entry id, similarity score, stored text, and decoded
/// metadata.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: EntryMetadata,
}

/// Named-collection vector store interface.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a single entry, keyed by its id.
    async fn upsert_one(&self, collection: &str, entry: IndexEntry) -> Result<()>;

    /// Insert or replace many entries.
    async fn upsert_many(&self, collection: &str, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in entries {
            self.upsert_one(collection, entry).await?;
        }
        Ok(())
    }

    /// Nearest-neighbour search: up to `k` hits by descending similarity.
    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Whether an entry with this id exists in the collection.
    async fn contains(&self, collection: &str, id: &str) -> Result<bool>;
}

/// Build the configured index backend.
pub fn create_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
    match config.backend.as_str() {
        "memory" => Ok(Box::new(MemoryIndex::new())),
        "http" => Ok(Box::new(HttpIndex::new(config)?)),
        other => Err(Error::validation(
            "index.backend",
            format!("unknown backend '{other}', expected memory or http"),
        )),
    }
}

// ============ In-memory backend ============

struct StoredEntry {
    entry: IndexEntry,
    /// Monotonic upsert sequence, refreshed on every upsert of the id.
    /// Used to break score ties in favour of the most recent write.
    seq: u64,
}

/// In-process index for tests and index-less local runs.
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, HashMap<String, StoredEntry>>>,
    counter: RwLock<u64>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            counter: RwLock::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        let mut counter = self.counter.write();
        *counter += 1;
        *counter
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert_one(&self, collection: &str, entry: IndexEntry) -> Result<()> {
        let seq = self.next_seq();
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(entry.id.clone(), StoredEntry { entry, seq });
        Ok(())
    }

    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read();
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(&StoredEntry, f32)> = entries
            .values()
            .map(|stored| (stored, cosine_similarity(vector, &stored.entry.embedding)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(stored, score)| QueryHit {
                id: stored.entry.id.clone(),
                score,
                text: stored.entry.text.clone(),
                metadata: stored.entry.metadata.clone(),
            })
            .collect())
    }

    async fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .is_some_and(|entries| entries.contains_key(id)))
    }
}

// ============ HTTP backend ============

/// Client for a remote vector index exposing a JSON document API.
///
/// Routes:
/// - `PUT  {endpoint}/collections/{collection}/docs/{id}` — upsert
/// - `GET  {endpoint}/collections/{collection}/docs/{id}` — existence check
/// - `POST {endpoint}/collections/{collection}/query` — similarity search
///
/// Transient failures (429, 5xx, network) retry with the same backoff
/// ladder as the embedding client.
pub struct HttpIndex {
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    hits: Vec<WireHit>,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    id: String,
    score: f32,
    text: String,
    metadata: String,
}

impl HttpIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(Error::validation(
                "index.endpoint",
                "required for the http backend",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::transient("index", e.to_string()))?;

        Ok(Self {
            endpoint,
            max_retries: config.max_retries,
            client,
        })
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/collections/{}/docs/{}", self.endpoint, collection, id)
    }

    /// Wire shape of an upsert body.
    fn wire_entry(entry: &IndexEntry) -> Result<serde_json::Value> {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|e| Error::validation("metadata", e.to_string()))?;
        Ok(serde_json::json!({
            "id": entry.id,
            "fields": {
                "id": entry.id,
                "text": entry.text,
                "embedding": entry.embedding,
                "metadata": metadata,
            }
        }))
    }

    async fn send_with_retry(&self, build: impl Fn() -> reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::transient(
                            "index",
                            format!("API error {status}: {body_text}"),
                        ));
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    last_err = Some(Error::transient("index", e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::transient("index", "failed after retries")))
    }
}

#[async_trait]
impl VectorIndex for HttpIndex {
    async fn upsert_one(&self, collection: &str, entry: IndexEntry) -> Result<()> {
        let url = self.doc_url(collection, &entry.id);
        let body = Self::wire_entry(&entry)?;
        let response = self
            .send_with_retry(|| self.client.put(&url).json(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::transient(
                "index",
                format!("upsert rejected with {status}: {body_text}"),
            ));
        }
        Ok(())
    }

    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let url = format!("{}/collections/{}/query", self.endpoint, collection);
        let body = serde_json::json!({ "embedding": vector, "k": k });
        let response = self
            .send_with_retry(|| self.client.post(&url).json(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::transient(
                "index",
                format!("query rejected with {status}: {body_text}"),
            ));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::transient("index", e.to_string()))?;

        parsed
            .hits
            .into_iter()
            .take(k)
            .map(|hit| {
                let metadata: EntryMetadata = serde_json::from_str(&hit.metadata)
                    .map_err(|e| Error::transient("index", format!("bad metadata: {e}")))?;
                Ok(QueryHit {
                    id: hit.id,
                    score: hit.score,
                    text: hit.text,
                    metadata,
                })
            })
            .collect()
    }

    async fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        let url = self.doc_url(collection, id);
        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => {
                let body_text = response.text().await.unwrap_or_default();
                Err(Error::transient(
                    "index",
                    format!("existence check failed with {s}: {body_text}"),
                ))
            }
        }
    }
}
