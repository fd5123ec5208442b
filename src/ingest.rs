//! Ingestion pipeline orchestration.
//!
//! Coordinates the write path for each document: content id → chunking →
//! embedding → index upsert (document entry first, then chunk entries).
//! Each document moves `Received → Chunked → Embedded → Indexed → Done`;
//! a failure at any stage aborts that document with a stage-tagged
//! [`Error::Ingestion`] and leaves at most idempotent upserts behind, so
//! callers may retry the whole document safely.
//!
//! Documents whose content id is already present in the document
//! collection are skipped unless a full refresh is requested — unchanged
//! content is never re-embedded on routine runs.
//!
//! Multi-document runs process inputs independently with a bounded
//! fan-out; one document's failure never aborts the others.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk;
use crate::config::{ChunkingConfig, IndexConfig, IngestionConfig};
use crate::embedding::Embedder;
use crate::error::{Error, Result, Stage};
use crate::extract;
use crate::index::VectorIndex;
use crate::models::{Document, IndexEntry, IngestOutcome, IngestReport, IngestStatus};

/// A document waiting to be ingested: raw text plus an origin label.
#[derive(Debug, Clone)]
pub struct IngestInput {
    pub text: String,
    pub origin: String,
}

/// Orchestrates Chunker → ContentAddresser → Embedder → VectorIndex for
/// each input document. Constructed once at startup with its
/// collaborators injected.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
    document_collection: String,
    chunk_collection: String,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
        index_config: &IndexConfig,
        ingestion: &IngestionConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunking,
            document_collection: index_config.document_collection.clone(),
            chunk_collection: index_config.chunk_collection.clone(),
            concurrency: ingestion.concurrency.max(1),
        }
    }

    /// Ingest one document. With `full` set, re-embeds and re-upserts even
    /// when the document id is already indexed.
    pub async fn ingest(&self, text: &str, origin: &str, full: bool) -> Result<IngestOutcome> {
        if text.trim().is_empty() {
            return Err(Error::validation("document", "text must not be empty"));
        }

        let document = Document::new(text, origin);
        debug!(document_id = %document.id, origin, size = document.size, "received document");

        if !full
            && self
                .index
                .contains(&self.document_collection, &document.id)
                .await
                .map_err(|e| ingestion_error(&document.id, Stage::Indexing, e))?
        {
            info!(document_id = %document.id, origin, "document already indexed, skipping");
            return Ok(IngestOutcome {
                document_id: document.id,
                status: IngestStatus::Skipped,
            });
        }

        // Chunked
        let chunks = chunk::split_document(
            &document.id,
            &document.text,
            self.chunking.size,
            self.chunking.overlap,
        )
        .map_err(|e| ingestion_error(&document.id, Stage::Chunking, e))?;
        debug!(document_id = %document.id, chunks = chunks.len(), "chunked document");

        // Embedded: whole document, then every chunk
        let document_embedding = self
            .embedder
            .embed(&document.text)
            .await
            .map_err(|e| ingestion_error(&document.id, Stage::Embedding, e))?;

        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let chunk_embeddings = self
            .embedder
            .embed_batch(&chunk_texts)
            .await
            .map_err(|e| ingestion_error(&document.id, Stage::Embedding, e))?;

        if chunk_embeddings.len() != chunks.len() {
            return Err(ingestion_error(
                &document.id,
                Stage::Embedding,
                Error::transient(
                    "embedding",
                    format!(
                        "expected {} chunk embeddings, got {}",
                        chunks.len(),
                        chunk_embeddings.len()
                    ),
                ),
            ));
        }

        // Indexed: document entry first, then chunk entries
        let document_entry = IndexEntry::for_document(&document, document_embedding);
        self.index
            .upsert_one(&self.document_collection, document_entry)
            .await
            .map_err(|e| ingestion_error(&document.id, Stage::Indexing, e))?;

        let chunk_entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(chunk_embeddings)
            .map(|(chunk, embedding)| IndexEntry::for_chunk(chunk, &document.origin, embedding))
            .collect();
        self.index
            .upsert_many(&self.chunk_collection, chunk_entries)
            .await
            .map_err(|e| ingestion_error(&document.id, Stage::Indexing, e))?;

        info!(document_id = %document.id, origin, chunks = chunks.len(), "document ingested");
        Ok(IngestOutcome {
            document_id: document.id,
            status: IngestStatus::Indexed {
                chunks: chunks.len(),
            },
        })
    }

    /// Ingest a batch of documents independently with bounded fan-out.
    ///
    /// Returns one report per input, in input order. Failures are
    /// captured in their report; they never abort the documents still
    /// pending.
    pub async fn ingest_all(&self, inputs: Vec<IngestInput>, full: bool) -> Vec<IngestReport> {
        stream::iter(inputs)
            .map(|input| async move {
                let result = self.ingest(&input.text, &input.origin, full).await;
                if let Err(err) = &result {
                    warn!(origin = %input.origin, error = %err, "document ingestion failed");
                }
                IngestReport {
                    origin: input.origin,
                    result,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Scan a data directory for supported files (`.txt`, `.md`, `.pdf`),
    /// extract their text, and ingest each as one document.
    ///
    /// Unreadable or unsupported files produce a failed report under their
    /// path; the rest of the directory still ingests.
    pub async fn ingest_dir(&self, dir: &Path, full: bool) -> Vec<IngestReport> {
        let mut inputs = Vec::new();
        let mut failed = Vec::new();

        let mut paths: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| extract::is_supported(p))
            .collect();
        paths.sort();

        for path in paths {
            let origin = path.display().to_string();
            match extract::read_document(&path) {
                Ok(text) => inputs.push(IngestInput { text, origin }),
                Err(err) => {
                    warn!(origin = %origin, error = %err, "text extraction failed");
                    failed.push(IngestReport {
                        origin,
                        result: Err(err),
                    });
                }
            }
        }

        let mut reports = self.ingest_all(inputs, full).await;
        reports.extend(failed);
        reports
    }
}

fn ingestion_error(document_id: &str, stage: Stage, source: Error) -> Error {
    Error::Ingestion {
        document_id: document_id.to_string(),
        stage,
        source: Box::new(source),
    }
}
