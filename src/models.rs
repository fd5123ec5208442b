//! Core data models used throughout Askbase.
//!
//! These types represent the documents, chunks, index entries, and
//! conversation turns that flow through the ingestion and answer pipelines.
//! Everything is an explicit record with required fields — malformed
//! entries are rejected before they reach the vector index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw document at ingestion time: full source text plus where it came
/// from. Immutable once created; re-ingesting changed content produces a
/// new document with a new content-derived id.
#[derive(Debug, Clone)]
pub struct Document {
    /// Content-derived id (SHA-256 hex of the text).
    pub id: String,
    /// Origin label: a filename or URL supplied by the text acquisition
    /// collaborator.
    pub origin: String,
    /// Full source text.
    pub text: String,
    /// Text size in bytes.
    pub size: usize,
}

impl Document {
    /// Build a document from raw text and an origin label, deriving the id
    /// from the content.
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: crate::content_id::document_id(&text),
            origin: origin.into(),
            size: text.len(),
            text,
        }
    }
}

/// A bounded substring of a document used as a retrieval unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Content-derived id (digest of parent id + chunk text), so an
    /// identical body under two parents still gets distinct ids.
    pub id: String,
    /// Parent document id.
    pub document_id: String,
    /// Ordinal position within the parent document.
    pub ordinal: usize,
    /// Chunk text.
    pub text: String,
}

/// Opaque metadata carried alongside an index entry.
///
/// Serialized to a JSON string in the entry's `metadata` field, matching
/// the wire shape the vector index expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Origin label of the parent document.
    pub origin: String,
    /// Chunk ordinal; `None` for whole-document entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
    /// Parent document id; `None` for whole-document entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// The unit stored in the vector index: id, embedding, searchable text,
/// and JSON-encoded metadata. Owned by the index's backing store once
/// upserted — the core holds no independent copy.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Entry for a whole document.
    pub fn for_document(doc: &Document, embedding: Vec<f32>) -> Self {
        Self {
            id: doc.id.clone(),
            embedding,
            text: doc.text.clone(),
            metadata: EntryMetadata {
                origin: doc.origin.clone(),
                ordinal: None,
                parent_id: None,
            },
        }
    }

    /// Entry for a single chunk of a document.
    pub fn for_chunk(chunk: &Chunk, origin: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            embedding,
            text: chunk.text.clone(),
            metadata: EntryMetadata {
                origin: origin.to_string(),
                ordinal: Some(chunk.ordinal),
                parent_id: Some(chunk.document_id.clone()),
            },
        }
    }
}

/// Speaker role within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a session: role, text, and when it was appended.
/// Append-only; turns are never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    /// Document and chunk entries upserted.
    Indexed { chunks: usize },
    /// Document id already present in the index; nothing re-embedded.
    Skipped,
}

/// Successful ingestion outcome: the content-derived document id plus what
/// happened to it.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: String,
    pub status: IngestStatus,
}

/// Per-document report returned from a batch ingestion run. A batch yields
/// one of these per input, successes and failures alike.
#[derive(Debug)]
pub struct IngestReport {
    pub origin: String,
    pub result: crate::error::Result<IngestOutcome>,
}
