//! Error types for Askbase.
//!
//! One crate-wide [`enum@Error`] covers every failure category: transient
//! I/O against external services, unknown sessions, invalid parameters, and
//! the per-document / per-question wrappers the pipeline and answerer
//! attach before handing an error to the caller.
//!
//! Components fail fast with a typed variant rather than degrading
//! silently; nothing in the library retries past a document or question
//! boundary. Callers decide retry policy, using [`Error::is_transient`] to
//! tell a retryable network failure from a permanent one.

use thiserror::Error;

/// Ingestion stage at which a document failed.
///
/// A document moves `Received → Chunked → Embedded → Indexed → Done`;
/// the stage recorded here is the one that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Chunking,
    Embedding,
    Indexing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Chunking => write!(f, "chunking"),
            Stage::Embedding => write!(f, "embedding"),
            Stage::Indexing => write!(f, "indexing"),
        }
    }
}

/// Unified error type for Askbase.
#[derive(Debug, Error)]
pub enum Error {
    /// A network or service failure against an external collaborator
    /// (embedding service, vector index, language model). Eligible for
    /// caller-driven retry: upserts are idempotent and reads side-effect
    /// free.
    #[error("transient {operation} failure: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    /// An explicitly supplied session id is unknown to the store.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Malformed parameters or empty input where content is required.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A document failed to ingest. Carries the stage for diagnostics;
    /// retrying the whole document is safe because every id is
    /// content-derived and every write is an upsert.
    #[error("ingestion of document {document_id} failed during {stage}: {source}")]
    Ingestion {
        document_id: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// A question could not be answered. The session keeps the user turn
    /// and no partial assistant turn, so a retry re-sends a consistent
    /// context.
    #[error("answer failed: {source}")]
    Answer {
        #[source]
        source: Box<Error>,
    },

    /// Filesystem errors from local text acquisition.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Transient`] variant.
    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Transient {
            operation,
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Validation`] variant.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the root cause is a transient external failure, i.e. the
    /// same operation may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient { .. } => true,
            Error::Ingestion { source, .. } => source.is_transient(),
            Error::Answer { source } => source.is_transient(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
