//! Content-addressed identifiers for documents and chunks.
//!
//! Ids are lowercase-hex SHA-256 digests of the content bytes, so they are
//! deterministic across runs and platforms, and re-ingesting unchanged
//! content always maps onto the same index entries (upsert, not
//! duplicate-insert).
//!
//! A chunk id digests the parent document id together with the chunk text:
//! an identical chunk body under two different parents produces two
//! different ids.

use sha2::{Digest, Sha256};

/// Deterministic one-way digest of arbitrary bytes, as 64 hex characters.
pub fn content_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Id of a document, derived from its full text.
pub fn document_id(text: &str) -> String {
    content_id(text.as_bytes())
}

/// Id of a chunk, derived from its parent document id and its text.
pub fn chunk_id(parent_document_id: &str, chunk_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_document_id.as_bytes());
    hasher.update(chunk_text.as_bytes());
    format!("{:x}", hasher.finalize())
}
