//! Boundary-aware text chunker.
//!
//! Splits document text into windows of at most `size` characters, where
//! consecutive windows share up to `overlap` characters of trailing
//! context. Splitting prefers natural boundaries — paragraph (`"\n\n"`),
//! line, sentence (`". "`), word — and only falls back to a hard character
//! cut when a single token exceeds the window.
//!
//! Identical `(text, size, overlap)` inputs always yield identical output;
//! chunk ids derived from the output are therefore stable across re-runs.

use crate::error::{Error, Result};
use crate::models::Chunk;

/// Boundary ladder, coarsest first. Each fragment keeps its trailing
/// separator so reassembly preserves the original text.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into ordered chunks of at most `size` characters with up
/// to `overlap` characters of carried context between neighbours.
///
/// Empty or whitespace-only text yields no chunks; text at or under `size`
/// yields exactly one chunk equal to the trimmed input. Requires
/// `0 <= overlap < size`.
pub fn split(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(Error::validation("size", "chunk size must be > 0"));
    }
    if overlap >= size {
        return Err(Error::validation(
            "overlap",
            format!("overlap ({overlap}) must be smaller than size ({size})"),
        ));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.chars().count() <= size {
        return Ok(vec![trimmed.to_string()]);
    }

    let fragments = fragment(trimmed, size, &SEPARATORS);
    Ok(assemble(&fragments, size, overlap))
}

/// Split a document's text and wrap the pieces as [`Chunk`] records with
/// content-derived ids and contiguous ordinals.
pub fn split_document(
    document_id: &str,
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let pieces = split(text, size, overlap)?;
    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk {
            id: crate::content_id::chunk_id(document_id, &text),
            document_id: document_id.to_string(),
            ordinal,
            text,
        })
        .collect())
}

/// Recursively break text into fragments of at most `size` trimmed
/// characters, descending the separator ladder only where a piece is still
/// too large.
fn fragment(text: &str, size: usize, separators: &[&str]) -> Vec<String> {
    if text.trim_end().chars().count() <= size {
        return vec![text.to_string()];
    }
    match separators.first() {
        Some(sep) => {
            let parts: Vec<&str> = text.split_inclusive(sep).collect();
            if parts.len() <= 1 {
                return fragment(text, size, &separators[1..]);
            }
            parts
                .into_iter()
                .flat_map(|part| fragment(part, size, &separators[1..]))
                .collect()
        }
        None => hard_cut(text, size),
    }
}

/// Last-resort cut at exact character offsets for a run with no usable
/// boundary (a very long word, a URL).
fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Greedily pack fragments into windows of at most `size` trimmed
/// characters, seeding each window after the first with the previous
/// window's trailing `overlap` characters.
fn assemble(fragments: &[String], size: usize, overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for frag in fragments {
        let candidate_len = {
            let mut candidate_chars = current.chars().count() + frag.chars().count();
            // Measure against the trimmed form: trailing separators never
            // count toward the window.
            let joined_trailing_ws = frag.chars().rev().take_while(|c| c.is_whitespace()).count();
            candidate_chars = candidate_chars.saturating_sub(joined_trailing_ws);
            candidate_chars
        };

        if !current.is_empty() && candidate_len > size {
            let tail = overlap_tail(&current, overlap);
            let flushed = std::mem::take(&mut current);
            let trimmed = flushed.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            // Carry the overlap only when the incoming fragment still fits
            // beside it; sharing less than `overlap` is allowed.
            if tail.chars().count() + frag.trim_end().chars().count() <= size {
                current = tail;
            }
        }
        current.push_str(frag);
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }
    chunks
}

/// Trailing `overlap` characters of a window, on a char boundary.
fn overlap_tail(window: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = window.chars().collect();
    let start = chars.len().saturating_sub(overlap);
    chars[start..].iter().collect()
}
