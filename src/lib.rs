//! # Askbase
//!
//! A retrieval-grounded knowledge base: document ingestion, semantic
//! retrieval, and conversational question answering.
//!
//! Askbase turns raw documents (text files, PDFs) into deduplicated,
//! embedded, retrievable chunks, and answers questions by conditioning a
//! language model on the most relevant passages while preserving
//! multi-turn conversational context.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Documents │──▶│ IngestionPipeline │──▶│ VectorIndex   │
//! │ txt/md/pdf│   │ chunk+hash+embed  │   │ docs + chunks │
//! └───────────┘   └──────────────────┘   └──────┬───────┘
//!                                               │ top-K
//!                 ┌──────────────┐       ┌──────▼───────┐
//!                 │ SessionStore  │◀─────▶│   Answerer    │──▶ LLM
//!                 │ id → history  │       │ prompt + call │
//!                 └──────────────┘       └──────────────┘
//! ```
//!
//! Write path: documents flow through chunking, content addressing, and
//! embedding into two index collections (whole documents and chunks).
//! Read path: a question is embedded, the nearest chunks are retrieved,
//! and the model answers from that grounding context plus the session's
//! conversation history.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`content_id`] | Content-addressed identifiers |
//! | [`chunk`] | Boundary-aware text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index client (memory and HTTP backends) |
//! | [`ingest`] | Document ingestion pipeline |
//! | [`session`] | In-process conversation store |
//! | [`llm`] | Language model client |
//! | [`chat`] | Retrieval-augmented answer engine |
//! | [`extract`] | Text extraction from local files |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod content_id;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod session;

pub use error::{Error, Result, Stage};
