//! End-to-end tests over the in-process backends: deterministic hash
//! embeddings, the memory index, and a scripted language model double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use askbase::chat::Answerer;
use askbase::config::{ChatConfig, ChunkingConfig, Config, IngestionConfig, RetrievalConfig};
use askbase::embedding::{Embedder, HashEmbedder};
use askbase::error::{Error, Stage};
use askbase::index::{MemoryIndex, VectorIndex};
use askbase::ingest::{IngestInput, IngestionPipeline};
use askbase::llm::{CompletionRequest, LlmClient};
use askbase::models::{IngestStatus, Role};
use askbase::session::SessionStore;

/// Scripted language model: echoes the prompt back, or fails a configured
/// number of times first.
struct ScriptedLlm {
    failures_remaining: AtomicUsize,
}

impl ScriptedLlm {
    fn answering() -> Self {
        Self {
            failures_remaining: AtomicUsize::new(0),
        }
    }

    fn failing_first(n: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> askbase::Result<String> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::transient("completion", "scripted outage"));
        }
        Ok(format!("grounded answer to: {}", request.prompt))
    }
}

/// Embedder that fails for documents containing a marker string; used to
/// test per-document failure isolation.
struct FaultyEmbedder {
    inner: HashEmbedder,
    poison: &'static str,
}

#[async_trait]
impl Embedder for FaultyEmbedder {
    fn model_name(&self) -> &str {
        "faulty"
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn embed_batch(&self, texts: &[String]) -> askbase::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains(self.poison)) {
            return Err(Error::transient("embedding", "service unavailable"));
        }
        self.inner.embed_batch(texts).await
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.index.backend = "memory".to_string();
    config.chunking = ChunkingConfig {
        size: 30,
        overlap: 5,
    };
    config
}

fn pipeline_with(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: &Config,
) -> IngestionPipeline {
    IngestionPipeline::new(
        embedder,
        index,
        config.chunking.clone(),
        &config.index,
        &IngestionConfig { concurrency: 3 },
    )
}

fn answerer_with(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    sessions: Arc<SessionStore>,
    config: &Config,
) -> Answerer {
    Answerer::new(
        embedder,
        index,
        llm,
        sessions,
        &RetrievalConfig { context_chunks: 3 },
        &ChatConfig::default(),
        &config.index,
    )
}

const IBU_TEXT: &str = "The IBU campus is in Sarajevo. It offers many programs.";

#[tokio::test]
async fn round_trip_retrieves_relevant_chunk_first() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let pipeline = pipeline_with(Arc::clone(&embedder), Arc::clone(&index), &config);

    let outcome = pipeline.ingest(IBU_TEXT, "ibu.txt", false).await.unwrap();
    let IngestStatus::Indexed { chunks } = outcome.status else {
        panic!("expected indexed outcome");
    };
    assert!(chunks >= 2, "expected at least 2 chunks, got {chunks}");

    let query_vector = embedder.embed("Where is IBU campus?").await.unwrap();
    let hits = index
        .query(&config.index.chunk_collection, &query_vector, 3)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(
        hits[0].text.contains("Sarajevo"),
        "top hit should contain the answer, got: {}",
        hits[0].text
    );
    assert_eq!(hits[0].metadata.parent_id.as_deref(), Some(outcome.document_id.as_str()));
}

#[tokio::test]
async fn reingesting_same_text_yields_same_ids_and_no_duplicates() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let pipeline = pipeline_with(Arc::clone(&embedder), Arc::clone(&index), &config);

    let first = pipeline.ingest(IBU_TEXT, "ibu.txt", true).await.unwrap();
    let second = pipeline.ingest(IBU_TEXT, "ibu.txt", true).await.unwrap();
    assert_eq!(first.document_id, second.document_id);
    assert_eq!(first.status, second.status);

    // Upserts replaced entries rather than duplicating them: the chunk
    // count in the index equals the count from a single ingestion.
    let IngestStatus::Indexed { chunks } = first.status else {
        panic!("expected indexed outcome");
    };
    let query_vector = embedder.embed("campus programs").await.unwrap();
    let hits = index
        .query(&config.index.chunk_collection, &query_vector, 100)
        .await
        .unwrap();
    assert_eq!(hits.len(), chunks);
}

#[tokio::test]
async fn one_failing_document_does_not_abort_the_batch() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(FaultyEmbedder {
        inner: HashEmbedder::new(64),
        poison: "POISON",
    });
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let pipeline = pipeline_with(embedder, Arc::clone(&index), &config);

    let reports = pipeline
        .ingest_all(
            vec![
                IngestInput {
                    text: "Document one describes admissions and tuition.".into(),
                    origin: "one.txt".into(),
                },
                IngestInput {
                    text: "Document two carries the POISON marker string.".into(),
                    origin: "two.txt".into(),
                },
                IngestInput {
                    text: "Document three lists campus facilities and labs.".into(),
                    origin: "three.txt".into(),
                },
            ],
            false,
        )
        .await;

    assert_eq!(reports.len(), 3);
    assert!(reports[0].result.is_ok());
    assert!(reports[2].result.is_ok());

    let err = reports[1].result.as_ref().unwrap_err();
    match err {
        Error::Ingestion { stage, .. } => assert_eq!(*stage, Stage::Embedding),
        other => panic!("expected ingestion error, got {other}"),
    }
    assert!(err.is_transient());

    // Documents one and three are visible in the document collection.
    for report in [&reports[0], &reports[2]] {
        let id = &report.result.as_ref().unwrap().document_id;
        assert!(index
            .contains(&config.index.document_collection, id)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn answer_records_both_turns_and_returns_session() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let sessions = Arc::new(SessionStore::new());
    let pipeline = pipeline_with(Arc::clone(&embedder), Arc::clone(&index), &config);
    pipeline.ingest(IBU_TEXT, "ibu.txt", false).await.unwrap();

    let answerer = answerer_with(
        embedder,
        index,
        Arc::new(ScriptedLlm::answering()),
        Arc::clone(&sessions),
        &config,
    );

    let answer = answerer.answer("Where is IBU campus?", None).await.unwrap();
    assert!(answer.text.contains("Sarajevo"), "prompt should carry grounding context");

    let history = sessions.history(&answer.session_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "Where is IBU campus?");
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn followup_question_reuses_the_session() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(128));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let sessions = Arc::new(SessionStore::new());
    let answerer = answerer_with(
        embedder,
        index,
        Arc::new(ScriptedLlm::answering()),
        Arc::clone(&sessions),
        &config,
    );

    let first = answerer.answer("What is the tuition?", None).await.unwrap();
    let second = answerer
        .answer("And the deadline?", Some(&first.session_id))
        .await
        .unwrap();
    assert_eq!(first.session_id, second.session_id);

    // The second prompt carries the first exchange as history.
    assert!(second.text.contains("What is the tuition?"));

    let history = sessions.history(&first.session_id).unwrap();
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn unknown_session_id_is_rejected_without_creating_it() {
    let config = test_config();
    let sessions = Arc::new(SessionStore::new());
    let answerer = answerer_with(
        Arc::new(HashEmbedder::new(64)),
        Arc::new(MemoryIndex::new()),
        Arc::new(ScriptedLlm::answering()),
        Arc::clone(&sessions),
        &config,
    );

    let err = answerer.answer("hi", Some("nonexistent")).await.unwrap_err();
    assert!(matches!(err, Error::SessionNotFound(_)));
    assert!(!sessions.contains("nonexistent"));
}

#[tokio::test]
async fn failed_model_call_leaves_recoverable_session() {
    let config = test_config();
    let sessions = Arc::new(SessionStore::new());
    let answerer = answerer_with(
        Arc::new(HashEmbedder::new(64)),
        Arc::new(MemoryIndex::new()),
        Arc::new(ScriptedLlm::failing_first(1)),
        Arc::clone(&sessions),
        &config,
    );

    let session_id = sessions.create();
    let err = answerer
        .answer("Where is the campus?", Some(&session_id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Answer { .. }));
    assert!(err.is_transient());

    // The question is recorded; no assistant turn was appended.
    let history = sessions.history(&session_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);

    // A retry on the same session appends exactly one assistant turn.
    answerer
        .answer("Where is the campus?", Some(&session_id))
        .await
        .unwrap();
    let history = sessions.history(&session_id).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[2].role, Role::Assistant);
}

#[tokio::test]
async fn concurrent_sessions_keep_independent_ordered_histories() {
    let config = test_config();
    let sessions = Arc::new(SessionStore::new());
    let answerer = Arc::new(answerer_with(
        Arc::new(HashEmbedder::new(64)),
        Arc::new(MemoryIndex::new()),
        Arc::new(ScriptedLlm::answering()),
        Arc::clone(&sessions),
        &config,
    ));

    let mut handles = Vec::new();
    for s in 0..4 {
        let answerer = Arc::clone(&answerer);
        handles.push(tokio::spawn(async move {
            let first = answerer
                .answer(&format!("session {s} question 0"), None)
                .await
                .unwrap();
            for q in 1..3 {
                answerer
                    .answer(
                        &format!("session {s} question {q}"),
                        Some(&first.session_id),
                    )
                    .await
                    .unwrap();
            }
            first.session_id
        }));
    }

    for (s, handle) in handles.into_iter().enumerate() {
        let session_id = handle.await.unwrap();
        let history = sessions.history(&session_id).unwrap();
        assert_eq!(history.len(), 6);
        for q in 0..3 {
            assert_eq!(
                history[q * 2].content,
                format!("session {s} question {q}")
            );
            assert_eq!(history[q * 2].role, Role::User);
            assert_eq!(history[q * 2 + 1].role, Role::Assistant);
        }
    }
}

#[tokio::test]
async fn directory_ingestion_reads_supported_files() {
    let config = test_config();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let pipeline = pipeline_with(Arc::clone(&embedder), Arc::clone(&index), &config);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("campus.txt"), IBU_TEXT).unwrap();
    std::fs::write(
        dir.path().join("programs.md"),
        "Programs include engineering, economics, and law degrees.",
    )
    .unwrap();
    std::fs::write(dir.path().join("logo.png"), [0u8; 8]).unwrap();

    let reports = pipeline.ingest_dir(dir.path(), false).await;
    assert_eq!(reports.len(), 2, "png must be ignored");
    assert!(reports.iter().all(|r| r.result.is_ok()));

    let query = embedder.embed("engineering programs").await.unwrap();
    let hits = index
        .query(&config.index.chunk_collection, &query, 5)
        .await
        .unwrap();
    assert!(hits.iter().any(|h| h.text.contains("engineering")));
}
