//! Retrieval-augmented answer engine.
//!
//! Turns a question plus conversation history into a grounded answer:
//! resolve the session, record the question, embed it, pull the most
//! similar chunks from the index, assemble a prompt from system
//! instruction + retrieved context + a bounded history suffix, and make
//! one language model call. The exchange is appended to the session so the
//! next question carries the conversation forward.
//!
//! The answerer is constructed explicitly at process start with its
//! collaborators injected — there is no lazy global instance.
//!
//! # Failure semantics
//!
//! Embedding, retrieval, and model failures abort the question with
//! [`Error::Answer`]. The user turn stays recorded and no partial
//! assistant turn is appended, so a retry on the same session re-sends a
//! consistent context.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ChatConfig, IndexConfig, RetrievalConfig};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{QueryHit, VectorIndex};
use crate::llm::{CompletionRequest, LlmClient};
use crate::models::ConversationTurn;
use crate::session::SessionStore;

/// Fixed system instruction scoping the assistant's domain.
const SYSTEM_INSTRUCTION: &str = "You are a knowledge assistant answering questions about an \
    ingested document collection.\n\
    Instructions:\n\
    - Answer using only the provided context passages and the conversation so far\n\
    - Do not mention passages, chunks, embeddings, or retrieval; answer as if you had \
    read the source documents directly\n\
    - If the context does not contain the answer, say you could not find the \
    information in the available documents\n\
    - Keep your response concise and factual";

/// A completed answer: the generated text and the session it belongs to
/// (freshly created when the caller supplied none).
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub session_id: String,
}

/// Answers questions against the chunk collection, maintaining
/// per-session conversational context.
pub struct Answerer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    sessions: Arc<SessionStore>,
    chunk_collection: String,
    context_chunks: usize,
    history_budget: usize,
}

impl Answerer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        sessions: Arc<SessionStore>,
        retrieval: &RetrievalConfig,
        chat: &ChatConfig,
        index_config: &IndexConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            sessions,
            chunk_collection: index_config.chunk_collection.clone(),
            context_chunks: retrieval.context_chunks.max(1),
            history_budget: chat.history_budget,
        }
    }

    /// Answer a question, resolving or creating the session.
    ///
    /// A supplied but unknown session id fails with
    /// [`Error::SessionNotFound`] and does not create a session under
    /// that id.
    pub async fn answer(&self, question: &str, session_id: Option<&str>) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::validation("question", "must not be empty"));
        }

        let session_id = match session_id {
            Some(id) => {
                if !self.sessions.contains(id) {
                    return Err(Error::SessionNotFound(id.to_string()));
                }
                id.to_string()
            }
            None => self.sessions.create(),
        };

        // Prior turns, snapshotted before this question is recorded.
        let prior_turns = self.sessions.history(&session_id)?;
        self.sessions
            .append(&session_id, ConversationTurn::user(question))?;

        let result = self.answer_in_session(question, &prior_turns).await;
        match result {
            Ok(text) => {
                self.sessions
                    .append(&session_id, ConversationTurn::assistant(&text))?;
                info!(session_id = %session_id, "answered question");
                Ok(Answer { text, session_id })
            }
            Err(cause) => Err(Error::Answer {
                source: Box::new(cause),
            }),
        }
    }

    /// Retrieval and generation for one question; session mutation stays
    /// in [`Answerer::answer`].
    async fn answer_in_session(
        &self,
        question: &str,
        prior_turns: &[ConversationTurn],
    ) -> Result<String> {
        let query_vector = self.embedder.embed(question).await?;

        let hits = self
            .index
            .query(&self.chunk_collection, &query_vector, self.context_chunks)
            .await?;
        debug!(hits = hits.len(), "retrieved grounding context");

        let prompt = build_prompt(question, &hits, prior_turns, self.history_budget);
        let request = CompletionRequest::new(prompt).with_system(SYSTEM_INSTRUCTION);

        self.llm.complete(&request).await
    }
}

/// Assemble the user prompt: retrieved context in descending-score order,
/// then a bounded suffix of the conversation, then the question.
fn build_prompt(
    question: &str,
    hits: &[QueryHit],
    prior_turns: &[ConversationTurn],
    history_budget: usize,
) -> String {
    let mut prompt = String::new();

    if !hits.is_empty() {
        prompt.push_str("Context passages:\n");
        for (i, hit) in hits.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, hit.text));
        }
        prompt.push('\n');
    }

    let history = bounded_history(prior_turns, history_budget);
    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in &history {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {question}"));
    prompt
}

/// Suffix of the conversation fitting the character budget, dropping the
/// oldest turns first. Ordering within the suffix is preserved.
fn bounded_history(turns: &[ConversationTurn], budget: usize) -> Vec<ConversationTurn> {
    let mut used = 0usize;
    let mut keep = Vec::new();
    for turn in turns.iter().rev() {
        let cost = turn.content.chars().count() + 16; // role prefix and framing
        if used + cost > budget {
            break;
        }
        used += cost;
        keep.push(turn.clone());
    }
    keep.reverse();
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryMetadata;

    fn hit(text: &str, score: f32) -> QueryHit {
        QueryHit {
            id: crate::content_id::content_id(text.as_bytes()),
            score,
            text: text.to_string(),
            metadata: EntryMetadata {
                origin: "doc.txt".into(),
                ordinal: Some(0),
                parent_id: Some("parent".into()),
            },
        }
    }

    #[test]
    fn prompt_orders_context_by_given_order() {
        let hits = vec![hit("best match", 0.9), hit("second match", 0.5)];
        let prompt = build_prompt("where?", &hits, &[], 1000);
        let best = prompt.find("[1] best match").unwrap();
        let second = prompt.find("[2] second match").unwrap();
        assert!(best < second);
        assert!(prompt.ends_with("Question: where?"));
    }

    #[test]
    fn prompt_without_context_or_history_is_just_the_question() {
        let prompt = build_prompt("hello?", &[], &[], 1000);
        assert_eq!(prompt, "Question: hello?");
    }

    #[test]
    fn history_drops_oldest_first() {
        let turns = vec![
            ConversationTurn::user("a".repeat(50)),
            ConversationTurn::assistant("b".repeat(50)),
            ConversationTurn::user("c".repeat(50)),
        ];
        // Budget fits roughly two turns (50 + 16 each).
        let kept = bounded_history(&turns, 140);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].content.starts_with('b'));
        assert!(kept[1].content.starts_with('c'));
    }

    #[test]
    fn history_keeps_order_when_everything_fits() {
        let turns = vec![
            ConversationTurn::user("first"),
            ConversationTurn::assistant("second"),
        ];
        let kept = bounded_history(&turns, 1000);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].content, "first");
        assert_eq!(kept[1].content, "second");
    }

    #[test]
    fn zero_budget_keeps_no_history() {
        let turns = vec![ConversationTurn::user("anything")];
        assert!(bounded_history(&turns, 0).is_empty());
    }
}
