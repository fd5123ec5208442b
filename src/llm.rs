//! Language model client abstraction.
//!
//! Defines the [`LlmClient`] trait — a single blocking request/response
//! completion call — and the OpenAI chat-completions implementation the
//! answerer uses in production. Tests inject their own client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ChatConfig;
use crate::error::{Error, Result};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// A completion request: a fixed system instruction plus one user prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }
}

/// Trait for language model providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g. `"openai"`).
    fn provider_name(&self) -> &str;

    /// Perform one non-streaming completion and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Build the configured chat provider.
pub fn create_llm_client(config: &ChatConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiChatClient::new(config)?)),
        other => Err(Error::validation(
            "chat.provider",
            format!("unknown provider '{other}', expected openai"),
        )),
    }
}

/// OpenAI chat-completions client.
///
/// Sends the system instruction and the assembled prompt as a two-message
/// conversation. Transient failures (429, 5xx, network) retry with the
/// same backoff ladder as the embedding client; the answerer treats an
/// exhausted retry budget as a failed question.
pub struct OpenAiChatClient {
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            Error::validation("OPENAI_API_KEY", "environment variable not set")
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::transient("completion", e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(OPENAI_CHAT_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatResponse = response
                            .json()
                            .await
                            .map_err(|e| Error::transient("completion", e.to_string()))?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .ok_or_else(|| {
                                Error::transient("completion", "response carried no choices")
                            });
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::transient(
                            "completion",
                            format!("API error {status}: {body_text}"),
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(Error::transient(
                        "completion",
                        format!("API error {status}: {body_text}"),
                    ));
                }
                Err(e) => {
                    last_err = Some(Error::transient("completion", e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::transient("completion", "failed after retries")))
    }
}
