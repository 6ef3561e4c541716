//! Chat-completion plumbing for subtask planning.
//!
//! The planner only sees the [`LlmClient`] trait; [`OpenAiClient`] is the one
//! concrete adapter and works against any OpenAI-compatible endpoint. An
//! adapter sends exactly one request per call and leaves retrying to the
//! caller.

mod error;
mod openai;

pub use error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
pub use openai::{OpenAiClient, DEFAULT_OPENAI_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who a prompt message comes from. Replies are never fed back, so there is
/// no assistant role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The first choice of a completion plus bookkeeping for logs.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    /// Model that answered, as reported by the provider
    pub model: Option<String>,
    pub total_tokens: Option<u64>,
}

/// Sampling knobs sent with each request. `None` leaves the provider default.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one chat completion request.
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError>;
}
