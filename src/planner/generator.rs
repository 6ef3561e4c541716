//! Model-backed subtask generation with bounded retry and offline fallback.

use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError, OpenAiClient, RetryConfig};

use super::fallback::fallback_subtasks;
use super::prompt::{build_prompt, parse_subtask_lines, SYSTEM_PROMPT};
use super::GenerationRequest;

/// Where a list of generated titles came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSource {
    /// Parsed from a model reply after `attempts` calls.
    Model { attempts: u32 },
    /// The category's fixed list.
    Fallback { reason: FallbackReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No model credential configured; no call was made.
    NotConfigured,
    /// Every allowed attempt failed (or a non-retryable error ended early).
    Exhausted { attempts: u32 },
}

/// Titles plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub titles: Vec<String>,
    pub source: GenerationSource,
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, GenerationSource::Fallback { .. })
    }
}

/// Generation state machine.
///
/// ```text
/// NotConfigured ----------------------------------> fallback
/// Attempting(1) -> Attempting(2) -> ... -> Exhausted -> fallback
///       \______________\_____________-> Succeeded -> model titles
/// ```
#[derive(Debug)]
enum GenerationState {
    NotConfigured,
    Attempting(u32),
    Succeeded { titles: Vec<String>, attempts: u32 },
    Exhausted { attempts: u32, last_error: LlmError },
}

/// Produces subtask titles for a task. Never fails.
pub struct SubtaskGenerator {
    client: Option<Arc<dyn LlmClient>>,
    retry: RetryConfig,
    max_tokens: u64,
    temperature: f64,
}

impl SubtaskGenerator {
    /// Build from configuration. Without an API key the generator only
    /// serves fallback lists.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let client: Option<Arc<dyn LlmClient>> = config.api_key().map(|key| {
            Arc::new(OpenAiClient::with_base_url(
                key,
                config.model.clone(),
                config.base_url.clone(),
            )) as Arc<dyn LlmClient>
        });

        if client.is_none() {
            tracing::info!("No model API key configured; subtask generation uses fallback lists");
        }

        Self {
            client,
            retry: config.retry.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Build around an existing client.
    pub fn with_client(client: Arc<dyn LlmClient>, retry: RetryConfig) -> Self {
        Self {
            client: Some(client),
            retry,
            max_tokens: GenerationConfig::DEFAULT_MAX_TOKENS,
            temperature: GenerationConfig::DEFAULT_TEMPERATURE,
        }
    }

    /// A generator that never calls a model.
    pub fn offline() -> Self {
        Self {
            client: None,
            retry: RetryConfig::default(),
            max_tokens: GenerationConfig::DEFAULT_MAX_TOKENS,
            temperature: GenerationConfig::DEFAULT_TEMPERATURE,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Generate titles, discarding provenance.
    pub async fn generate(&self, request: &GenerationRequest) -> Vec<String> {
        self.generate_with_outcome(request).await.titles
    }

    /// Generate titles and report which path produced them.
    pub async fn generate_with_outcome(&self, request: &GenerationRequest) -> GenerationOutcome {
        let mut state = match self.client {
            Some(_) => GenerationState::Attempting(1),
            None => GenerationState::NotConfigured,
        };

        loop {
            state = match state {
                GenerationState::NotConfigured => {
                    return Self::degrade(request, FallbackReason::NotConfigured);
                }
                GenerationState::Attempting(attempt) => self.attempt(request, attempt).await,
                GenerationState::Succeeded { titles, attempts } => {
                    if attempts > 1 {
                        tracing::info!("Subtask generation succeeded after {} attempts", attempts);
                    }
                    return GenerationOutcome {
                        titles,
                        source: GenerationSource::Model { attempts },
                    };
                }
                GenerationState::Exhausted {
                    attempts,
                    last_error,
                } => {
                    tracing::warn!(
                        "Subtask generation failed after {} attempt(s): {}",
                        attempts,
                        last_error
                    );
                    return Self::degrade(request, FallbackReason::Exhausted { attempts });
                }
            };
        }
    }

    /// Run attempt number `attempt` and decide the next state.
    async fn attempt(&self, request: &GenerationRequest, attempt: u32) -> GenerationState {
        let Some(client) = self.client.as_deref() else {
            return GenerationState::NotConfigured;
        };

        let result = self.call_model(client, request).await;
        let error = match result {
            Ok(titles) => {
                return GenerationState::Succeeded {
                    titles,
                    attempts: attempt,
                }
            }
            Err(error) => error,
        };

        if attempt >= self.retry.max_attempts || !self.retry.should_retry(&error) {
            return GenerationState::Exhausted {
                attempts: attempt,
                last_error: error,
            };
        }

        let delay = self.retry.delay_after(attempt, &error);
        tracing::warn!(
            "Subtask generation attempt {} failed with {}, retrying in {:?}: {}",
            attempt,
            error.kind,
            delay,
            error.message
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        GenerationState::Attempting(attempt + 1)
    }

    async fn call_model(
        &self,
        client: &dyn LlmClient,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, LlmError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(request)),
        ];
        let options = ChatOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        tracing::debug!("Generating {} subtasks for task: {}", request.count, request.title);
        let response = client.chat_completion(&messages, options).await?;
        tracing::debug!(
            model = response.model.as_deref().unwrap_or("unknown"),
            tokens = ?response.total_tokens,
            finish_reason = ?response.finish_reason,
            "Model replied"
        );

        let text = response
            .content
            .ok_or_else(|| LlmError::parse_error("Response has no content"))?;
        let titles = parse_subtask_lines(&text, request.count);
        if titles.is_empty() {
            return Err(LlmError::parse_error("Response contained no subtask lines"));
        }
        Ok(titles)
    }

    fn degrade(request: &GenerationRequest, reason: FallbackReason) -> GenerationOutcome {
        tracing::info!("Using fallback subtasks for category: {}", request.category);
        GenerationOutcome {
            titles: fallback_subtasks(&request.category),
            source: GenerationSource::Fallback { reason },
        }
    }
}
