//! Completion-call failures and the retry policy applied to them.
//!
//! Adapters report every failure as an [`LlmError`] tagged with an
//! [`LlmErrorKind`]; [`RetryConfig`] decides per kind whether the planner
//! tries again and how long it waits first.

use std::time::Duration;

use thiserror::Error;

/// What went wrong with a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LlmErrorKind {
    /// HTTP 429
    #[error("Rate limited")]
    RateLimited,
    /// HTTP 5xx or an unexpected status
    #[error("Server error")]
    ServerError,
    /// HTTP 4xx other than 429 (bad key, bad request)
    #[error("Client error")]
    ClientError,
    /// Connect failure, timeout, or truncated body
    #[error("Network error")]
    NetworkError,
    /// Payload that is not a usable completion
    #[error("Parse error")]
    ParseError,
}

/// A failed completion call.
#[derive(Debug, Clone, Error)]
#[error("{kind}{}: {message}", http_suffix(.status_code))]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    /// Provider's `Retry-After` hint, if any
    pub retry_after: Option<Duration>,
}

impl LlmError {
    fn with_kind(kind: LlmErrorKind, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::with_kind(LlmErrorKind::RateLimited, Some(429), message)
        }
    }

    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::ServerError, Some(status_code), message)
    }

    pub fn client_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::ClientError, Some(status_code), message)
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::NetworkError, None, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::ParseError, None, message)
    }
}

fn http_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

/// Map a non-success HTTP status to an error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

/// Attempt budget and backoff for subtask generation.
///
/// The defaults give 3 attempts with waits of 2s then 4s, each wait capped at
/// 10s. Every kind is retried unless its flag is switched off.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further failure
    pub initial_delay: Duration,
    /// Cap on any single wait, `Retry-After` hints included
    pub max_delay: Duration,
    pub retry_rate_limits: bool,
    pub retry_server_errors: bool,
    pub retry_network_errors: bool,
    pub retry_client_errors: bool,
    pub retry_parse_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            retry_rate_limits: true,
            retry_server_errors: true,
            retry_network_errors: true,
            retry_client_errors: true,
            retry_parse_errors: true,
        }
    }
}

impl RetryConfig {
    /// Same policy with no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, error: &LlmError) -> bool {
        match error.kind {
            LlmErrorKind::RateLimited => self.retry_rate_limits,
            LlmErrorKind::ServerError => self.retry_server_errors,
            LlmErrorKind::NetworkError => self.retry_network_errors,
            LlmErrorKind::ClientError => self.retry_client_errors,
            LlmErrorKind::ParseError => self.retry_parse_errors,
        }
    }

    /// Wait before the next attempt, given that attempt number `attempt`
    /// (1-based) just failed with `error`.
    pub fn delay_after(&self, attempt: u32, error: &LlmError) -> Duration {
        let wait = error.retry_after.unwrap_or_else(|| {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.initial_delay.saturating_mul(factor)
        });
        wait.min(self.max_delay)
    }
}
