//! Clients for OpenAI-compatible chat and embeddings endpoints, with
//! bounded retry on transient failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chat;
pub mod embeddings;
pub mod retry;

pub use chat::{ChatClient, ChatClientBuilder};
pub use embeddings::EmbeddingsClient;

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM request timed out")]
    Timeout,
    #[error("LLM endpoint rejected credentials (HTTP {0})")]
    Auth(u16),
    #[error("model or endpoint not found: {0}")]
    ModelMissing(String),
    #[error("LLM returned HTTP {0}")]
    Status(u16),
    #[error("malformed LLM response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Transient failures worth retrying: timeouts, connection errors,
    /// rate limiting, and server-side 5xx. Auth and not-found errors fail
    /// fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout | LlmError::Request(_) => true,
            LlmError::Status(code) => *code == 429 || *code >= 500,
            LlmError::Auth(_) | LlmError::ModelMissing(_) | LlmError::InvalidResponse(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(err.to_string())
        }
    }

    pub(crate) fn from_status(code: u16, body_hint: &str) -> Self {
        match code {
            401 | 403 => LlmError::Auth(code),
            404 => LlmError::ModelMissing(body_hint.to_string()),
            other => LlmError::Status(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_retryable() {
        assert!(LlmError::Status(429).is_retryable());
        assert!(LlmError::Status(503).is_retryable());
        assert!(LlmError::Timeout.is_retryable());
    }

    #[test]
    fn auth_and_missing_model_fail_fast() {
        assert!(!LlmError::Auth(401).is_retryable());
        assert!(!LlmError::Auth(403).is_retryable());
        assert!(!LlmError::ModelMissing("gpt-x".into()).is_retryable());
        assert!(!LlmError::Status(400).is_retryable());
    }

    #[test]
    fn status_mapping_picks_variants() {
        assert!(matches!(LlmError::from_status(401, ""), LlmError::Auth(401)));
        assert!(matches!(
            LlmError::from_status(404, "model"),
            LlmError::ModelMissing(_)
        ));
        assert!(matches!(
            LlmError::from_status(500, ""),
            LlmError::Status(500)
        ));
    }
}
