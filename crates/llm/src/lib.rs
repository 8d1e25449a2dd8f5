//! Model adapter
//!
//! Wraps the external generative model behind the [`LlmBackend`] trait and
//! the [`WireframeGenerator`], which enforces the per-call timeout,
//! cancellation, the retry policy for transient failures, and structural
//! validation of the returned document. The adapter is stateless and
//! re-entrant; concurrent calls for distinct sessions are fine.

pub mod backend;
pub mod generate;

pub use backend::{BackendConfig, LlmBackend, OllamaBackend};
pub use generate::{GeneratorConfig, WireframeGenerator};

use thiserror::Error;

/// Model adapter errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// Upstream model failure (HTTP error status, malformed transport).
    #[error("model error: {0}")]
    Model(String),

    /// Could not reach the model at all.
    #[error("network error: {0}")]
    Network(String),

    /// The model returned a structurally invalid document. Never retried.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// The per-call timeout elapsed.
    #[error("model call timed out")]
    Timeout,

    /// The caller's cancellation signal fired.
    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Model(_) | LlmError::Network(_) | LlmError::Timeout
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
