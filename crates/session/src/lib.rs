//! Session orchestration
//!
//! The public entry point of the engine. [`SessionManager`] drives the edit
//! pipeline (classify, resolve, prompt, generate, commit) under a
//! per-session lock, [`VersionManager`] owns version allocation and
//! retention, and [`Janitor`] sweeps expired sessions in the background.
//!
//! The session manager is the single translator between internal error
//! kinds and user-visible responses: every error path leaves the session at
//! version N or advances it atomically to N+1, never in between.

pub mod janitor;
pub mod manager;
pub mod version;

pub use janitor::Janitor;
pub use manager::{
    CreateResult, EditOutcome, EditResult, HistoryEntry, SessionManager, SessionView, VersionView,
};
pub use version::VersionManager;

use thiserror::Error;

use wireframe_llm::LlmError;
use wireframe_store::StoreError;

/// User-visible error kinds for session operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The state backend is unreachable; retryable, nothing was mutated.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// Optimistic concurrency failure on the version advance.
    #[error("version conflict")]
    Conflict,

    /// Per-session lock contention past the acquisition timeout.
    #[error("session busy")]
    Busy,

    /// Upstream model failure after retries.
    #[error("model error: {0}")]
    Model(String),

    /// The model returned a structurally invalid document; state unchanged.
    #[error("model returned an invalid document: {0}")]
    InvalidOutput(String),

    /// The edit budget was exhausted before the commit.
    #[error("edit budget exhausted")]
    Timeout,

    /// The caller cancelled before the commit.
    #[error("cancelled")]
    Cancelled,

    /// Unknown session or version.
    #[error("not found")]
    NotFound,

    /// The requested version exists but its body was compacted away.
    #[error("version body compacted")]
    Gone,

    /// Integrity violation: the session rejects writes until an operator
    /// intervenes; reads are still served.
    #[error("session quarantined: {0}")]
    Quarantined(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::NotFound,
            StoreError::Conflict(_) => EngineError::Conflict,
            StoreError::Unavailable(msg) => EngineError::Unavailable(msg),
            StoreError::Integrity(msg) => EngineError::Quarantined(msg),
        }
    }
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidOutput(msg) => EngineError::InvalidOutput(msg),
            LlmError::Timeout => EngineError::Timeout,
            LlmError::Cancelled => EngineError::Cancelled,
            LlmError::Model(msg) | LlmError::Network(msg) | LlmError::Configuration(msg) => {
                EngineError::Model(msg)
            }
        }
    }
}
