//! Session state store
//!
//! Durable, low-latency mapping of session id to metadata, versioned design
//! states, the bounded context ring and analytics counters. The store owns
//! every persisted entity; other components only touch them through the
//! [`StateStore`] trait.
//!
//! Backends are pluggable. [`MemoryStore`] is the default in-process
//! implementation; a networked backend would implement the same trait and
//! the same conceptual key layout:
//!
//! - `(session_id, "meta")` - session metadata
//! - `(session_id, "state", version)` - one record per committed version
//! - `(session_id, "ctx")` - bounded context ring
//! - `(user_id, "sessions")` - per-user session index
//!
//! Every session key carries an absolute expiration of
//! `last_activity + session_ttl`; state and context writes refresh the TTL
//! for the whole session in one logical operation.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{SessionSnapshot, StateStore};

use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Unknown session or version (including TTL-expired sessions).
    #[error("not found")]
    NotFound,

    /// A write raced another writer: duplicate version or stale CAS.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store is unreachable. Never masked by a fallback.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Invariant breach, e.g. metadata pointing at a missing state.
    #[error("integrity violation: {0}")]
    Integrity(String),
}
