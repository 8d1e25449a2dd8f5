//! The state store contract

use std::sync::Arc;

use async_trait::async_trait;

use wireframe_core::{EditContext, SessionRecord, VersionRecord};

use crate::StoreError;

/// A consistent point-in-time view of one session.
///
/// The triple is assembled under a single guard, so readers never observe a
/// metadata record pointing at a state that is not part of the same view.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub metadata: SessionRecord,
    pub current_state: Arc<VersionRecord>,
    pub context: Vec<EditContext>,
}

/// Storage backend for sessions, versions, context rings and counters.
///
/// All writes are atomic with respect to concurrent readers: either the full
/// record is visible or nothing is. Versioned states are shared read-only by
/// reference across readers.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Write a new versioned state. Fails with [`StoreError::Conflict`] if
    /// the `(session_id, version)` pair already exists.
    async fn put_state(&self, session_id: &str, record: VersionRecord) -> Result<(), StoreError>;

    /// Remove a single state. Only used to roll back a version whose
    /// metadata CAS failed, and by session expiry.
    async fn delete_state(&self, session_id: &str, version: u64) -> Result<(), StoreError>;

    /// Discard the wireframe body of a state in place, keeping metadata.
    async fn compact_state(&self, session_id: &str, version: u64) -> Result<(), StoreError>;

    /// Fetch one version, or the current (highest) version when `version`
    /// is `None`.
    async fn get_state(
        &self,
        session_id: &str,
        version: Option<u64>,
    ) -> Result<Arc<VersionRecord>, StoreError>;

    /// All committed version numbers for a session, ascending.
    async fn list_versions(&self, session_id: &str) -> Result<Vec<u64>, StoreError>;

    /// Fetch session metadata.
    async fn get_metadata(&self, session_id: &str) -> Result<SessionRecord, StoreError>;

    /// Unconditional metadata write; used only when creating a session.
    async fn put_metadata(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Metadata update guarded by the expected `current_version`. Fails with
    /// [`StoreError::Conflict`] when the stored version differs. The only
    /// permitted way to advance `current_version`.
    async fn compare_and_swap_metadata(
        &self,
        session_id: &str,
        expected_version: u64,
        record: SessionRecord,
    ) -> Result<(), StoreError>;

    /// Append to the bounded context ring, dropping the oldest entry on
    /// overflow.
    async fn append_context(&self, session_id: &str, entry: EditContext) -> Result<(), StoreError>;

    /// The most recent `n` context entries, newest last.
    async fn read_context(&self, session_id: &str, n: usize) -> Result<Vec<EditContext>, StoreError>;

    /// A consistent `(metadata, current state, context ring)` triple.
    async fn read_snapshot(&self, session_id: &str) -> Result<SessionSnapshot, StoreError>;

    /// Bump an analytics counter. Eventual consistency is acceptable.
    async fn increment_counter(&self, bucket: &str, delta: u64) -> Result<(), StoreError>;

    /// Read an analytics counter; missing buckets read as zero.
    async fn counter(&self, bucket: &str) -> Result<u64, StoreError>;

    /// Remove every key belonging to a session.
    async fn expire_session(&self, session_id: &str) -> Result<(), StoreError>;

    /// All live session ids. Used by the janitor sweep.
    async fn list_sessions(&self) -> Result<Vec<String>, StoreError>;

    /// Session ids owned by a user.
    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
}
