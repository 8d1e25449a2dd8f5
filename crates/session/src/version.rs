//! Version allocation, commits and retention
//!
//! A version moves `Pending -> Committed` through a successful metadata
//! compare-and-swap, or `Pending -> Rolled Back` when the CAS loses; only
//! committed versions are ever visible to readers, so state writes stay
//! atomic without a transaction log.

use std::sync::Arc;

use wireframe_core::{
    diff, ChangeSummary, SessionMetrics, SessionRecord, VersionMetadata, VersionRecord,
    WireframeNode, CONTEXT_WINDOW,
};
use wireframe_store::{StateStore, StoreError};

use crate::EngineError;

/// Allocates monotonic version numbers and enforces the retention policy.
pub struct VersionManager {
    store: Arc<dyn StateStore>,
    retention_window: usize,
}

impl VersionManager {
    pub fn new(store: Arc<dyn StateStore>, retention_window: usize) -> Self {
        Self {
            store,
            retention_window,
        }
    }

    /// Write version 1 and the initial session metadata.
    ///
    /// Fails with [`EngineError::Conflict`] if any state already exists for
    /// the session id (the caller retries with a fresh id).
    pub async fn create_initial(
        &self,
        record: SessionRecord,
        wireframe: WireframeNode,
        metadata: VersionMetadata,
    ) -> Result<u64, EngineError> {
        match self.store.get_metadata(&record.session_id).await {
            Ok(_) => return Err(EngineError::Conflict),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let session_id = record.session_id.clone();
        self.store.put_metadata(record).await?;
        self.store
            .put_state(&session_id, VersionRecord::new(1, wireframe, metadata))
            .await?;

        tracing::info!(session_id = %session_id, "created session at version 1");
        Ok(1)
    }

    /// Allocate `expected_current + 1`, write the state, then advance the
    /// session metadata via compare-and-swap. On CAS failure the freshly
    /// written state is rolled back and [`EngineError::Conflict`] returned.
    ///
    /// This is the only way `current_version` moves.
    pub async fn create_next(
        &self,
        session_id: &str,
        expected_current: u64,
        wireframe: WireframeNode,
        metadata: VersionMetadata,
    ) -> Result<u64, EngineError> {
        let new_version = expected_current + 1;
        self.store
            .put_state(
                session_id,
                VersionRecord::new(new_version, wireframe, metadata),
            )
            .await?;

        let mut record = self.store.get_metadata(session_id).await?;
        record.current_version = new_version;
        record.touch();

        match self
            .store
            .compare_and_swap_metadata(session_id, expected_current, record)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    session_id = %session_id,
                    version = new_version,
                    "committed version"
                );
                Ok(new_version)
            }
            Err(cas_err) => {
                // The pending state is an orphan; remove it before surfacing.
                if let Err(e) = self.store.delete_state(session_id, new_version).await {
                    tracing::warn!(
                        session_id = %session_id,
                        version = new_version,
                        error = %e,
                        "failed to roll back orphaned state"
                    );
                }
                Err(cas_err.into())
            }
        }
    }

    /// Structural diff between two stored versions.
    pub async fn diff(
        &self,
        session_id: &str,
        from: u64,
        to: u64,
    ) -> Result<ChangeSummary, EngineError> {
        let old = self.store.get_state(session_id, Some(from)).await?;
        let new = self.store.get_state(session_id, Some(to)).await?;
        match (&old.wireframe, &new.wireframe) {
            (Some(a), Some(b)) => Ok(diff(a, b)),
            _ => Err(EngineError::Gone),
        }
    }

    /// Apply the retention policy: keep the newest `retention_window`
    /// versions plus version 1 intact, strip the bodies of the rest.
    ///
    /// Returns the number of bodies discarded. Safe against concurrent
    /// readers; the caller holds the per-session lock against writers.
    pub async fn compact(&self, session_id: &str) -> Result<usize, EngineError> {
        let versions = self.store.list_versions(session_id).await?;
        if versions.len() <= self.retention_window {
            return Ok(0);
        }

        let record = self.store.get_metadata(session_id).await?;
        let keep_from = versions[versions.len() - self.retention_window];

        let mut stripped = 0;
        for version in versions {
            if version == 1 || version == record.current_version || version >= keep_from {
                continue;
            }
            let state = self.store.get_state(session_id, Some(version)).await?;
            if state.is_compacted() {
                continue;
            }
            self.store.compact_state(session_id, version).await?;
            stripped += 1;
        }

        if stripped > 0 {
            tracing::info!(
                session_id = %session_id,
                stripped,
                "compacted version bodies"
            );
        }
        Ok(stripped)
    }

    /// Derive session metrics from metadata and the context ring.
    pub async fn metrics(&self, session_id: &str) -> Result<SessionMetrics, EngineError> {
        let record = self.store.get_metadata(session_id).await?;
        let ring = self.store.read_context(session_id, CONTEXT_WINDOW).await?;
        Ok(wireframe_core::metrics::derive(&record, &ring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wireframe_core::EditType;
    use wireframe_store::MemoryStore;

    fn manager() -> (VersionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(3600)));
        (VersionManager::new(store.clone(), 20), store)
    }

    fn metadata(prompt: &str, parent: Option<u64>) -> VersionMetadata {
        VersionMetadata {
            prompt: prompt.to_string(),
            edit_type: EditType::Modify,
            processing_ms: 10,
            parent_version: parent,
            change_summary: None,
        }
    }

    fn doc(name: &str) -> WireframeNode {
        WireframeNode::new("frame", name)
    }

    async fn seeded() -> (VersionManager, Arc<MemoryStore>) {
        let (versions, store) = manager();
        versions
            .create_initial(
                SessionRecord::new("s-1", None, "login form"),
                doc("Root"),
                metadata("login form", None),
            )
            .await
            .unwrap();
        (versions, store)
    }

    #[tokio::test]
    async fn test_create_initial_rejects_existing_session() {
        let (versions, _) = seeded().await;
        let err = versions
            .create_initial(
                SessionRecord::new("s-1", None, "again"),
                doc("Root"),
                metadata("again", None),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict));
    }

    #[tokio::test]
    async fn test_create_next_advances_metadata() {
        let (versions, store) = seeded().await;

        let v = versions
            .create_next("s-1", 1, doc("Root"), metadata("edit", Some(1)))
            .await
            .unwrap();
        assert_eq!(v, 2);
        assert_eq!(store.get_metadata("s-1").await.unwrap().current_version, 2);
    }

    #[tokio::test]
    async fn test_create_next_with_stale_expectation_conflicts_and_rolls_back() {
        let (versions, store) = seeded().await;
        versions
            .create_next("s-1", 1, doc("Root"), metadata("edit", Some(1)))
            .await
            .unwrap();

        let err = versions
            .create_next("s-1", 1, doc("Root"), metadata("stale", Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict));

        // No orphan state and no gap: versions are exactly {1, 2}.
        assert_eq!(store.list_versions("s-1").await.unwrap(), vec![1, 2]);
        assert_eq!(store.get_metadata("s-1").await.unwrap().current_version, 2);
    }

    #[tokio::test]
    async fn test_compact_preserves_first_and_current() {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(3600)));
        let versions = VersionManager::new(store.clone(), 5);
        versions
            .create_initial(
                SessionRecord::new("s-1", None, "login form"),
                doc("Root"),
                metadata("login form", None),
            )
            .await
            .unwrap();
        for v in 1..=9 {
            versions
                .create_next("s-1", v, doc("Root"), metadata("edit", Some(v)))
                .await
                .unwrap();
        }

        // 10 versions, window 5: keep 6..=10 plus version 1.
        let stripped = versions.compact("s-1").await.unwrap();
        assert_eq!(stripped, 4);

        for v in [1u64, 6, 7, 8, 9, 10] {
            assert!(!store.get_state("s-1", Some(v)).await.unwrap().is_compacted());
        }
        for v in [2u64, 3, 4, 5] {
            let state = store.get_state("s-1", Some(v)).await.unwrap();
            assert!(state.is_compacted());
            assert_eq!(state.metadata.prompt, "edit");
        }

        // Idempotent.
        assert_eq!(versions.compact("s-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_diff_on_compacted_version_reports_gone() {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(3600)));
        let versions = VersionManager::new(store.clone(), 2);
        versions
            .create_initial(
                SessionRecord::new("s-1", None, "login form"),
                doc("Root"),
                metadata("login form", None),
            )
            .await
            .unwrap();
        for v in 1..=4 {
            versions
                .create_next("s-1", v, doc("Root"), metadata("edit", Some(v)))
                .await
                .unwrap();
        }
        versions.compact("s-1").await.unwrap();

        let err = versions.diff("s-1", 2, 5).await.unwrap_err();
        assert!(matches!(err, EngineError::Gone));
        assert!(versions.diff("s-1", 1, 5).await.is_ok());
    }
}
