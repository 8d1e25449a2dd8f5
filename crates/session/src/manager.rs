//! Session manager
//!
//! Public entry point for the engine. Write paths run under a per-session
//! advisory lock with a bounded acquisition timeout; read paths rely on the
//! store's snapshot consistency instead. Within a session, edits are
//! totally ordered and produce strictly monotonic, gap-free versions.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use wireframe_config::EngineConfig;
use wireframe_context::{classify, resolve_references, CandidateNode, PromptBuilder, Resolution};
use wireframe_core::{
    diff, ChangeSummary, EditContext, EditType, SessionMetrics, SessionRecord, SessionStatus,
    VersionMetadata, WireframeNode,
};
use wireframe_llm::WireframeGenerator;
use wireframe_store::{StateStore, StoreError};

use crate::version::VersionManager;
use crate::EngineError;

/// How many fresh ids are tried when session creation collides.
const CREATE_ID_ATTEMPTS: usize = 3;

/// Result of a successful session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResult {
    pub session_id: String,
    pub wireframe: WireframeNode,
    pub version: u64,
    pub processing_ms: u64,
}

/// Result of a committed edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResult {
    pub session_id: String,
    pub version: u64,
    pub wireframe: WireframeNode,
    pub changes_summary: ChangeSummary,
    pub processing_ms: u64,
}

/// An edit either commits or declines with candidate referents.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Applied(EditResult),
    NeedsClarification(Vec<CandidateNode>),
}

/// One entry of the version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u64,
    pub metadata: VersionMetadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A single fetched version; `wireframe` is `None` once compacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionView {
    pub version: u64,
    pub metadata: VersionMetadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub wireframe: Option<WireframeNode>,
}

/// Metadata plus the current document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub metadata: SessionRecord,
    pub wireframe: WireframeNode,
}

/// Orchestrates create / edit / history / cleanup for all sessions.
pub struct SessionManager {
    store: Arc<dyn StateStore>,
    versions: VersionManager,
    generator: Arc<WireframeGenerator>,
    config: EngineConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
    quarantined: DashMap<String, String>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn StateStore>,
        generator: Arc<WireframeGenerator>,
        config: EngineConfig,
    ) -> Self {
        let versions = VersionManager::new(store.clone(), config.retention_window);
        Self {
            store,
            versions,
            generator,
            config,
            locks: DashMap::new(),
            quarantined: DashMap::new(),
        }
    }

    pub fn version_manager(&self) -> &VersionManager {
        &self.versions
    }

    /// Create a session from an initial prompt.
    ///
    /// Generates the initial wireframe, persists version 1 and records the
    /// implicit creation entry in the context ring. An id collision retries
    /// with a fresh id instead of failing.
    pub async fn create_session(
        &self,
        user_id: Option<String>,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<CreateResult, EngineError> {
        let start = tokio::time::Instant::now();

        let built = PromptBuilder::initial(prompt);
        let wireframe = self.generator.generate(&built, cancel).await?;
        let processing_ms = start.elapsed().as_millis() as u64;

        for _ in 0..CREATE_ID_ATTEMPTS {
            let session_id = Uuid::new_v4().to_string();
            let lock = self.lock_for(&session_id);
            let _guard = lock.lock_owned().await;

            let record = SessionRecord::new(&session_id, user_id.clone(), prompt);
            let metadata = VersionMetadata {
                prompt: prompt.to_string(),
                edit_type: EditType::Modify,
                processing_ms,
                parent_version: None,
                change_summary: None,
            };

            match self
                .versions
                .create_initial(record, wireframe.clone(), metadata)
                .await
            {
                Ok(version) => {
                    let entry = EditContext::new(
                        prompt,
                        EditType::Modify,
                        vec![wireframe.component_name.clone()],
                        processing_ms,
                        version,
                    );
                    if let Err(e) = self.store.append_context(&session_id, entry).await {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "failed to record creation context entry"
                        );
                    }
                    self.bump("sessions_created").await;

                    return Ok(CreateResult {
                        session_id,
                        wireframe,
                        version,
                        processing_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Err(EngineError::Conflict) => {
                    tracing::warn!(session_id = %session_id, "session id collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::Conflict)
    }

    /// Apply one natural-language edit to a session.
    ///
    /// The end-to-end budget covers everything up to the commit; once the
    /// new version is committed the result is returned even if the budget
    /// or the cancellation signal has since fired.
    pub async fn apply_edit(
        &self,
        session_id: &str,
        edit_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<EditOutcome, EngineError> {
        let start = tokio::time::Instant::now();

        if let Some(reason) = self.quarantined.get(session_id) {
            return Err(EngineError::Quarantined(reason.clone()));
        }

        let lock = self.lock_for(session_id);
        let _guard = tokio::time::timeout(self.config.lock_timeout(), lock.lock_owned())
            .await
            .map_err(|_| EngineError::Busy)?;

        let snapshot = match self.store.read_snapshot(session_id).await {
            Ok(snapshot) => snapshot,
            Err(StoreError::Integrity(msg)) => {
                self.quarantine(session_id, &msg);
                return Err(EngineError::Quarantined(msg));
            }
            Err(e) => return Err(e.into()),
        };

        if snapshot.metadata.status != SessionStatus::Active {
            return Err(EngineError::Conflict);
        }
        let Some(current_wireframe) = snapshot.current_state.wireframe.clone() else {
            let msg = format!(
                "current version {} has a compacted body",
                snapshot.current_state.version
            );
            self.quarantine(session_id, &msg);
            return Err(EngineError::Quarantined(msg));
        };

        let edit_type = classify(edit_prompt);
        let targets = match resolve_references(
            edit_prompt,
            edit_type,
            &current_wireframe,
            &snapshot.context,
        ) {
            Resolution::Targets(targets) => targets,
            Resolution::NeedsClarification(candidates) => {
                self.bump("clarifications_requested").await;
                tracing::info!(
                    session_id = %session_id,
                    edit_type = %edit_type,
                    candidates = candidates.len(),
                    "edit needs clarification"
                );
                return Ok(EditOutcome::NeedsClarification(candidates));
            }
        };

        let built =
            PromptBuilder::edit(edit_prompt, &current_wireframe, &snapshot.context, &targets);

        let Some(remaining) = self.remaining_budget(start) else {
            self.bump("edits_failed").await;
            return Err(EngineError::Timeout);
        };
        let new_wireframe =
            match tokio::time::timeout(remaining, self.generator.generate(&built, cancel)).await {
                Err(_) => {
                    self.bump("edits_failed").await;
                    return Err(EngineError::Timeout);
                }
                Ok(Err(e)) => {
                    self.bump("edits_failed").await;
                    return Err(e.into());
                }
                Ok(Ok(wireframe)) => wireframe,
            };

        // Budget check before the commit; after this point the commit runs
        // to completion and cancellation is ignored.
        if self.remaining_budget(start).is_none() {
            self.bump("edits_failed").await;
            return Err(EngineError::Timeout);
        }

        let committed = self
            .commit(
                session_id,
                edit_prompt,
                edit_type,
                &snapshot.metadata,
                &current_wireframe,
                new_wireframe,
                start,
            )
            .await;
        let (version, wireframe, summary) = match committed {
            Ok(committed) => committed,
            Err(e) => {
                self.bump("edits_failed").await;
                return Err(e);
            }
        };

        let processing_ms = start.elapsed().as_millis() as u64;
        let entry = EditContext::new(edit_prompt, edit_type, targets, processing_ms, version);
        if let Err(e) = self.store.append_context(session_id, entry).await {
            tracing::warn!(session_id = %session_id, error = %e, "failed to append context entry");
        }
        self.bump("edits_applied").await;

        // Inline retention pass keeps history bounded without waiting for
        // the janitor.
        if let Err(e) = self.versions.compact(session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "inline compaction failed");
        }

        tracing::info!(
            session_id = %session_id,
            version,
            edit_type = %edit_type,
            processing_ms,
            "edit committed"
        );

        Ok(EditOutcome::Applied(EditResult {
            session_id: session_id.to_string(),
            version,
            wireframe,
            changes_summary: summary,
            processing_ms,
        }))
    }

    /// Commit the generated document, retrying a lost CAS once against the
    /// reloaded state before surfacing the conflict.
    #[allow(clippy::too_many_arguments)]
    async fn commit(
        &self,
        session_id: &str,
        edit_prompt: &str,
        edit_type: EditType,
        metadata: &SessionRecord,
        parent_wireframe: &WireframeNode,
        new_wireframe: WireframeNode,
        start: tokio::time::Instant,
    ) -> Result<(u64, WireframeNode, ChangeSummary), EngineError> {
        let mut expected = metadata.current_version;
        let mut parent = parent_wireframe.clone();

        for attempt in 0..2 {
            let summary = diff(&parent, &new_wireframe);
            let version_metadata = VersionMetadata {
                prompt: edit_prompt.to_string(),
                edit_type,
                processing_ms: start.elapsed().as_millis() as u64,
                parent_version: Some(expected),
                change_summary: Some(summary.clone()),
            };

            match self
                .versions
                .create_next(session_id, expected, new_wireframe.clone(), version_metadata)
                .await
            {
                Ok(version) => return Ok((version, new_wireframe, summary)),
                Err(EngineError::Conflict) if attempt == 0 => {
                    tracing::warn!(
                        session_id = %session_id,
                        expected,
                        "commit conflict, retrying against reloaded state"
                    );
                    let snapshot = self.store.read_snapshot(session_id).await?;
                    expected = snapshot.metadata.current_version;
                    match snapshot.current_state.wireframe.clone() {
                        Some(wireframe) => parent = wireframe,
                        None => return Err(EngineError::Conflict),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::Conflict)
    }

    /// Version list with metadata and stored change summaries. Read-only;
    /// does not take the session lock.
    pub async fn get_history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, EngineError> {
        let versions = self.store.list_versions(session_id).await?;
        let mut entries = Vec::with_capacity(versions.len());
        for version in versions {
            let state = self.store.get_state(session_id, Some(version)).await?;
            entries.push(HistoryEntry {
                version: state.version,
                metadata: state.metadata.clone(),
                created_at: state.created_at,
            });
        }
        Ok(entries)
    }

    /// Fetch one version. A compacted version is returned with its metadata
    /// and no body; the caller decides how to surface the gone marker.
    pub async fn get_version(
        &self,
        session_id: &str,
        version: u64,
    ) -> Result<VersionView, EngineError> {
        let state = self.store.get_state(session_id, Some(version)).await?;
        Ok(VersionView {
            version: state.version,
            metadata: state.metadata.clone(),
            created_at: state.created_at,
            wireframe: state.wireframe.clone(),
        })
    }

    /// Metadata plus the current document.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionView, EngineError> {
        let snapshot = self.store.read_snapshot(session_id).await?;
        let Some(wireframe) = snapshot.current_state.wireframe.clone() else {
            return Err(EngineError::Quarantined(format!(
                "current version {} has a compacted body",
                snapshot.current_state.version
            )));
        };
        Ok(SessionView {
            metadata: snapshot.metadata,
            wireframe,
        })
    }

    /// Derived metrics for one session.
    pub async fn metrics(&self, session_id: &str) -> Result<SessionMetrics, EngineError> {
        self.versions.metrics(session_id).await
    }

    /// Mark a session completed. The janitor reclaims it at TTL.
    pub async fn close_session(&self, session_id: &str) -> Result<(), EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = tokio::time::timeout(self.config.lock_timeout(), lock.lock_owned())
            .await
            .map_err(|_| EngineError::Busy)?;

        let mut record = self.store.get_metadata(session_id).await?;
        if record.status == SessionStatus::Completed {
            return Ok(());
        }
        let expected = record.current_version;
        record.status = SessionStatus::Completed;
        record.touch();
        self.store
            .compare_and_swap_metadata(session_id, expected, record)
            .await?;
        tracing::info!(session_id = %session_id, "session completed");
        Ok(())
    }

    /// Janitor entry: expire sessions whose TTL elapsed. Returns how many
    /// were removed.
    pub async fn sweep_expired(&self) -> Result<usize, EngineError> {
        let ttl = chrono::Duration::from_std(self.config.session_ttl())
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut removed = 0;

        for session_id in self.store.list_sessions().await? {
            match self.store.get_metadata(&session_id).await {
                Ok(record) if record.is_expired(ttl) => {
                    self.store.expire_session(&session_id).await?;
                    self.forget(&session_id);
                    self.bump("sessions_expired").await;
                    removed += 1;
                }
                // Lazy TTL eviction already dropped the bucket.
                Err(StoreError::NotFound) => {
                    self.forget(&session_id);
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Janitor entry: compact sessions past the retention window. The
    /// per-session lock is held per compaction, never across sessions.
    pub async fn compact_overflow(&self) -> Result<usize, EngineError> {
        let mut stripped_total = 0;

        for session_id in self.store.list_sessions().await? {
            let versions = match self.store.list_versions(&session_id).await {
                Ok(versions) => versions,
                Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };
            if versions.len() <= self.config.retention_window {
                continue;
            }

            let lock = self.lock_for(&session_id);
            let Ok(_guard) =
                tokio::time::timeout(Duration::from_millis(100), lock.lock_owned()).await
            else {
                // A writer holds the session; the next sweep catches it.
                continue;
            };
            match self.versions.compact(&session_id).await {
                Ok(stripped) => {
                    stripped_total += stripped;
                    if stripped > 0 {
                        self.bump("versions_compacted").await;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "compaction failed")
                }
            }
        }
        Ok(stripped_total)
    }

    /// Number of live sessions, for gauge reporting.
    pub async fn session_count(&self) -> usize {
        self.store.list_sessions().await.map(|s| s.len()).unwrap_or(0)
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn quarantine(&self, session_id: &str, reason: &str) {
        tracing::error!(
            session_id = %session_id,
            reason = %reason,
            "integrity violation, quarantining session"
        );
        self.quarantined
            .insert(session_id.to_string(), reason.to_string());
    }

    fn forget(&self, session_id: &str) {
        self.locks.remove(session_id);
        self.quarantined.remove(session_id);
    }

    fn remaining_budget(&self, start: tokio::time::Instant) -> Option<Duration> {
        let elapsed = start.elapsed();
        let budget = self.config.edit_budget();
        if elapsed >= budget {
            None
        } else {
            Some(budget - elapsed)
        }
    }

    async fn bump(&self, event: &'static str) {
        metrics::counter!("wireframe_engine_events", "event" => event).increment(1);
        let bucket = format!("{}:{}", chrono::Utc::now().format("%Y-%m-%d"), event);
        if let Err(e) = self.store.increment_counter(&bucket, 1).await {
            tracing::debug!(error = %e, bucket = %bucket, "counter bump failed");
        }
    }
}
