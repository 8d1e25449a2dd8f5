//! In-memory state store
//!
//! Default backend: one DashMap bucket per session holding metadata, the
//! version map and the context ring, so every session-scoped operation is
//! atomic under the bucket guard. TTL is enforced lazily on access; the
//! janitor sweep removes expired buckets for good.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use wireframe_core::{EditContext, SessionRecord, VersionRecord, CONTEXT_WINDOW};

use crate::store::{SessionSnapshot, StateStore};
use crate::StoreError;

struct SessionBucket {
    metadata: SessionRecord,
    states: BTreeMap<u64, Arc<VersionRecord>>,
    context: VecDeque<EditContext>,
    expires_at: DateTime<Utc>,
}

/// In-process store backend.
pub struct MemoryStore {
    sessions: DashMap<String, SessionBucket>,
    user_index: DashMap<String, Vec<String>>,
    counters: DashMap<String, u64>,
    ttl: Duration,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create a store whose session keys expire `ttl` after last activity.
    pub fn new(ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(24));
        Self {
            sessions: DashMap::new(),
            user_index: DashMap::new(),
            counters: DashMap::new(),
            ttl,
            available: AtomicBool::new(true),
        }
    }

    /// Toggle the degraded mode: while unavailable, every operation fails
    /// with [`StoreError::Unavailable`] and nothing falls back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if !available {
            tracing::warn!("memory store switched to unavailable mode");
        }
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    /// Drop the bucket if its TTL elapsed, then report whether it is live.
    fn evict_if_expired(&self, session_id: &str) {
        let now = Utc::now();
        let removed = self
            .sessions
            .remove_if(session_id, |_, bucket| bucket.expires_at <= now);
        if let Some((id, bucket)) = removed {
            self.unindex(&bucket.metadata);
            tracing::debug!(session_id = %id, "evicted expired session");
        }
    }

    fn unindex(&self, metadata: &SessionRecord) {
        if let Some(user_id) = &metadata.user_id {
            if let Some(mut ids) = self.user_index.get_mut(user_id) {
                ids.retain(|id| id != &metadata.session_id);
            }
        }
    }

    fn with_bucket<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionBucket) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.evict_if_expired(session_id);
        let mut bucket = self.sessions.get_mut(session_id).ok_or(StoreError::NotFound)?;
        f(&mut bucket)
    }

    fn fresh_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.ttl
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn put_state(&self, session_id: &str, record: VersionRecord) -> Result<(), StoreError> {
        self.ensure_available()?;
        let expires_at = self.fresh_expiry();
        self.with_bucket(session_id, |bucket| {
            if bucket.states.contains_key(&record.version) {
                return Err(StoreError::Conflict(format!(
                    "version {} already exists",
                    record.version
                )));
            }
            bucket.states.insert(record.version, Arc::new(record));
            bucket.expires_at = expires_at;
            Ok(())
        })
    }

    async fn delete_state(&self, session_id: &str, version: u64) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.with_bucket(session_id, |bucket| {
            bucket.states.remove(&version).ok_or(StoreError::NotFound)?;
            Ok(())
        })
    }

    async fn compact_state(&self, session_id: &str, version: u64) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.with_bucket(session_id, |bucket| {
            let record = bucket.states.get(&version).ok_or(StoreError::NotFound)?;
            if record.is_compacted() {
                return Ok(());
            }
            let mut stripped = (**record).clone();
            stripped.wireframe = None;
            bucket.states.insert(version, Arc::new(stripped));
            Ok(())
        })
    }

    async fn get_state(
        &self,
        session_id: &str,
        version: Option<u64>,
    ) -> Result<Arc<VersionRecord>, StoreError> {
        self.ensure_available()?;
        self.evict_if_expired(session_id);
        let bucket = self.sessions.get(session_id).ok_or(StoreError::NotFound)?;
        let record = match version {
            Some(v) => bucket.states.get(&v),
            None => bucket.states.values().next_back(),
        };
        record.cloned().ok_or(StoreError::NotFound)
    }

    async fn list_versions(&self, session_id: &str) -> Result<Vec<u64>, StoreError> {
        self.ensure_available()?;
        self.evict_if_expired(session_id);
        let bucket = self.sessions.get(session_id).ok_or(StoreError::NotFound)?;
        Ok(bucket.states.keys().copied().collect())
    }

    async fn get_metadata(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        self.ensure_available()?;
        self.evict_if_expired(session_id);
        let bucket = self.sessions.get(session_id).ok_or(StoreError::NotFound)?;
        Ok(bucket.metadata.clone())
    }

    async fn put_metadata(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.ensure_available()?;
        let session_id = record.session_id.clone();
        let expires_at = record.last_activity + self.ttl;

        if let Some(user_id) = &record.user_id {
            let mut ids = self.user_index.entry(user_id.clone()).or_default();
            if !ids.contains(&session_id) {
                ids.push(session_id.clone());
            }
        }

        match self.sessions.get_mut(&session_id) {
            Some(mut bucket) => {
                bucket.metadata = record;
                bucket.expires_at = expires_at;
            }
            None => {
                self.sessions.insert(
                    session_id,
                    SessionBucket {
                        metadata: record,
                        states: BTreeMap::new(),
                        context: VecDeque::with_capacity(CONTEXT_WINDOW),
                        expires_at,
                    },
                );
            }
        }
        Ok(())
    }

    async fn compare_and_swap_metadata(
        &self,
        session_id: &str,
        expected_version: u64,
        record: SessionRecord,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        let expires_at = record.last_activity + self.ttl;
        self.with_bucket(session_id, |bucket| {
            if bucket.metadata.current_version != expected_version {
                return Err(StoreError::Conflict(format!(
                    "expected version {}, found {}",
                    expected_version, bucket.metadata.current_version
                )));
            }
            bucket.metadata = record;
            bucket.expires_at = expires_at;
            Ok(())
        })
    }

    async fn append_context(&self, session_id: &str, entry: EditContext) -> Result<(), StoreError> {
        self.ensure_available()?;
        let expires_at = self.fresh_expiry();
        self.with_bucket(session_id, |bucket| {
            bucket.context.push_back(entry);
            while bucket.context.len() > CONTEXT_WINDOW {
                bucket.context.pop_front();
            }
            bucket.expires_at = expires_at;
            Ok(())
        })
    }

    async fn read_context(&self, session_id: &str, n: usize) -> Result<Vec<EditContext>, StoreError> {
        self.ensure_available()?;
        self.evict_if_expired(session_id);
        let bucket = self.sessions.get(session_id).ok_or(StoreError::NotFound)?;
        let skip = bucket.context.len().saturating_sub(n.min(CONTEXT_WINDOW));
        Ok(bucket.context.iter().skip(skip).cloned().collect())
    }

    async fn read_snapshot(&self, session_id: &str) -> Result<SessionSnapshot, StoreError> {
        self.ensure_available()?;
        self.evict_if_expired(session_id);
        let bucket = self.sessions.get(session_id).ok_or(StoreError::NotFound)?;
        let current = bucket.metadata.current_version;
        let current_state = bucket.states.get(&current).cloned().ok_or_else(|| {
            StoreError::Integrity(format!(
                "current_version {} has no stored state",
                current
            ))
        })?;
        Ok(SessionSnapshot {
            metadata: bucket.metadata.clone(),
            current_state,
            context: bucket.context.iter().cloned().collect(),
        })
    }

    async fn increment_counter(&self, bucket: &str, delta: u64) -> Result<(), StoreError> {
        self.ensure_available()?;
        *self.counters.entry(bucket.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn counter(&self, bucket: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        Ok(self.counters.get(bucket).map(|c| *c).unwrap_or(0))
    }

    async fn expire_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        if let Some((_, bucket)) = self.sessions.remove(session_id) {
            self.unindex(&bucket.metadata);
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        Ok(self.sessions.iter().map(|e| e.key().clone()).collect())
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .user_index
            .get(user_id)
            .map(|ids| ids.clone())
            .unwrap_or_default())
    }
}
