//! Session records and lifecycle states

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a design session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting edits.
    #[default]
    Active,
    /// Closed by the client; reclaimed at TTL.
    Completed,
    /// TTL elapsed; pending removal by the janitor.
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persistent metadata for one design session.
///
/// `current_version` always equals the highest committed version for the
/// session and only moves forward, one step at a time, through the version
/// manager's compare-and-swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque URL-safe identifier.
    pub session_id: String,
    /// Owning user, if not anonymous.
    pub user_id: Option<String>,
    /// The prompt that created the session.
    pub initial_prompt: String,
    /// Highest committed version.
    pub current_version: u64,
    /// Creation timestamp (UTC).
    pub created_at: DateTime<Utc>,
    /// Last successful write (UTC); drives TTL.
    pub last_activity: DateTime<Utc>,
    /// Lifecycle state.
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Create the record for a freshly created session at version 1.
    pub fn new(
        session_id: impl Into<String>,
        user_id: Option<String>,
        initial_prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id,
            initial_prompt: initial_prompt.into(),
            current_version: 1,
            created_at: now,
            last_activity: now,
            status: SessionStatus::Active,
        }
    }

    /// Refresh the activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether the TTL has elapsed since the last activity.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.last_activity > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_active_at_version_one() {
        let record = SessionRecord::new("s-1", None, "login form");
        assert_eq!(record.current_version, 1);
        assert_eq!(record.status, SessionStatus::Active);
        assert!(!record.is_expired(Duration::hours(24)));
    }

    #[test]
    fn test_touch_advances_last_activity() {
        let mut record = SessionRecord::new("s-1", Some("u-9".into()), "login form");
        let before = record.last_activity;
        std::thread::sleep(std::time::Duration::from_millis(5));
        record.touch();
        assert!(record.last_activity > before);
        assert_eq!(record.created_at, record.created_at);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
