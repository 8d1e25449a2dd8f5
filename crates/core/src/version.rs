//! Versioned design states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::EditType;
use crate::diff::ChangeSummary;
use crate::document::WireframeNode;

/// Metadata attached to every committed version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// The prompt that produced this version.
    pub prompt: String,
    /// Classified intent of the producing edit.
    pub edit_type: EditType,
    /// End-to-end processing time of the producing operation.
    pub processing_ms: u64,
    /// The version this one was derived from; `None` for version 1.
    pub parent_version: Option<u64>,
    /// Structural diff against the parent, computed at commit time so it
    /// remains queryable after the wireframe body is compacted away.
    pub change_summary: Option<ChangeSummary>,
}

/// One immutable version of a session's design document.
///
/// Written exactly once. Compaction may later discard the `wireframe` body,
/// leaving the metadata in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Version number, starting at 1.
    pub version: u64,
    /// The document body; `None` once compacted.
    pub wireframe: Option<WireframeNode>,
    /// Commit metadata.
    pub metadata: VersionMetadata,
    /// When the version was committed.
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(version: u64, wireframe: WireframeNode, metadata: VersionMetadata) -> Self {
        Self {
            version,
            wireframe: Some(wireframe),
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Whether the body has been discarded by compaction.
    pub fn is_compacted(&self) -> bool {
        self.wireframe.is_none()
    }
}
