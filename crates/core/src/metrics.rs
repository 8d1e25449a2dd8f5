//! Derived per-session metrics
//!
//! Nothing here is stored; metrics are computed on demand from the session
//! record and the context ring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::EditContext;
use crate::session::SessionRecord;

/// Aggregate view of a session's activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Committed edits (excludes the creating generation).
    pub total_edits: u64,
    /// Wall-clock session age at derivation time.
    pub duration_secs: i64,
    /// Edit count per intent over the retained context window.
    pub edit_type_counts: BTreeMap<String, u64>,
    /// Mean processing time over the retained context window.
    pub avg_processing_ms: f64,
}

/// Derive metrics from a session record and its context ring.
pub fn derive(record: &SessionRecord, ring: &[EditContext]) -> SessionMetrics {
    let mut edit_type_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut processing_total = 0u64;
    let mut processing_samples = 0u64;

    for entry in ring {
        // The creation entry records provenance, not an edit.
        if entry.result_version == 1 {
            continue;
        }
        *edit_type_counts
            .entry(entry.edit_type.as_str().to_string())
            .or_insert(0) += 1;
        processing_total += entry.processing_ms;
        processing_samples += 1;
    }

    let avg_processing_ms = if processing_samples > 0 {
        processing_total as f64 / processing_samples as f64
    } else {
        0.0
    };

    SessionMetrics {
        total_edits: record.current_version.saturating_sub(1),
        duration_secs: (record.last_activity - record.created_at).num_seconds(),
        edit_type_counts,
        avg_processing_ms,
    }
}
