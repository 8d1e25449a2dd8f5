//! Edit intents and the per-session context ring entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity of the per-session context ring. Fixed by contract.
pub const CONTEXT_WINDOW: usize = 10;

/// Coarse classification of an edit prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    /// Generic mutation; the default when no other intent is detected.
    Modify,
    /// Introduces new nodes.
    Add,
    /// Deletes existing nodes.
    Remove,
    /// Visual changes: colours, sizes, typography.
    Style,
    /// Structural arrangement: position, alignment, spacing.
    Layout,
}

impl EditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditType::Modify => "modify",
            EditType::Add => "add",
            EditType::Remove => "remove",
            EditType::Style => "style",
            EditType::Layout => "layout",
        }
    }

    /// Edit types that act on an existing node and therefore need a
    /// resolvable referent.
    pub fn requires_target(&self) -> bool {
        matches!(self, EditType::Modify | EditType::Remove | EditType::Style)
    }
}

impl std::fmt::Display for EditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One committed edit as remembered by the context ring.
///
/// Targets are stored as `componentName` identifiers, never as pointers
/// into a document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditContext {
    /// The user's edit prompt, verbatim.
    pub prompt: String,
    /// Classified intent.
    pub edit_type: EditType,
    /// Component identifiers the edit was resolved against.
    pub target_elements: Vec<String>,
    /// When the edit committed.
    pub timestamp: DateTime<Utc>,
    /// End-to-end processing time for the edit.
    pub processing_ms: u64,
    /// The version the edit produced.
    pub result_version: u64,
}

impl EditContext {
    pub fn new(
        prompt: impl Into<String>,
        edit_type: EditType,
        target_elements: Vec<String>,
        processing_ms: u64,
        result_version: u64,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            edit_type,
            target_elements,
            timestamp: Utc::now(),
            processing_ms,
            result_version,
        }
    }
}
