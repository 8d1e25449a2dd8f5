//! Core types for the wireframe design session engine
//!
//! This crate provides the foundational types used across all other crates:
//! - The opaque wireframe document tree with its addressable fields
//! - Session, version and context-ring records
//! - Structural diffing and derived session metrics

pub mod context;
pub mod diff;
pub mod document;
pub mod metrics;
pub mod session;
pub mod version;

pub use context::{EditContext, EditType, CONTEXT_WINDOW};
pub use diff::{diff, ChangeSummary};
pub use document::{sanitize, DocumentError, WireframeNode, MAX_DEPTH, MAX_NODES, NODE_TYPES};
pub use metrics::SessionMetrics;
pub use session::{SessionRecord, SessionStatus};
pub use version::{VersionMetadata, VersionRecord};
