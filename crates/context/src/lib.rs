//! Context engine
//!
//! Interprets edit prompts against the current document and the recent
//! interaction history:
//! - Deterministic edit-intent classification (keyword tables)
//! - Anaphoric reference resolution ("it", "the button", "the button in
//!   the header")
//! - Augmented prompt construction for the model adapter
//!
//! [`classify`] and [`resolve_references`] are pure functions: identical
//! inputs always produce identical outputs.

pub mod classify;
pub mod prompt;
pub mod resolve;

pub use classify::classify;
pub use prompt::PromptBuilder;
pub use resolve::{resolve_references, CandidateNode, Resolution, MAX_CANDIDATES};
