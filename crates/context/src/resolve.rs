//! Anaphoric reference resolution
//!
//! Resolves "it", "the button", "the button in the header" against the
//! current document and the context ring. Targets are `componentName`
//! identifiers. Tie-breaking is normative:
//!
//! - Pronouns anchor on the most recent context entry that records a real
//!   edit. The implicit creation entry is provenance, not an edit, and is
//!   skipped.
//! - Typed references search the newest ring entry first, then walk the
//!   ring backwards, then fall back to a structural search where the last
//!   matching node in pre-order wins (documents grow by appending).
//! - A prompt with no referring expression targets the root.
//!
//! When a referring expression cannot be resolved and the edit type needs a
//! target, resolution declines with up to [`MAX_CANDIDATES`] candidates,
//! newest first, and the model must not be invoked.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use wireframe_core::{EditContext, EditType, WireframeNode, NODE_TYPES};

/// Maximum number of clarification candidates returned.
pub const MAX_CANDIDATES: usize = 5;

static PRONOUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(it|this|that|them)\b").unwrap());

static TYPED_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bthe\s+([a-z]+)(?:\s+in\s+(?:the\s+)?([a-z0-9_-]+))?").unwrap()
});

/// A node offered to the user when resolution declines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateNode {
    pub component_name: String,
    pub node_type: String,
}

impl CandidateNode {
    fn from_node(node: &WireframeNode) -> Self {
        Self {
            component_name: node.component_name.clone(),
            node_type: node.node_type.clone(),
        }
    }
}

/// Outcome of reference resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Component identifiers the edit applies to.
    Targets(Vec<String>),
    /// The prompt needs a referent that could not be found.
    NeedsClarification(Vec<CandidateNode>),
}

/// Resolve the referring expressions in an edit prompt.
///
/// `ring` is ordered oldest to newest, as the store returns it. Pure
/// function; identical inputs produce identical outputs.
pub fn resolve_references(
    prompt: &str,
    edit_type: EditType,
    wireframe: &WireframeNode,
    ring: &[EditContext],
) -> Resolution {
    if let Some((node_type, region)) = typed_reference(prompt) {
        if let Some(name) = resolve_typed(&node_type, region.as_deref(), wireframe, ring) {
            return Resolution::Targets(vec![name]);
        }
        return unresolved(edit_type, wireframe);
    }

    if PRONOUN_RE.is_match(prompt) {
        if let Some(targets) = resolve_pronoun(wireframe, ring) {
            return Resolution::Targets(targets);
        }
        return unresolved(edit_type, wireframe);
    }

    // No referring expression: a document-level edit against the root.
    Resolution::Targets(vec![wireframe.component_name.clone()])
}

/// First "the <type>" phrase whose type is on the allowlist, with the
/// optional "in <region>" narrowing word.
fn typed_reference(prompt: &str) -> Option<(String, Option<String>)> {
    for captures in TYPED_REF_RE.captures_iter(prompt) {
        let word = captures.get(1)?.as_str().to_lowercase();
        if NODE_TYPES.contains(&word.as_str()) {
            let region = captures.get(2).map(|m| m.as_str().to_lowercase());
            return Some((word, region));
        }
    }
    None
}

fn resolve_typed(
    node_type: &str,
    region: Option<&str>,
    wireframe: &WireframeNode,
    ring: &[EditContext],
) -> Option<String> {
    if let Some(region) = region {
        return wireframe
            .last_of_type_within(node_type, region)
            .map(|n| n.component_name.clone());
    }

    // Newest ring entry first, then backwards through the ring.
    for entry in ring.iter().rev() {
        for target in &entry.target_elements {
            if let Some(node) = wireframe.find_by_name(target) {
                if node.is_type(node_type) {
                    return Some(node.component_name.clone());
                }
            }
        }
    }

    // Structural fallback: the newest (last in pre-order) matching node.
    wireframe
        .last_of_type(node_type)
        .map(|n| n.component_name.clone())
}

fn resolve_pronoun(wireframe: &WireframeNode, ring: &[EditContext]) -> Option<Vec<String>> {
    let anchor = ring.iter().rev().find(|entry| entry.result_version != 1)?;
    let present: Vec<String> = anchor
        .target_elements
        .iter()
        .filter(|name| wireframe.find_by_name(name).is_some())
        .cloned()
        .collect();
    if present.is_empty() {
        None
    } else {
        Some(present)
    }
}

fn unresolved(edit_type: EditType, wireframe: &WireframeNode) -> Resolution {
    if edit_type.requires_target() {
        Resolution::NeedsClarification(candidates(wireframe))
    } else {
        Resolution::Targets(vec![wireframe.component_name.clone()])
    }
}

/// Root first, then its children newest first, capped at [`MAX_CANDIDATES`].
fn candidates(wireframe: &WireframeNode) -> Vec<CandidateNode> {
    std::iter::once(wireframe)
        .chain(wireframe.children.iter().rev())
        .take(MAX_CANDIDATES)
        .map(CandidateNode::from_node)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_form() -> WireframeNode {
        WireframeNode::new("frame", "LoginForm")
            .with_child(WireframeNode::new("text", "Title"))
            .with_child(WireframeNode::new("input", "EmailField"))
            .with_child(WireframeNode::new("input", "PasswordField"))
            .with_child(WireframeNode::new("button", "SubmitButton"))
    }

    fn creation_entry() -> EditContext {
        EditContext::new(
            "login form with email and password",
            EditType::Modify,
            vec!["LoginForm".to_string()],
            900,
            1,
        )
    }

    #[test]
    fn test_typed_reference_falls_back_to_structural_search() {
        let resolution = resolve_references(
            "make the button blue",
            EditType::Style,
            &login_form(),
            &[creation_entry()],
        );
        assert_eq!(
            resolution,
            Resolution::Targets(vec!["SubmitButton".to_string()])
        );
    }

    #[test]
    fn test_typed_reference_prefers_ring_targets() {
        let wireframe = login_form().with_child(WireframeNode::new("button", "CancelButton"));
        let ring = vec![
            creation_entry(),
            EditContext::new(
                "make the button blue",
                EditType::Style,
                vec!["SubmitButton".to_string()],
                150,
                2,
            ),
        ];

        let resolution =
            resolve_references("make the button wider", EditType::Style, &wireframe, &ring);
        assert_eq!(
            resolution,
            Resolution::Targets(vec!["SubmitButton".to_string()])
        );
    }

    #[test]
    fn test_pronoun_resolves_to_previous_edit_target() {
        let ring = vec![
            creation_entry(),
            EditContext::new(
                "make the button blue",
                EditType::Style,
                vec!["SubmitButton".to_string()],
                150,
                2,
            ),
        ];

        let resolution =
            resolve_references("make it bigger", EditType::Style, &login_form(), &ring);
        assert_eq!(
            resolution,
            Resolution::Targets(vec!["SubmitButton".to_string()])
        );
    }

    #[test]
    fn test_pronoun_on_fresh_session_declines() {
        let resolution = resolve_references(
            "remove it",
            EditType::Remove,
            &login_form(),
            &[creation_entry()],
        );

        let Resolution::NeedsClarification(candidates) = resolution else {
            panic!("expected clarification");
        };
        assert!(candidates.len() <= MAX_CANDIDATES);
        assert_eq!(candidates[0].component_name, "LoginForm");
        // Children newest first.
        assert_eq!(candidates[1].component_name, "SubmitButton");
    }

    #[test]
    fn test_region_narrowing() {
        let wireframe = WireframeNode::new("frame", "Page")
            .with_child(
                WireframeNode::new("frame", "Header")
                    .with_child(WireframeNode::new("button", "MenuButton")),
            )
            .with_child(
                WireframeNode::new("frame", "Content")
                    .with_child(WireframeNode::new("button", "CtaButton")),
            );

        let resolution = resolve_references(
            "make the button in the header green",
            EditType::Style,
            &wireframe,
            &[],
        );
        assert_eq!(
            resolution,
            Resolution::Targets(vec!["MenuButton".to_string()])
        );
    }

    #[test]
    fn test_no_reference_targets_root() {
        let resolution = resolve_references(
            "simplify everything",
            EditType::Modify,
            &login_form(),
            &[creation_entry()],
        );
        assert_eq!(resolution, Resolution::Targets(vec!["LoginForm".to_string()]));
    }

    #[test]
    fn test_unresolved_pronoun_with_add_intent_targets_root() {
        let resolution = resolve_references(
            "add a caption under it",
            EditType::Add,
            &login_form(),
            &[creation_entry()],
        );
        assert_eq!(resolution, Resolution::Targets(vec!["LoginForm".to_string()]));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let ring = vec![creation_entry()];
        let a = resolve_references("make the input wider", EditType::Style, &login_form(), &ring);
        let b = resolve_references("make the input wider", EditType::Style, &login_form(), &ring);
        assert_eq!(a, b);
    }
}
