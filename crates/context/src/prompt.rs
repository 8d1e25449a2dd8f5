//! Prompt building
//!
//! Assembles the augmented prompt handed to the model adapter: the edit
//! instruction verbatim, a compact JSON projection of the current document,
//! the recent context entries, the resolved targets, and the response
//! contract (one full JSON document, no diffs, no commentary).

use wireframe_core::{EditContext, WireframeNode, CONTEXT_WINDOW};

const RESPONSE_CONTRACT: &str = "Return exactly one JSON object: the complete updated wireframe \
document that replaces the current one. Every node has \"type\", \"componentName\", \"props\" \
and an optional \"children\" array. Allowed types: frame, text, button, input, rectangle, \
image, list, navigation, card, avatar, vector. Do not return a diff, markdown or commentary.";

/// Builder for model prompts.
pub struct PromptBuilder {
    sections: Vec<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Prompt for the initial generation of a fresh session.
    pub fn initial(user_prompt: &str) -> String {
        PromptBuilder::new()
            .section(
                "Task",
                "Design a wireframe for the following request. Use a frame node as the root.",
            )
            .section("Request", user_prompt)
            .section("Response Format", RESPONSE_CONTRACT)
            .build()
    }

    /// The edit instruction, verbatim.
    pub fn edit_instruction(self, prompt: &str) -> Self {
        self.section("Edit Instruction", prompt)
    }

    /// Compact JSON projection of the current document.
    pub fn current_wireframe(self, wireframe: &WireframeNode) -> Self {
        let json = serde_json::to_string(wireframe)
            .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e));
        self.section("Current Wireframe", &json)
    }

    /// The newest [`CONTEXT_WINDOW`] context entries, oldest first, each
    /// summarized as prompt, intent and targets.
    pub fn recent_context(mut self, ring: &[EditContext]) -> Self {
        let skip = ring.len().saturating_sub(CONTEXT_WINDOW);
        let lines: Vec<String> = ring
            .iter()
            .skip(skip)
            .map(|entry| {
                format!(
                    "- [{}] \"{}\" -> {}",
                    entry.edit_type,
                    entry.prompt,
                    if entry.target_elements.is_empty() {
                        "(document)".to_string()
                    } else {
                        entry.target_elements.join(", ")
                    }
                )
            })
            .collect();
        if !lines.is_empty() {
            self = self.section("Recent Edits", &lines.join("\n"));
        }
        self
    }

    /// Component identifiers the edit was resolved against.
    pub fn targets(mut self, targets: &[String]) -> Self {
        if !targets.is_empty() {
            let body = format!(
                "Apply the edit to: {}. Keep every other node unchanged.",
                targets.join(", ")
            );
            self = self.section("Target Elements", &body);
        }
        self
    }

    /// Finish with the response contract and produce the prompt.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }

    /// Assemble the full edit prompt in the contract order.
    pub fn edit(
        prompt: &str,
        wireframe: &WireframeNode,
        ring: &[EditContext],
        targets: &[String],
    ) -> String {
        PromptBuilder::new()
            .edit_instruction(prompt)
            .current_wireframe(wireframe)
            .recent_context(ring)
            .targets(targets)
            .section("Response Format", RESPONSE_CONTRACT)
            .build()
    }

    fn section(mut self, title: &str, body: &str) -> Self {
        self.sections.push(format!("## {}\n{}", title, body));
        self
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wireframe_core::EditType;

    fn wireframe() -> WireframeNode {
        WireframeNode::new("frame", "LoginForm")
            .with_child(WireframeNode::new("button", "SubmitButton"))
    }

    #[test]
    fn test_initial_prompt_carries_request_and_contract() {
        let prompt = PromptBuilder::initial("login form with email and password");
        assert!(prompt.contains("login form with email and password"));
        assert!(prompt.contains("Response Format"));
        assert!(prompt.contains("complete updated wireframe"));
    }

    #[test]
    fn test_edit_prompt_contains_all_sections() {
        let ring = vec![EditContext::new(
            "make the button blue",
            EditType::Style,
            vec!["SubmitButton".to_string()],
            100,
            2,
        )];
        let prompt = PromptBuilder::edit(
            "make it bigger",
            &wireframe(),
            &ring,
            &["SubmitButton".to_string()],
        );

        assert!(prompt.contains("## Edit Instruction\nmake it bigger"));
        assert!(prompt.contains("\"componentName\":\"LoginForm\""));
        assert!(prompt.contains("[style] \"make the button blue\" -> SubmitButton"));
        assert!(prompt.contains("Apply the edit to: SubmitButton"));
        assert!(prompt.contains("no diffs") || prompt.contains("Do not return a diff"));
    }

    #[test]
    fn test_recent_context_caps_at_window() {
        let ring: Vec<EditContext> = (1..=15)
            .map(|i| {
                EditContext::new(format!("edit {}", i), EditType::Modify, vec![], 5, i)
            })
            .collect();
        let prompt = PromptBuilder::edit("tweak", &wireframe(), &ring, &[]);

        assert!(!prompt.contains("\"edit 5\""));
        assert!(prompt.contains("\"edit 6\""));
        assert!(prompt.contains("\"edit 15\""));
    }
}
