//! Edit-intent classification
//!
//! Keyword-table classification over the prompt's words. The precedence is
//! normative: removal verbs, then addition verbs, then change verbs
//! qualified by layout or style tokens, then bare layout or style tokens.
//! Anything else is a generic modify.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use wireframe_core::EditType;

const REMOVE_VERBS: &[&str] = &["remove", "delete", "discard", "erase", "hide"];

const ADD_VERBS: &[&str] = &["add", "insert", "create", "include", "append"];

const CHANGE_VERBS: &[&str] = &["change", "make", "set", "turn", "update", "adjust"];

const LAYOUT_TOKENS: &[&str] = &[
    "move", "align", "center", "centre", "arrange", "reorder", "stack", "row", "column",
    "grid", "layout", "position", "spacing", "margin", "padding", "gap", "left", "right",
    "top", "bottom",
];

const STYLE_TOKENS: &[&str] = &[
    "color", "colour", "background", "font", "bold", "italic", "rounded", "border",
    "shadow", "opacity", "style", "theme", "dark", "light",
];

const SIZE_TOKENS: &[&str] = &[
    "bigger", "smaller", "larger", "wider", "taller", "size", "resize", "shrink", "grow",
];

const COLOR_TOKENS: &[&str] = &[
    "blue", "red", "green", "yellow", "black", "white", "grey", "gray", "orange",
    "purple", "pink", "teal", "navy",
];

fn contains_any(words: &HashSet<&str>, table: &[&str]) -> bool {
    table.iter().any(|t| words.contains(t))
}

/// Classify an edit prompt into a coarse intent.
///
/// Pure function; ambiguous prompts default to [`EditType::Modify`].
pub fn classify(prompt: &str) -> EditType {
    let lower = prompt.to_lowercase();
    let words: HashSet<&str> = lower.unicode_words().collect();

    if contains_any(&words, REMOVE_VERBS) || lower.contains("get rid of") {
        return EditType::Remove;
    }
    if contains_any(&words, ADD_VERBS) {
        return EditType::Add;
    }

    let layout = contains_any(&words, LAYOUT_TOKENS);
    let style = contains_any(&words, STYLE_TOKENS)
        || contains_any(&words, SIZE_TOKENS)
        || contains_any(&words, COLOR_TOKENS);

    if contains_any(&words, CHANGE_VERBS) {
        if layout {
            return EditType::Layout;
        }
        if style {
            return EditType::Style;
        }
        return EditType::Modify;
    }

    // Short prompts are often a bare token ("blue", "wider"); longer ones
    // still classify on token presence once no verb decided.
    if layout {
        return EditType::Layout;
    }
    if style {
        return EditType::Style;
    }

    EditType::Modify
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_verbs_win() {
        assert_eq!(classify("remove the footer"), EditType::Remove);
        assert_eq!(classify("delete that big image"), EditType::Remove);
        assert_eq!(classify("get rid of the sidebar"), EditType::Remove);
    }

    #[test]
    fn test_add_verbs() {
        assert_eq!(classify("add a search bar"), EditType::Add);
        assert_eq!(classify("insert a logo at the top"), EditType::Add);
    }

    #[test]
    fn test_change_verb_with_style_token() {
        assert_eq!(classify("make the button blue"), EditType::Style);
        assert_eq!(classify("make it bigger"), EditType::Style);
        assert_eq!(classify("change the background colour"), EditType::Style);
    }

    #[test]
    fn test_change_verb_with_layout_token() {
        assert_eq!(classify("move the logo to the left"), EditType::Layout);
        assert_eq!(classify("make the inputs a column"), EditType::Layout);
    }

    #[test]
    fn test_bare_tokens() {
        assert_eq!(classify("wider"), EditType::Style);
        assert_eq!(classify("more spacing between cards"), EditType::Layout);
    }

    #[test]
    fn test_ambiguous_defaults_to_modify() {
        assert_eq!(classify("the login flow feels off"), EditType::Modify);
        assert_eq!(classify("simplify the form"), EditType::Modify);
    }

    #[test]
    fn test_deterministic() {
        let prompt = "make the card header blue and move it left";
        assert_eq!(classify(prompt), classify(prompt));
    }
}
