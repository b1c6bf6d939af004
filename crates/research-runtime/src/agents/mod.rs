//! The specialised research agents

pub mod editor;
pub mod planner;
pub mod search;

pub use editor::EditorAgent;
pub use planner::PlannerAgent;
pub use search::SearchAgent;

use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^```[\w-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").ok());

/// Remove a surrounding Markdown code fence, if any
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str().trim())
}

/// The outermost `{ ... }` span of a model answer, fenced or bare
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let body = strip_code_fence(text);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}
