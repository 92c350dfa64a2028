//! System instruction composition.
//!
//! Every chat request gets a freshly composed system instruction: the base
//! instruction document, then the caller's session state (if any), then the
//! page the caller is viewing (if any).  Nothing is cached across requests.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ChatRequest, PageContext, SessionState};

/// The base instruction document compiled into the binary.
pub const BASE_INSTRUCTIONS: &str = include_str!("base_instructions.md");

const SECTION_BREAK: &str = "\n\n---\n\n";

/// Builds the system instruction for each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComposer {
    base: String,
}

impl PromptComposer {
    /// Use `base` as the base instruction document.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Read the base instruction document from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let base = fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("Failed to read system prompt {}: {e}", path.display()),
                e,
            )
        })?;
        Ok(Self::new(base))
    }

    /// The base instruction document.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Compose the system instruction for `request`.
    pub fn compose_for(&self, request: &ChatRequest) -> Result<String> {
        self.compose(request.session_state.as_ref(), request.context.as_ref())
    }

    /// Compose a system instruction.
    ///
    /// An empty session state adds nothing.  A page context always adds its
    /// section; page data is added only when non-empty.
    pub fn compose(
        &self,
        session_state: Option<&SessionState>,
        context: Option<&PageContext>,
    ) -> Result<String> {
        let mut prompt = self.base.clone();

        if let Some(state) = session_state.filter(|state| !state.is_empty()) {
            let state = serde_json::to_string_pretty(state)?;
            prompt.push_str(SECTION_BREAK);
            prompt.push_str("## CURRENT USER STATE\n\n```\n");
            prompt.push_str(&state);
            prompt.push_str("\n```");
        }

        if let Some(context) = context {
            prompt.push_str(SECTION_BREAK);
            prompt.push_str(&format!(
                "## CURRENT PAGE CONTEXT\n\nThe user is currently viewing: **{}** ({})\n",
                context.label, context.page
            ));
            if !context.data.is_empty() {
                let data = serde_json::to_string_pretty(&context.data)?;
                prompt.push_str("\nPage data:\n```\n");
                prompt.push_str(&data);
                prompt.push_str("\n```");
            }
        }

        Ok(prompt)
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(BASE_INSTRUCTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn state(value: serde_json::Value) -> SessionState {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("state must be an object"),
        }
    }

    #[test]
    fn base_only_without_context() {
        let composer = PromptComposer::new("BASE");
        assert_eq!(composer.compose(None, None).unwrap(), "BASE");
    }

    #[test]
    fn empty_session_state_adds_nothing() {
        let composer = PromptComposer::new("BASE");
        let empty = SessionState::new();
        assert_eq!(composer.compose(Some(&empty), None).unwrap(), "BASE");
    }

    #[test]
    fn state_then_context_without_page_data() {
        let composer = PromptComposer::new("BASE");
        let level = state(json!({"level": 42}));
        let context = PageContext::new("atlas", "Atlas Planner");
        let prompt = composer.compose(Some(&level), Some(&context)).unwrap();

        assert_eq!(
            prompt,
            "BASE\n\n---\n\n## CURRENT USER STATE\n\n```\n{\n  \"level\": 42\n}\n```\
             \n\n---\n\n## CURRENT PAGE CONTEXT\n\nThe user is currently viewing: **Atlas Planner** (atlas)\n"
        );
        let base_at = prompt.find("BASE").unwrap();
        let state_at = prompt.find("\"level\": 42").unwrap();
        let context_at = prompt.find("Atlas Planner").unwrap();
        assert!(base_at < state_at && state_at < context_at);
        assert!(!prompt.contains("Page data:"));
    }

    #[test]
    fn page_data_is_pretty_printed_in_insertion_order() {
        let composer = PromptComposer::new("BASE");
        let mut data = Map::new();
        data.insert("tier".to_string(), json!(16));
        data.insert("tablets".to_string(), json!(["breach", "delirium"]));
        let context = PageContext::new("atlas", "Atlas Planner").with_data(data);
        let prompt = composer.compose(None, Some(&context)).unwrap();

        assert!(prompt.ends_with(
            "(atlas)\n\nPage data:\n```\n{\n  \"tier\": 16,\n  \"tablets\": [\n    \"breach\",\n    \"delirium\"\n  ]\n}\n```"
        ));
    }

    #[test]
    fn compose_for_reads_the_request() {
        let composer = PromptComposer::new("BASE");
        let request = ChatRequest::new(vec![crate::types::ChatTurn::user("hi")])
            .with_session_state(state(json!({"class": "Monk"})));
        let prompt = composer.compose_for(&request).unwrap();
        assert!(prompt.starts_with("BASE\n\n---\n\n## CURRENT USER STATE"));
        assert!(prompt.contains("\"class\": \"Monk\""));
    }

    #[test]
    fn default_uses_compiled_in_instructions() {
        let composer = PromptComposer::default();
        assert!(composer.base().starts_with("# POE2 Apex"));
        assert!(composer.base().contains("SCOPE GUARDRAILS"));
    }

    #[test]
    fn missing_prompt_file_is_an_io_error() {
        let err = PromptComposer::from_file("/nonexistent/apex/base.md").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
