use serde::{Deserialize, Serialize};

use crate::types::TextDelta;

/// A streaming update to a content block.
///
/// Only text deltas are relayed; the other kinds are modeled so that a
/// stream carrying them still deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlockDelta {
    /// A fragment of assistant text.
    #[serde(rename = "text_delta")]
    TextDelta(TextDelta),

    /// A fragment of tool input JSON.
    #[serde(rename = "input_json_delta")]
    InputJsonDelta {
        /// Partial JSON text.
        partial_json: String,
    },

    /// A fragment of extended-thinking text.
    #[serde(rename = "thinking_delta")]
    ThinkingDelta {
        /// Partial thinking text.
        thinking: String,
    },

    /// The signature of a thinking block.
    #[serde(rename = "signature_delta")]
    SignatureDelta {
        /// The signature.
        signature: String,
    },

    /// Any delta kind this crate does not model (citations, future kinds).
    #[serde(other)]
    Other,
}

/// An event that carries a delta update to a content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlockDeltaEvent {
    /// The delta update to the content block.
    pub delta: ContentBlockDelta,

    /// The index of the content block being updated.
    pub index: usize,
}

impl ContentBlockDeltaEvent {
    /// Create a new `ContentBlockDeltaEvent` with the given delta and index.
    pub fn new(delta: ContentBlockDelta, index: usize) -> Self {
        Self { delta, index }
    }

    /// Create a text delta event.
    pub fn text(text: impl Into<String>, index: usize) -> Self {
        Self::new(ContentBlockDelta::TextDelta(TextDelta::new(text)), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json};

    #[test]
    fn text_delta_deserialization() {
        let event: ContentBlockDeltaEvent = from_value(json!({
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hello world"}
        }))
        .unwrap();
        assert_eq!(event, ContentBlockDeltaEvent::text("Hello world", 0));
    }

    #[test]
    fn input_json_delta_is_not_text() {
        let delta: ContentBlockDelta = from_value(json!({
            "type": "input_json_delta",
            "partial_json": "{\"key\":"
        }))
        .unwrap();
        assert!(matches!(delta, ContentBlockDelta::InputJsonDelta { .. }));
    }

    #[test]
    fn unmodeled_delta_kinds_fall_through() {
        let delta: ContentBlockDelta = from_value(json!({
            "type": "citations_delta",
            "citation": {"type": "char_location", "cited_text": "x"}
        }))
        .unwrap();
        assert_eq!(delta, ContentBlockDelta::Other);
    }
}
