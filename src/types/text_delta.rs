use serde::{Deserialize, Serialize};

/// A text delta, representing a piece of text in a streaming response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDelta {
    /// The text content.
    pub text: String,
}

impl TextDelta {
    /// Create a new `TextDelta` with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_delta_deserialization() {
        let delta: TextDelta = serde_json::from_value(json!({"text": "Hello world"})).unwrap();
        assert_eq!(delta, TextDelta::new("Hello world"));
    }
}
