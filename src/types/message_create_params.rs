use serde::{Deserialize, Serialize};

use crate::types::{MessageParam, Model};

/// Body of a provider `POST /v1/messages` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreateParams {
    /// The model that will complete the conversation.
    pub model: Model,

    /// Maximum number of tokens to generate before stopping.
    pub max_tokens: u32,

    /// System instruction for the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Input messages, oldest first.
    pub messages: Vec<MessageParam>,

    /// Whether to incrementally stream the response using server-sent events.
    #[serde(default)]
    pub stream: bool,
}

impl MessageCreateParams {
    /// Create non-streaming parameters.
    pub fn new(max_tokens: u32, messages: Vec<MessageParam>, model: Model) -> Self {
        Self {
            model,
            max_tokens,
            system: None,
            messages,
            stream: false,
        }
    }

    /// Create streaming parameters.
    pub fn new_streaming(max_tokens: u32, messages: Vec<MessageParam>, model: Model) -> Self {
        Self {
            stream: true,
            ..Self::new(max_tokens, messages, model)
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn streaming_params_serialization() {
        let params = MessageCreateParams::new_streaming(
            4096,
            vec![MessageParam::user("hi")],
            Model::Known(KnownModel::ClaudeSonnet4_20250514),
        )
        .with_system("Be terse.");

        assert_eq!(
            to_value(&params).unwrap(),
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 4096,
                "system": "Be terse.",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn system_is_omitted_when_absent() {
        let params = MessageCreateParams::new(16, vec![MessageParam::user("hi")], "m".into());
        let json = to_value(&params).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], json!(false));
    }
}
