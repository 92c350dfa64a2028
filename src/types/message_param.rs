use serde::{Deserialize, Serialize};

use crate::types::{ChatTurn, TurnRole};

/// Role of a message sent to the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => MessageRole::User,
            TurnRole::Assistant => MessageRole::Assistant,
        }
    }
}

/// A message in the provider's request format.
///
/// The relay only ever sends plain string content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageParam {
    /// The role of the message.
    pub role: MessageRole,

    /// The content of the message.
    pub content: String,
}

impl MessageParam {
    /// Create a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&ChatTurn> for MessageParam {
    fn from(turn: &ChatTurn) -> Self {
        Self::new(turn.role.into(), turn.content.clone())
    }
}

impl From<ChatTurn> for MessageParam {
    fn from(turn: ChatTurn) -> Self {
        Self::new(turn.role.into(), turn.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn from_chat_turn_keeps_role_and_content() {
        let message = MessageParam::from(ChatTurn::assistant("Roll the waystone first."));
        assert_eq!(
            to_value(&message).unwrap(),
            json!({"role": "assistant", "content": "Roll the waystone first."})
        );
    }
}
