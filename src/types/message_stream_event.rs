use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    ApiErrorDetail, ContentBlockDelta, ContentBlockDeltaEvent, StopReason, TextDelta, Usage,
};

/// The message header sent in `message_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Provider message ID.
    pub id: String,

    /// The model that is answering.
    pub model: String,

    /// Initial usage counts.
    #[serde(default)]
    pub usage: Usage,
}

/// Start of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStartEvent {
    /// The message that is starting.
    pub message: StreamMessage,
}

/// Top-level changes to the message, sent once near the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Why the model stopped, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,

    /// The stop sequence that was hit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

/// A `message_delta` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeltaEvent {
    /// The delta information for the message.
    pub delta: MessageDelta,

    /// Cumulative usage.
    #[serde(default)]
    pub usage: Usage,
}

/// Start of a content block.  The block itself is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockStartEvent {
    /// The index of the content block.
    pub index: usize,

    /// The initial block.
    pub content_block: Value,
}

/// End of a content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlockStopEvent {
    /// The index of the content block.
    pub index: usize,
}

/// An event in a provider message stream.
///
/// A well-formed stream is `message_start`, then for each content block a
/// `content_block_start`, any number of `content_block_delta`s and a
/// `content_block_stop`, then `message_delta` and `message_stop`.  `ping` may
/// appear anywhere.  The relay only cares about text deltas and errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageStreamEvent {
    /// Keep-alive with no payload.
    Ping,

    /// Start of the message.
    MessageStart(MessageStartEvent),

    /// Stop reason and final usage.
    MessageDelta(MessageDeltaEvent),

    /// End of the message.
    MessageStop,

    /// Start of a content block.
    ContentBlockStart(ContentBlockStartEvent),

    /// Incremental update to a content block.
    ContentBlockDelta(ContentBlockDeltaEvent),

    /// End of a content block.
    ContentBlockStop(ContentBlockStopEvent),

    /// The provider failed mid-stream.
    Error {
        /// What failed.
        error: ApiErrorDetail,
    },

    /// An event kind this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl MessageStreamEvent {
    /// The text carried by this event, if it is a text delta.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            MessageStreamEvent::ContentBlockDelta(ContentBlockDeltaEvent {
                delta: ContentBlockDelta::TextDelta(TextDelta { text }),
                ..
            }) => Some(text),
            _ => None,
        }
    }
}
