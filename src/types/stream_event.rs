use serde::{Deserialize, Serialize};

/// Payload of the final frame of every relay response, success or failure.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One event of the relay's event stream.
///
/// Ordering is carried by the transport alone; events have no sequence
/// numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    Text {
        /// The fragment.
        text: String,
    },

    /// The upstream call failed after the stream started.
    Error {
        /// What went wrong.
        error: String,
    },
}

impl StreamEvent {
    /// Create a text event.
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::Text { text: text.into() }
    }

    /// Create an error event.
    pub fn error(error: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: error.into(),
        }
    }
}
