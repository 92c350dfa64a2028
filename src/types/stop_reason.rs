use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the model stopped generating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model reached the end of a generated turn.
    EndTurn,

    /// The response hit the output token budget.
    MaxTokens,

    /// The model produced a stop sequence.
    StopSequence,

    /// The model asked to use a tool.
    ToolUse,

    /// The model paused in the middle of a turn.
    PauseTurn,

    /// The model refused to respond.
    Refusal,

    /// Anything newer than this crate.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::ToolUse => "tool_use",
            StopReason::PauseTurn => "pause_turn",
            StopReason::Refusal => "refusal",
            StopReason::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialization() {
        let reason: StopReason = serde_json::from_str(r#""max_tokens""#).unwrap();
        assert_eq!(reason, StopReason::MaxTokens);
        assert_eq!(reason.to_string(), "max_tokens");

        let reason: StopReason = serde_json::from_str(r#""model_context_window_exceeded""#).unwrap();
        assert_eq!(reason, StopReason::Unknown);
    }
}
