use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{ChatTurn, PageContext};

/// Arbitrary snapshot of the caller's in-app state (character level,
/// defenses, ...). No schema is enforced.
pub type SessionState = Map<String, Value>;

/// The body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The full conversation so far, oldest first.  Absent is treated the
    /// same as empty and rejected by [`ChatRequest::validate`].
    #[serde(default)]
    pub messages: Vec<ChatTurn>,

    /// The page the caller is viewing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PageContext>,

    /// The caller's in-app state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<SessionState>,
}

impl ChatRequest {
    /// Create a request from a conversation history.
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            messages,
            context: None,
            session_state: None,
        }
    }

    /// Attach a page context.
    pub fn with_context(mut self, context: PageContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach a session state snapshot.
    pub fn with_session_state(mut self, state: SessionState) -> Self {
        self.session_state = Some(state);
        self
    }

    /// Parse and validate a request body.
    ///
    /// A body that is not a valid request is a validation error rather than a
    /// serialization error: it is the caller's request shape that is wrong.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let request: ChatRequest = serde_json::from_slice(body)
            .map_err(|e| Error::validation(format!("Invalid request body: {e}"), None))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the invariants the relay relies on.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::validation(
                "Messages are required",
                Some("messages".to_string()),
            ));
        }
        Ok(())
    }

    /// The session state, if present and non-empty.
    pub fn non_empty_session_state(&self) -> Option<&SessionState> {
        self.session_state.as_ref().filter(|state| !state.is_empty())
    }
}
