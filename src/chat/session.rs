//! Conversation state for a chat caller.
//!
//! `ChatSession` owns what a caller of the relay has to keep between sends:
//! the turn history, the page being viewed, the session state snapshot, and
//! the text streamed so far for the turn in flight.  The relay itself keeps
//! none of this.

use serde_json::Value;

use crate::Error;
use crate::client::{StreamClient, StreamHandler};
use crate::types::{ChatRequest, ChatTurn, PageContext, SessionState};

/// A chat session that manages conversation state.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    context: Option<PageContext>,
    state: SessionState,
    streaming: bool,
    streaming_content: String,
    last_error: Option<Error>,
}

impl ChatSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty session viewing `context`.
    pub fn with_context(context: Option<PageContext>) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// True while a reply is being streamed.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The text streamed so far for the reply in flight.
    pub fn streaming_content(&self) -> &str {
        &self.streaming_content
    }

    /// Why the most recent turn failed, if it did.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The page the conversation is about.
    pub fn context(&self) -> Option<&PageContext> {
        self.context.as_ref()
    }

    /// Change the page the conversation is about.
    pub fn set_context(&mut self, context: Option<PageContext>) {
        self.context = context;
    }

    /// The session state snapshot sent with every request.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Set one state field, returning the previous value.
    pub fn set_state_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state.insert(key.into(), value)
    }

    /// Remove one state field.
    pub fn remove_state_value(&mut self, key: &str) -> Option<Value> {
        self.state.shift_remove(key)
    }

    /// Clear the conversation history.
    pub fn clear(&mut self) {
        self.history.clear();
        self.streaming_content.clear();
    }

    /// Start a turn.
    ///
    /// Returns `None`, changing nothing, if `input` is blank or a reply is
    /// already streaming.  Otherwise appends the trimmed input as a user turn
    /// and returns the request to send.
    pub fn begin(&mut self, input: &str) -> Option<ChatRequest> {
        let input = input.trim();
        if self.streaming || input.is_empty() {
            return None;
        }
        self.history.push(ChatTurn::user(input));
        self.streaming = true;
        self.streaming_content.clear();
        self.last_error = None;

        let mut request =
            ChatRequest::new(self.history.clone()).with_session_state(self.state.clone());
        if let Some(context) = &self.context {
            request = request.with_context(context.clone());
        }
        Some(request)
    }

    /// Accumulate a fragment of the reply in flight.
    pub fn push_chunk(&mut self, text: &str) {
        self.streaming_content.push_str(text);
    }

    /// Finish the turn in flight, appending the assistant turn.
    ///
    /// On success the turn is the streamed text; on failure it is the error,
    /// prefixed with `Error: `.
    pub fn finish(&mut self, outcome: Result<(), Error>) -> ChatTurn {
        let content = match outcome {
            Ok(()) => std::mem::take(&mut self.streaming_content),
            Err(err) => {
                self.streaming_content.clear();
                let content = format!("Error: {err}");
                self.last_error = Some(err);
                content
            }
        };
        self.streaming = false;
        let turn = ChatTurn::assistant(content);
        self.history.push(turn.clone());
        turn
    }

    /// Give up on the turn in flight, as if it had never been sent.
    pub fn abandon(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;
        self.streaming_content.clear();
        self.history.pop();
    }

    /// Send `input` through `client`, calling `on_chunk` as the reply streams.
    ///
    /// Returns the assistant turn, or `None` if the input was not sent.
    pub async fn send<F>(
        &mut self,
        client: &StreamClient,
        input: &str,
        on_chunk: F,
    ) -> Option<ChatTurn>
    where
        F: FnMut(&str),
    {
        let request = self.begin(input)?;
        let mut turn = Turn {
            session: self,
            on_chunk,
            outcome: None,
        };
        client.stream_chat(&request, &mut turn).await;
        let outcome = turn.outcome.unwrap_or(Ok(()));
        Some(self.finish(outcome))
    }
}

/// Routes one turn's callbacks into the session.
struct Turn<'a, F> {
    session: &'a mut ChatSession,
    on_chunk: F,
    outcome: Option<Result<(), Error>>,
}

impl<F> StreamHandler for Turn<'_, F>
where
    F: FnMut(&str),
{
    fn on_chunk(&mut self, text: &str) {
        self.session.push_chunk(text);
        (self.on_chunk)(text);
    }

    fn on_done(&mut self) {
        self.outcome = Some(Ok(()));
    }

    fn on_error(&mut self, error: Error) {
        self.outcome = Some(Err(error));
    }
}
