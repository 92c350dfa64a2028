//! The stream client.
//!
//! [`StreamClient`] posts a [`ChatRequest`] to the relay and turns the
//! event-stream response into calls on a [`StreamHandler`]: one `on_chunk`
//! per text frame, in order, then exactly one of `on_done` or `on_error`.
//!
//! Frames are parsed leniently.  Only lines beginning with `data: ` matter.
//! JSON shapes the client does not recognize are dropped, and payloads that
//! are not JSON at all are passed through as text.

use std::error;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_CHUNKS, CLIENT_DANGLING_STREAMS, CLIENT_ERRORS, CLIENT_REQUESTS,
};
use crate::sse::lossy_lines;
use crate::types::{ChatRequest, DONE_SENTINEL};

const DATA_PREFIX: &str = "data: ";

/// One significant line of a relay response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Assistant text.
    Text(String),
    /// The relay reported a failure.
    Error(String),
    /// The end-of-stream sentinel.
    Done,
    /// Valid JSON of a shape this client does not handle.
    Ignored,
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    delta: Option<Value>,
    error: Option<Value>,
}

impl WireFrame {
    fn into_frame(self) -> Frame {
        let delta_text = match self.delta {
            Some(Value::Object(mut delta)) => match delta.remove("text") {
                Some(Value::String(text)) => Some(text),
                _ => None,
            },
            _ => None,
        };
        match self.kind.as_deref() {
            Some("text") => match self.text.or(delta_text) {
                Some(text) => Frame::Text(text),
                None => Frame::Ignored,
            },
            Some("content_block_delta") => match delta_text {
                Some(text) if !text.is_empty() => Frame::Text(text),
                _ => Frame::Ignored,
            },
            Some("error") => match self.error {
                Some(Value::String(message)) => Frame::Error(message),
                Some(other) => Frame::Error(other.to_string()),
                None => Frame::Error("unknown error".to_string()),
            },
            _ => Frame::Ignored,
        }
    }
}

/// Parse one line of a relay response.
///
/// Returns `None` for lines that are not data lines, and for data lines whose
/// payload is blank.
pub fn parse_frame(line: &str) -> Option<Frame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(
            serde_json::from_value::<WireFrame>(value)
                .map(WireFrame::into_frame)
                .unwrap_or(Frame::Ignored),
        ),
        Err(_) if payload.trim().is_empty() => None,
        Err(_) => Some(Frame::Text(payload.to_string())),
    }
}

/// Receives the outcome of one chat request.
///
/// `on_done` and `on_error` are terminal: exactly one of them is called, once,
/// and nothing is called after it.
pub trait StreamHandler {
    /// A fragment of assistant text.
    fn on_chunk(&mut self, text: &str);

    /// The response finished.
    fn on_done(&mut self);

    /// The request failed.
    fn on_error(&mut self, error: Error);
}

/// A [`StreamHandler`] built from three closures.
pub struct Callbacks<C, D, E> {
    on_chunk: C,
    on_done: D,
    on_error: E,
}

impl<C, D, E> Callbacks<C, D, E>
where
    C: FnMut(&str),
    D: FnMut(),
    E: FnMut(Error),
{
    /// Wrap the three callbacks.
    pub fn new(on_chunk: C, on_done: D, on_error: E) -> Self {
        Self {
            on_chunk,
            on_done,
            on_error,
        }
    }
}

impl<C, D, E> StreamHandler for Callbacks<C, D, E>
where
    C: FnMut(&str),
    D: FnMut(),
    E: FnMut(Error),
{
    fn on_chunk(&mut self, text: &str) {
        (self.on_chunk)(text)
    }

    fn on_done(&mut self) {
        (self.on_done)()
    }

    fn on_error(&mut self, error: Error) {
        (self.on_error)(error)
    }
}

/// How a response body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The relay sent the sentinel.
    Sentinel,
    /// The body ended without one.
    Closed,
}

/// Read a relay response body, delivering text frames to `handler`.
///
/// Reading stops at the sentinel; nothing after it is read.  Invalid UTF-8
/// is replaced, not fatal.  An error frame
/// ends the read with an error.  Terminal callbacks are left to the caller.
pub async fn read_frames<S, E, H>(byte_stream: S, handler: &mut H) -> Result<StreamEnd>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn error::Error + Send + Sync>>,
    H: StreamHandler + ?Sized,
{
    let lines = lossy_lines(byte_stream);
    futures::pin_mut!(lines);
    while let Some(line) = lines.next().await {
        let line = line.map_err(|err| {
            Error::transport(
                format!("Failed to read chat response: {err}"),
                Some(Box::new(err)),
            )
        })?;
        match parse_frame(&line) {
            Some(Frame::Text(text)) => {
                CLIENT_CHUNKS.click();
                handler.on_chunk(&text);
            }
            Some(Frame::Error(message)) => return Err(Error::streaming(message, None)),
            Some(Frame::Done) => return Ok(StreamEnd::Sentinel),
            Some(Frame::Ignored) | None => {}
        }
    }
    Ok(StreamEnd::Closed)
}

/// Deliver the terminal callback for a finished read.
fn conclude<H>(end: Result<StreamEnd>, handler: &mut H)
where
    H: StreamHandler + ?Sized,
{
    match end {
        Ok(StreamEnd::Sentinel) => handler.on_done(),
        Ok(StreamEnd::Closed) => {
            CLIENT_DANGLING_STREAMS.click();
            tracing::debug!("chat response ended without a sentinel");
            handler.on_done();
        }
        Err(err) => {
            CLIENT_ERRORS.click();
            tracing::debug!(error = %err, "chat request failed");
            handler.on_error(err);
        }
    }
}

/// Client for the relay's chat endpoint.
#[derive(Debug, Clone)]
pub struct StreamClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl StreamClient {
    /// Create a client for the relay at `base_url`, e.g. `http://localhost:3001`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("api/chat")?;
        let client = reqwest::Client::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self { client, endpoint })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `request` and stream the reply into `handler`.
    ///
    /// Every outcome, including transport failures, is delivered through
    /// `handler`.  There are no retries.  Dropping the returned future abandons
    /// the request.
    pub async fn stream_chat<H>(&self, request: &ChatRequest, handler: &mut H)
    where
        H: StreamHandler + ?Sized,
    {
        CLIENT_REQUESTS.click();
        let end = self.run(request, handler).await;
        conclude(end, handler);
    }

    async fn run<H>(&self, request: &ChatRequest, handler: &mut H) -> Result<StreamEnd>
    where
        H: StreamHandler + ?Sized,
    {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string(), Some(Box::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::transport(e.to_string(), Some(Box::new(e))))?;
            return Err(Error::chat_api(status.as_u16(), &body));
        }

        read_frames(response.bytes_stream(), handler).await
    }
}
