//! Server-Sent Events (SSE) decoding.
//!
//! Both halves of the relay read event streams: the relay reads the
//! provider's stream, and the stream client reads the relay's.  Both start
//! from a line decoder that keeps its buffer across reads so that lines and
//! multi-byte characters may straddle chunk boundaries.  The relay's own
//! stream is read with [`lossy_lines`], so one bad byte costs one line of
//! text rather than the whole reply.  The provider stream
//! is then grouped into events with [`events`] and parsed into
//! [`MessageStreamEvent`]s by [`process_sse`].

use std::error;
use std::io;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::{Error, MessageStreamEvent, Result};

/// Decode a byte stream into lines.
///
/// Lines are split on `\n`; a trailing `\r` is dropped.  A final line without
/// a terminating newline is still yielded when the stream ends.
pub fn lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn error::Error + Send + Sync>>,
{
    let reader = StreamReader::new(byte_stream.map(|chunk| chunk.map_err(io::Error::other)));
    FramedRead::new(reader, LinesCodec::new()).map(|line| line.map_err(Error::from))
}

/// Decode a byte stream into lines, replacing invalid UTF-8 with U+FFFD.
///
/// Bytes are split on `\n` before decoding, and `\n` never occurs inside a
/// multi-byte sequence, so characters split across reads survive.  A trailing
/// `\r` is dropped.
pub fn lossy_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn error::Error + Send + Sync>>,
{
    let reader = StreamReader::new(byte_stream.map(|chunk| chunk.map_err(io::Error::other)));
    FramedRead::new(reader, AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new())).map(|line| -> Result<String> {
        let line = line?;
        let mut line = String::from_utf8_lossy(&line).into_owned();
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    })
}

/// A dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if the event had one.
    pub event: Option<String>,

    /// The `data:` fields joined with newlines.
    pub data: String,
}

impl SseEvent {
    /// The event name, defaulting to `message` as browsers do.
    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

#[derive(Debug, Default)]
struct EventBuilder {
    event: Option<String>,
    data: Vec<String>,
}

impl EventBuilder {
    /// Feed one line; returns an event when the line dispatches one.
    fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry are not used by either stream.
            _ => {}
        }
        None
    }

    fn take(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

/// Group a stream of lines into events.
///
/// The stream ends after the first error.
pub fn events<S>(lines: S) -> impl Stream<Item = Result<SseEvent>>
where
    S: Stream<Item = Result<String>>,
{
    stream::unfold(
        (Box::pin(lines), EventBuilder::default(), false),
        |(mut lines, mut builder, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match lines.next().await {
                    Some(Ok(line)) => {
                        if let Some(event) = builder.push_line(&line) {
                            return Some((Ok(event), (lines, builder, false)));
                        }
                    }
                    Some(Err(e)) => return Some((Err(e), (lines, builder, true))),
                    None => {
                        // A final event may be missing its blank line.
                        let event = builder.take()?;
                        return Some((Ok(event), (lines, builder, true)));
                    }
                }
            }
        },
    )
}

/// Process a provider byte stream into a stream of [`MessageStreamEvent`]s.
///
/// Error events from the provider, and events whose data does not parse, are
/// yielded as errors.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<MessageStreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn error::Error + Send + Sync>>,
{
    events(lines(byte_stream)).map(|event| event.and_then(parse_event))
}

/// Parse one provider event.
fn parse_event(event: SseEvent) -> Result<MessageStreamEvent> {
    match serde_json::from_str::<MessageStreamEvent>(&event.data) {
        Ok(MessageStreamEvent::Error { error }) => Err(error.into()),
        Ok(parsed) => Ok(parsed),
        Err(_) if event.name() == "error" => Err(Error::api(
            500,
            Some("stream_error".to_string()),
            event.data,
            None,
        )),
        Err(e) => Err(Error::streaming(
            format!("Malformed SSE event '{}': {e}", event.name()),
            Some(Box::new(e)),
        )),
    }
}
