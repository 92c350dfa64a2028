//! The relay and the stream client talking over a real socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::{StreamExt, stream};
use tokio::net::TcpListener;
use tokio::sync::{Barrier, oneshot};

use apex_relay::chat::ChatSession;
use apex_relay::{
    ApiErrorDetail, AppState, ChatRequest, ChatTurn, CompletionProvider, ContentBlockDeltaEvent,
    Error, EventStream, MessageCreateParams, MessageStreamEvent, PageContext, PromptComposer,
    StreamClient, StreamHandler, build_router, serve_on,
};

struct FakeProvider {
    fragments: Vec<&'static str>,
    fail_with: Option<ApiErrorDetail>,
    seen: Mutex<Vec<MessageCreateParams>>,
}

impl FakeProvider {
    fn replying(fragments: &[&'static str]) -> Self {
        Self {
            fragments: fragments.to_vec(),
            fail_with: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing_after(fragments: &[&'static str], detail: ApiErrorDetail) -> Self {
        Self {
            fail_with: Some(detail),
            ..Self::replying(fragments)
        }
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn stream(&self, params: MessageCreateParams) -> apex_relay::Result<EventStream> {
        self.seen.lock().unwrap().push(params);
        let mut events: Vec<apex_relay::Result<MessageStreamEvent>> = self
            .fragments
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Ok(MessageStreamEvent::ContentBlockDelta(
                    ContentBlockDeltaEvent::text(*text, i),
                ))
            })
            .collect();
        match &self.fail_with {
            Some(detail) => events.push(Err(Error::from(detail.clone()))),
            None => events.push(Ok(MessageStreamEvent::MessageStop)),
        }
        Ok(Box::pin(stream::iter(events)))
    }
}

/// Replies with the words of the last turn, one fragment each.  Every call
/// waits at `barrier`, so no reply starts until all callers are in flight.
struct EchoProvider {
    barrier: Barrier,
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn stream(&self, params: MessageCreateParams) -> apex_relay::Result<EventStream> {
        self.barrier.wait().await;
        let words: Vec<String> = params
            .messages
            .last()
            .map(|turn| turn.content.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        let events = words.into_iter().enumerate().map(|(i, word)| {
            Ok::<_, Error>(MessageStreamEvent::ContentBlockDelta(
                ContentBlockDeltaEvent::text(word, i),
            ))
        });
        Ok(Box::pin(stream::iter(events).then(|event| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            event
        })))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Chunk(String),
    Done,
    Error(String),
}

#[derive(Default)]
struct Recorder {
    seen: Vec<Seen>,
    error: Option<Error>,
}

impl StreamHandler for Recorder {
    fn on_chunk(&mut self, text: &str) {
        self.seen.push(Seen::Chunk(text.to_string()));
    }

    fn on_done(&mut self) {
        self.seen.push(Seen::Done);
    }

    fn on_error(&mut self, error: Error) {
        self.seen.push(Seen::Error(error.to_string()));
        self.error = Some(error);
    }
}

struct Running {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Running {
    fn client(&self) -> StreamClient {
        StreamClient::new(&format!("http://{}", self.addr)).unwrap()
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start(provider: Option<Arc<dyn CompletionProvider>>) -> Running {
    let state = AppState::new(provider, PromptComposer::new("You are a test assistant."));
    let router = build_router(state, &["http://localhost:5173".to_string()]).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(serve_on(listener, router, async {
        let _ = rx.await;
    }));
    Running {
        addr,
        shutdown: Some(tx),
    }
}

fn hello() -> ChatRequest {
    ChatRequest::new(vec![ChatTurn::user("hello")])
}

#[tokio::test]
async fn chunks_arrive_in_order_then_done() {
    let provider = Arc::new(FakeProvider::replying(&["Map ", "the ", "atlas."]));
    let relay = start(Some(provider.clone())).await;

    let mut recorder = Recorder::default();
    relay.client().stream_chat(&hello(), &mut recorder).await;

    assert_eq!(
        recorder.seen,
        vec![
            Seen::Chunk("Map ".to_string()),
            Seen::Chunk("the ".to_string()),
            Seen::Chunk("atlas.".to_string()),
            Seen::Done,
        ]
    );
    assert_eq!(provider.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn context_reaches_the_provider_as_system_text() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));
    let relay = start(Some(provider.clone())).await;

    let request = hello().with_context(PageContext::new("atlas", "Atlas Planner"));
    let mut recorder = Recorder::default();
    relay.client().stream_chat(&request, &mut recorder).await;
    assert_eq!(recorder.seen.last(), Some(&Seen::Done));

    let seen = provider.seen.lock().unwrap();
    let system = seen[0].system.as_deref().unwrap();
    assert!(system.starts_with("You are a test assistant."));
    assert!(system.contains("The user is currently viewing: **Atlas Planner** (atlas)"));
    assert!(seen[0].stream);
}

#[tokio::test]
async fn upstream_failure_is_delivered_as_an_error() {
    let provider = Arc::new(FakeProvider::failing_after(
        &["Partial"],
        ApiErrorDetail::new("overloaded_error", "Overloaded"),
    ));
    let relay = start(Some(provider)).await;

    let mut recorder = Recorder::default();
    relay.client().stream_chat(&hello(), &mut recorder).await;

    assert_eq!(
        recorder.seen,
        vec![
            Seen::Chunk("Partial".to_string()),
            Seen::Error("Streaming error: Service unavailable: Overloaded".to_string()),
        ]
    );
}

#[tokio::test]
async fn empty_messages_are_a_chat_api_error() {
    let provider = Arc::new(FakeProvider::replying(&["never"]));
    let relay = start(Some(provider.clone())).await;

    let mut recorder = Recorder::default();
    relay
        .client()
        .stream_chat(&ChatRequest::new(Vec::new()), &mut recorder)
        .await;

    assert_eq!(
        recorder.seen,
        vec![Seen::Error(
            r#"Chat API error: 400 - {"error":"Messages are required"}"#.to_string()
        )]
    );
    assert_eq!(recorder.error.unwrap().status_code(), Some(400));
    assert!(provider.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_credential_is_a_chat_api_error() {
    let relay = start(None).await;

    let mut recorder = Recorder::default();
    relay.client().stream_chat(&hello(), &mut recorder).await;

    assert_eq!(
        recorder.seen,
        vec![Seen::Error(
            r#"Chat API error: 500 - {"error":"ANTHROPIC_API_KEY not configured"}"#.to_string()
        )]
    );
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = StreamClient::new(&format!("http://{addr}")).unwrap();
    let mut recorder = Recorder::default();
    client.stream_chat(&hello(), &mut recorder).await;

    assert_eq!(recorder.seen.len(), 1);
    assert!(matches!(recorder.seen[0], Seen::Error(_)));
    let error = recorder.error.unwrap();
    assert!(error.is_transport());
    assert_eq!(error.status_code(), None);
}

#[tokio::test]
async fn session_keeps_the_conversation() {
    let provider = Arc::new(FakeProvider::replying(&["Hello", ", exile."]));
    let relay = start(Some(provider.clone())).await;
    let client = relay.client();

    let mut session = ChatSession::new();
    let mut printed = String::new();
    let turn = session
        .send(&client, "hi", |chunk| printed.push_str(chunk))
        .await;
    assert_eq!(turn, Some(ChatTurn::assistant("Hello, exile.")));
    assert_eq!(printed, "Hello, exile.");

    session.send(&client, "again", |_| {}).await;
    assert_eq!(session.history().len(), 4);
    assert!(session.last_error().is_none());

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen[1].messages.len(), 3);
}

#[tokio::test]
async fn session_records_a_failed_turn() {
    let relay = start(None).await;
    let client = relay.client();

    let mut session = ChatSession::new();
    let turn = session.send(&client, "hi", |_| {}).await.unwrap();
    assert!(turn.content.starts_with("Error: Chat API error: 500"));
    assert!(session.last_error().is_some_and(Error::is_transport));
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn concurrent_requests_stay_independent() {
    let names = ["alpha", "bravo", "charlie"];
    let provider = Arc::new(EchoProvider {
        barrier: Barrier::new(names.len()),
    });
    let relay = start(Some(provider)).await;
    let client = relay.client();

    let runs = names.map(|name| {
        let client = client.clone();
        async move {
            let request = ChatRequest::new(vec![ChatTurn::user(format!(
                "{name}-1 {name}-2 {name}-3"
            ))]);
            let mut recorder = Recorder::default();
            client.stream_chat(&request, &mut recorder).await;
            (name, recorder)
        }
    });
    let results = tokio::time::timeout(Duration::from_secs(10), join_all(runs))
        .await
        .expect("requests were not served concurrently");

    for (name, recorder) in results {
        assert_eq!(
            recorder.seen,
            vec![
                Seen::Chunk(format!("{name}-1")),
                Seen::Chunk(format!("{name}-2")),
                Seen::Chunk(format!("{name}-3")),
                Seen::Done,
            ]
        );
    }
}
