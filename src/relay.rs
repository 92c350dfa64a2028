//! The relay server.
//!
//! `POST /api/chat` accepts a [`ChatRequest`], composes the system
//! instruction, opens a streamed completion upstream, and re-frames every text
//! delta as a server-sent event.  Configuration and validation failures are
//! answered with an HTTP error before anything is streamed.  Once the event
//! stream has started, failures are reported in-band as an error frame, and
//! every response ends with exactly one `[DONE]` frame.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::observability::{
    RELAY_FRAGMENTS, RELAY_REJECTED, RELAY_REQUESTS, RELAY_STREAM_DURATION, RELAY_UPSTREAM_ERRORS,
};
use crate::prompt::PromptComposer;
use crate::types::{
    ChatRequest, DONE_SENTINEL, HealthStatus, KnownModel, MessageCreateParams, MessageParam,
    MessageStreamEvent, Model, StopReason, StreamEvent, Usage,
};
use crate::upstream::{Anthropic, CompletionProvider};

/// The model every chat request is answered by.
pub const RELAY_MODEL: KnownModel = KnownModel::ClaudeSonnet4_20250514;

/// Output token budget for every chat request.
pub const RELAY_MAX_TOKENS: u32 = 4096;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// State shared by all requests.  Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    provider: Option<Arc<dyn CompletionProvider>>,
    composer: Arc<PromptComposer>,
}

impl AppState {
    /// Create state from parts.  A `None` provider means the credential is
    /// not configured.
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, composer: PromptComposer) -> Self {
        Self {
            provider,
            composer: Arc::new(composer),
        }
    }

    /// Create state for a deployment.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let composer = match &config.system_prompt_path {
            Some(path) => PromptComposer::from_file(path)?,
            None => PromptComposer::default(),
        };
        let provider: Option<Arc<dyn CompletionProvider>> = match &config.api_key {
            Some(key) => Some(Arc::new(
                Anthropic::new(key)?.with_base_url(config.api_url.as_str()),
            )),
            None => {
                tracing::warn!("ANTHROPIC_API_KEY is not set; every chat request will fail");
                None
            }
        };
        Ok(Self::new(provider, composer))
    }
}

/// Build the relay's router.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Result<Router> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::configuration(format!("invalid CORS origin: {origin:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind the configured address and serve until ctrl-c.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let router = build_router(state, &config.allowed_origins)?;
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::io(format!("Failed to bind {addr}: {e}"), e))?;
    serve_on(listener, router, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down");
    })
    .await
}

/// Serve `router` on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "apex relay listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::now())
}

async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    RELAY_REQUESTS.click();

    // The credential is checked before the body is even looked at.
    let Some(provider) = state.provider.clone() else {
        RELAY_REJECTED.click();
        tracing::error!("chat request rejected: ANTHROPIC_API_KEY not configured");
        return Err(Error::configuration("ANTHROPIC_API_KEY not configured"));
    };
    let request = ChatRequest::from_json(&body).inspect_err(|err| {
        RELAY_REJECTED.click();
        tracing::info!(error = %err, "chat request rejected");
    })?;
    let system = state.composer.compose_for(&request)?;

    tracing::info!(
        turns = request.messages.len(),
        page = request.context.as_ref().map_or("", |c| c.page.as_str()),
        session_state = request.non_empty_session_state().is_some(),
        "relaying chat request"
    );

    let messages = request.messages.iter().map(MessageParam::from).collect();
    let params = MessageCreateParams::new_streaming(
        RELAY_MAX_TOKENS,
        messages,
        Model::Known(RELAY_MODEL),
    )
    .with_system(system);

    Ok(Sse::new(relay_stream(provider, params))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

/// Stream one completion as relay events.
///
/// Dropping the returned stream drops the upstream stream with it, which
/// closes the provider connection.
pub fn relay_stream(
    provider: Arc<dyn CompletionProvider>,
    params: MessageCreateParams,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> + Send + 'static {
    stream! {
        let mut progress = StreamProgress::new();
        let mut failure = None;

        match provider.stream(params).await {
            Ok(mut events) => {
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) => {
                            if let Some(text) = event.text_delta() {
                                progress.fragments += 1;
                                RELAY_FRAGMENTS.click();
                                yield Ok(frame(&StreamEvent::text(text)));
                            } else {
                                progress.observe(&event);
                            }
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
            }
            Err(err) => failure = Some(err),
        }

        if let Some(err) = failure {
            RELAY_UPSTREAM_ERRORS.click();
            tracing::warn!(error = %err, fragments = progress.fragments, "upstream failed");
            yield Ok(frame(&StreamEvent::error(err.to_string())));
        }
        progress.finish();
        yield Ok(Event::default().data(DONE_SENTINEL));
    }
}

fn frame(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        // StreamEvent always serializes; keep the frame anyway.
        Err(err) => Event::default().data(format!(
            r#"{{"type":"error","error":"cannot encode event: {err}"}}"#
        )),
    }
}

/// What the relay learned about one upstream stream.
struct StreamProgress {
    started: Instant,
    fragments: u64,
    stop_reason: Option<StopReason>,
    usage: Usage,
    finished: bool,
}

impl StreamProgress {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            fragments: 0,
            stop_reason: None,
            usage: Usage::default(),
            finished: false,
        }
    }

    fn observe(&mut self, event: &MessageStreamEvent) {
        match event {
            MessageStreamEvent::MessageStart(start) => self.usage = start.message.usage,
            MessageStreamEvent::MessageDelta(delta) => {
                self.stop_reason = delta.delta.stop_reason.or(self.stop_reason);
                self.usage.output_tokens = delta.usage.output_tokens;
            }
            _ => {}
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        let elapsed = self.started.elapsed();
        RELAY_STREAM_DURATION.add(elapsed.as_secs_f64());
        tracing::info!(
            stop_reason = self.stop_reason.as_ref().map(|r| r.to_string()),
            input_tokens = self.usage.input_tokens,
            output_tokens = self.usage.output_tokens,
            fragments = self.fragments,
            elapsed_ms = elapsed.as_millis() as u64,
            "chat stream finished"
        );
    }
}

impl Drop for StreamProgress {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                fragments = self.fragments,
                "client went away; abandoning upstream stream"
            );
        }
    }
}
