//! The upstream completion provider.
//!
//! The relay only needs one thing from a provider: given a fully composed
//! request, a stream of message events.  [`CompletionProvider`] is that seam;
//! [`Anthropic`] is the production implementation.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};

use crate::error::{Error, Result};
use crate::observability::{UPSTREAM_REQUESTS, UPSTREAM_REQUEST_ERRORS};
use crate::sse::process_sse;
use crate::types::{ApiErrorResponse, MessageCreateParams, MessageStreamEvent};

/// The provider endpoint used when none is configured.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
// Generations routinely outlive any sensible total timeout, so only the
// connection attempt is bounded.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A boxed stream of provider events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<MessageStreamEvent>> + Send>>;

/// Something that can stream a completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion.
    ///
    /// Errors returned here happened before any event was produced; errors
    /// inside the stream happened after.
    async fn stream(&self, params: MessageCreateParams) -> Result<EventStream>;
}

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct Anthropic {
    client: ReqwestClient,
    headers: HeaderMap,
    base_url: String,
}

impl Anthropic {
    /// Create a new client for `api_key`.
    pub fn new(api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            Error::configuration("ANTHROPIC_API_KEY contains characters not allowed in a header")
        })?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_API_VERSION),
        );

        let client = ReqwestClient::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            headers,
            base_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn messages_url(&self) -> String {
        format!("{}messages", self.base_url)
    }

    /// Convert a non-success response into an error.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("request-id")
            .or_else(|| response.headers().get("x-request-id"))
            .and_then(|val| val.to_str().ok())
            .map(String::from);
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        let detail = serde_json::from_str::<ApiErrorResponse>(&body)
            .ok()
            .map(|r| r.error);
        let error_type = detail.as_ref().map(|d| d.error_type.clone());
        let message = detail.map(|d| d.message).unwrap_or(body);

        match status_code {
            400 => Error::bad_request(message, None),
            401 => Error::authentication(message),
            403 => Error::permission(message),
            404 => Error::api(status_code, error_type, message, request_id),
            408 => Error::timeout(message, None),
            429 => Error::rate_limit(message, retry_after),
            500 => Error::internal_server(message, request_id),
            502..=504 | 529 => Error::service_unavailable(message, retry_after),
            _ => Error::api(status_code, error_type, message, request_id),
        }
    }

    async fn start(&self, mut params: MessageCreateParams) -> Result<EventStream> {
        params.stream = true;
        let url = self.messages_url();
        tracing::debug!(%url, model = %params.model, turns = params.messages.len(), "starting completion");

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(DEFAULT_CONNECT_TIMEOUT.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("{e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[async_trait]
impl CompletionProvider for Anthropic {
    async fn stream(&self, params: MessageCreateParams) -> Result<EventStream> {
        UPSTREAM_REQUESTS.click();
        let result = self.start(params).await;
        if let Err(err) = &result {
            UPSTREAM_REQUEST_ERRORS.click();
            tracing::warn!(error = %err, "completion request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = Anthropic::new("test-api-key").unwrap();
        assert_eq!(client.base_url(), DEFAULT_API_URL);
        assert_eq!(client.messages_url(), "https://api.anthropic.com/v1/messages");
        assert_eq!(client.headers["anthropic-version"], ANTHROPIC_API_VERSION);
        assert_eq!(client.headers[header::ACCEPT], "text/event-stream");
        assert!(client.headers["x-api-key"].is_sensitive());
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = Anthropic::new("k")
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/v1");
        assert_eq!(client.messages_url(), "http://127.0.0.1:9999/v1/messages");
    }

    #[test]
    fn unprintable_key_is_a_configuration_error() {
        let err = Anthropic::new("bad\nkey").unwrap_err();
        assert!(err.is_configuration());
    }
}
