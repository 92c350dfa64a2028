// Public modules
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod prompt;
pub mod relay;
pub mod sse;
pub mod types;
pub mod upstream;

// Re-exports
pub use client::{Callbacks, Frame, StreamClient, StreamEnd, StreamHandler, parse_frame};
pub use config::{RelayArgs, RelayConfig};
pub use error::{Error, Result};
pub use observability::{init_tracing, register_biometrics};
pub use prompt::PromptComposer;
pub use relay::{AppState, build_router, serve, serve_on};
pub use types::*;
pub use upstream::{Anthropic, CompletionProvider, EventStream};
