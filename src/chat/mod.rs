//! The caller side of the relay, as used by the apex-chat REPL.
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation history, page context and session state
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_RELAY_URL};
pub use session::ChatSession;
