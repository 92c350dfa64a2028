//! Slash command parsing for apex-chat.
//!
//! Commands start with `/` and change what the next request carries (page
//! context, session state) without sending anything to the relay.

use serde_json::Value;

use crate::types::PageContext;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Set the page the conversation is about.
    Page(PageContext),

    /// Stop sending a page context.
    ClearPage,

    /// Set one session state field.
    Set(String, Value),

    /// Remove one session state field.
    Unset(String),

    /// Show the session state and page context.
    State,

    /// Display help information.
    Help,

    /// Exit.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use apex_relay::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("/page atlas Atlas Planner").is_some());
/// assert!(parse_command("What should I craft next?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "page" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearPage,
            Some(arg) => ChatCommand::Page(parse_page(arg)),
            None => ChatCommand::ClearPage,
        },
        "set" => match argument.and_then(|arg| arg.split_once(' ')) {
            Some((key, value)) if !value.trim().is_empty() => {
                ChatCommand::Set(key.to_string(), parse_value(value.trim()))
            }
            _ => ChatCommand::Invalid("/set requires a key and a value".to_string()),
        },
        "unset" => match argument {
            Some(key) => ChatCommand::Unset(key.to_string()),
            None => ChatCommand::Invalid("/unset requires a key".to_string()),
        },
        "state" => ChatCommand::State,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// `atlas Atlas Planner` names page `atlas` with label `Atlas Planner`; a
/// bare page name is its own label.
fn parse_page(argument: &str) -> PageContext {
    match argument.split_once(' ') {
        Some((page, label)) => PageContext::new(page, label.trim()),
        None => PageContext::new(argument, argument),
    }
}

/// JSON if it parses, a string otherwise.
fn parse_value(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /page <page> [label]   Tell the assistant which planner page you are on
  /page clear            Stop sending a page context
  /set <key> <value>     Set a session state field (JSON or plain text)
  /unset <key>           Remove a session state field
  /state                 Show the page context and session state
  /clear                 Clear conversation history
  /help                  Show this help message
  /quit                  Exit the chat"#
}
