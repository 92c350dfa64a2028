//! Configuration types for apex-chat.

use arrrg_derive::CommandLine;

use crate::types::PageContext;

/// Relay used when `--url` is not given.
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3001";

/// Command-line arguments for the apex-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Relay base URL.
    #[arrrg(optional, "Relay base URL (default: http://localhost:3001)", "URL")]
    pub url: Option<String>,

    /// Initial page.
    #[arrrg(optional, "Planner page the conversation starts on", "PAGE")]
    pub page: Option<String>,

    /// Label for the initial page.
    #[arrrg(optional, "Human-readable label for --page", "LABEL")]
    pub label: Option<String>,
}

/// Resolved apex-chat configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Relay base URL.
    pub url: String,

    /// Page context sent with the first request.
    pub context: Option<PageContext>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            context: None,
        }
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let context = args.page.map(|page| {
            let label = args.label.unwrap_or_else(|| page.clone());
            PageContext::new(page, label)
        });
        ChatConfig {
            url: args.url.unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            context,
        }
    }
}
