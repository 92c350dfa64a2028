use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Describes the planner screen the caller is looking at.
///
/// The relay never interprets `data`; it is serialized into the system
/// instruction as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    /// Machine name of the page, e.g. `atlas`.
    pub page: String,

    /// Human-readable page title, e.g. `Atlas Planner`.
    pub label: String,

    /// Whatever the page wants the model to see.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl PageContext {
    /// Create a page context with no page data.
    pub fn new(page: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            label: label.into(),
            data: Map::new(),
        }
    }

    /// Attach page data.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}
