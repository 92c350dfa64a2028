use serde::{Deserialize, Serialize};

/// Token accounting reported by the provider.
///
/// `message_start` carries input and output counts; `message_delta` carries
/// only the cumulative output count, so both fields default to zero.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// The number of input tokens which were used.
    #[serde(default)]
    pub input_tokens: u32,

    /// The number of output tokens which were used.
    #[serde(default)]
    pub output_tokens: u32,

    /// The number of input tokens used to create a cache entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u32>,

    /// The number of input tokens read from the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,
}

impl Usage {
    /// Create a new `Usage` with the given input and output tokens.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_creation_input_tokens: None,
            cache_read_input_tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_usage_has_only_output_tokens() {
        let usage: Usage = serde_json::from_value(json!({"output_tokens": 15})).unwrap();
        assert_eq!(usage, Usage::new(0, 15));
    }
}
