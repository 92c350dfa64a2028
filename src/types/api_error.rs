use serde::{Deserialize, Serialize};

/// The `error` object the provider puts in error responses and in
/// `event: error` stream frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error type, e.g. `overloaded_error`.
    #[serde(rename = "type")]
    pub error_type: String,

    /// Human-readable error message.
    pub message: String,
}

impl ApiErrorDetail {
    /// Create a new error detail.
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

/// Body of a non-success provider HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// The error.
    pub error: ApiErrorDetail,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_response_deserialization() {
        let response: ApiErrorResponse = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "slow down"}
        }))
        .unwrap();
        assert_eq!(
            response.error,
            ApiErrorDetail::new("rate_limit_error", "slow down")
        );
    }
}
