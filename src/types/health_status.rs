use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `ok` while the process is up.
    pub status: String,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HealthStatus {
    /// A liveness report stamped with the current time.
    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }

    /// A liveness report stamped with `when`.
    pub fn at(when: OffsetDateTime) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: (when.unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }
}

/// Body of every non-streaming error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// What went wrong.
    pub error: String,
}

impl ErrorBody {
    /// Create an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn timestamp_is_epoch_millis() {
        let health = HealthStatus::at(datetime!(2024-01-01 00:00:00.250 UTC));
        assert_eq!(health.status, "ok");
        assert_eq!(health.timestamp, 1_704_067_200_250);
    }
}
