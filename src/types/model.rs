use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents an Anthropic model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or private models)
    Custom(String),
}

/// Known Anthropic model versions
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Claude Sonnet 4 (2025-05-14 snapshot)
    ClaudeSonnet4_20250514,

    /// Claude Sonnet 4 (latest alias)
    ClaudeSonnet40,

    /// Claude Opus 4 (2025-05-14 snapshot)
    ClaudeOpus4_20250514,

    /// Claude Haiku 4.5
    ClaudeHaiku45,
}

impl KnownModel {
    const ALL: [KnownModel; 4] = [
        KnownModel::ClaudeSonnet4_20250514,
        KnownModel::ClaudeSonnet40,
        KnownModel::ClaudeOpus4_20250514,
        KnownModel::ClaudeHaiku45,
    ];

    /// The identifier the API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::ClaudeSonnet4_20250514 => "claude-sonnet-4-20250514",
            KnownModel::ClaudeSonnet40 => "claude-sonnet-4-0",
            KnownModel::ClaudeOpus4_20250514 => "claude-opus-4-20250514",
            KnownModel::ClaudeHaiku45 => "claude-haiku-4-5",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let Ok(model) = s.parse::<Model>();
        Ok(model)
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}
