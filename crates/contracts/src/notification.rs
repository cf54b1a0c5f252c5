//! Notification - the record routed by the dispatcher

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parsed notification record
///
/// Produced by a `NotificationParser` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Display name of the recipient
    pub name: String,

    /// Discriminant used to select the sender ("email", "telegram", ...)
    pub kind: String,

    /// Channel-specific recipient identifier
    pub target_id: String,

    /// Message body
    pub content: String,
}

impl Notification {
    /// Create a new notification
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        target_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            target_id: target_id.into(),
            content: content.into(),
        }
    }
}

/// Explicit format tag selecting a parser
///
/// Always supplied by the caller; never sniffed from the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatTag {
    /// Delimited tabular text (one record per row)
    Tabular,
    /// Structured object text (one object per record)
    Structured,
    /// Caller-defined format
    Other(String),
}

impl FormatTag {
    /// Tag name as used in configuration and on the command line
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tabular => "tabular",
            Self::Structured => "structured",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "tabular" | "csv" => Self::Tabular,
            "structured" | "json" => Self::Structured,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for FormatTag {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(tag) => tag,
            Err(never) => match never {},
        }
    }
}

impl From<FormatTag> for String {
    fn from(tag: FormatTag) -> Self {
        tag.as_str().to_string()
    }
}
