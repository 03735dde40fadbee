//! Queue row status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status cell of a queue row.
///
/// Only `pending` and `done` carry meaning; anything else a human typed
/// into the sheet is preserved as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RowStatus {
    /// Waiting to be processed
    Pending,
    /// Processed successfully
    Done,
    /// Any other value, kept verbatim
    Other(String),
}

impl RowStatus {
    /// Parse a raw cell value. Matching is trimmed and case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "pending" => RowStatus::Pending,
            "done" => RowStatus::Done,
            _ => RowStatus::Other(raw.to_string()),
        }
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            RowStatus::Pending => "pending",
            RowStatus::Done => "done",
            RowStatus::Other(raw) => raw,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RowStatus::Pending)
    }
}

/// A blank cell, which never claims a row.
impl Default for RowStatus {
    fn default() -> Self {
        RowStatus::Other(String::new())
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for RowStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for RowStatus {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<RowStatus> for String {
    fn from(status: RowStatus) -> Self {
        status.as_str().to_string()
    }
}
