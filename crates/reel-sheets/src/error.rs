//! Sheets error types.

use thiserror::Error;

/// Result type for Sheets operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Errors that can occur while reading or writing the queue.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Spreadsheet or worksheet not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Worksheet has no {0:?} column")]
    MissingColumn(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn(name.into())
    }

    /// Map an HTTP error status to an error variant.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 => Self::AuthError(msg),
            403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            429 => Self::RateLimited(msg),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::ServerError(code, _) => Some(*code),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
