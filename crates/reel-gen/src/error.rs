//! Generation error types.

use reel_media::MediaError;
use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service returned {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image service returned no images")]
    NoImages,

    #[error("Downloaded image from {0} is empty")]
    EmptyDownload(String),

    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("Speech synthesis failed: {message}")]
    SynthesisFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl GenError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    pub fn synthesis_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::SynthesisFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Stderr captured from a failed tool, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::SynthesisFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}
