//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Upstream artifacts required by the video stage are absent.
    #[error("Missing:\n{}", join_paths(.0))]
    MissingInputs(Vec<PathBuf>),

    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid audio file: {0}")]
    InvalidAudio(String),

    #[error("Caption font not found (set CAPTION_FONT_PATH); tried: {0}")]
    FontNotFound(String),

    #[error("Caption rendering failed: {0}")]
    Caption(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn invalid_audio(message: impl Into<String>) -> Self {
        Self::InvalidAudio(message.into())
    }

    pub fn caption(message: impl Into<String>) -> Self {
        Self::Caption(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Paths reported as missing, if this is a precondition failure.
    pub fn missing_paths(&self) -> Option<&[PathBuf]> {
        match self {
            MediaError::MissingInputs(paths) => Some(paths),
            _ => None,
        }
    }
}
