//! Pipeline error types.

use std::path::PathBuf;

use reel_gen::GenError;
use reel_media::MediaError;
use reel_models::RowIdError;
use reel_sheets::SheetsError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Invalid row id: {0}")]
    RowId(#[from] RowIdError),

    #[error("Missing:\n{}", join_paths(.0))]
    MissingArtifacts(Vec<PathBuf>),

    #[error("Artifact is empty: {}", .0.display())]
    EmptyArtifact(PathBuf),

    #[error("Missing tools: {}", .0.join(", "))]
    MissingTools(Vec<String>),

    #[error("Queue error: {0}")]
    Sheets(#[from] SheetsError),

    #[error("Generation error: {0}")]
    Gen(#[from] GenError),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::MissingInputs(paths) => Self::MissingArtifacts(paths),
            MediaError::EmptyFile(path) => Self::EmptyArtifact(path),
            other => Self::Media(other),
        }
    }
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }

    /// Paths reported missing, if this is a precondition failure.
    pub fn missing_paths(&self) -> Option<&[PathBuf]> {
        match self {
            Self::MissingArtifacts(paths) => Some(paths),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_become_missing_artifacts() {
        let paths = vec![PathBuf::from("output/images/001.png")];
        let err = PipelineError::from(MediaError::MissingInputs(paths.clone()));

        assert_eq!(err.missing_paths(), Some(paths.as_slice()));
        assert_eq!(err.to_string(), "Missing:\noutput/images/001.png");
    }

    #[test]
    fn test_empty_file_becomes_empty_artifact() {
        let err = PipelineError::from(MediaError::EmptyFile(PathBuf::from("a.wav")));
        assert!(matches!(err, PipelineError::EmptyArtifact(_)));
    }

    #[test]
    fn test_other_media_errors_are_wrapped() {
        let err = PipelineError::from(MediaError::FfmpegNotFound);
        assert!(matches!(err, PipelineError::Media(MediaError::FfmpegNotFound)));
    }
}
