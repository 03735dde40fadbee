//! Pipeline configuration.
//!
//! Each crate owns its config struct; this module gathers them and checks
//! up front that whatever the chosen command needs is present.

use std::path::PathBuf;

use reel_gen::{FalConfig, SpeechConfig};
use reel_media::CompositionStyle;
use reel_models::layout::DEFAULT_OUTPUT_DIR;
use reel_models::ArtifactLayout;
use reel_sheets::SheetsConfig;

use crate::error::{PipelineError, PipelineResult};

/// Which parts of the pipeline a command uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirements {
    pub queue: bool,
    pub image: bool,
    pub audio: bool,
    pub video: bool,
}

impl Requirements {
    pub const NONE: Self = Self {
        queue: false,
        image: false,
        audio: false,
        video: false,
    };

    pub const FULL: Self = Self {
        queue: true,
        image: true,
        audio: true,
        video: true,
    };

    pub const QUEUE: Self = Self {
        queue: true,
        ..Self::NONE
    };

    pub const IMAGE: Self = Self {
        image: true,
        ..Self::NONE
    };

    pub const AUDIO: Self = Self {
        audio: true,
        ..Self::NONE
    };

    pub const VIDEO: Self = Self {
        video: true,
        ..Self::NONE
    };
}

/// Configuration for one invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of `images/`, `audio/` and `videos/`
    pub output_dir: PathBuf,
    /// Present when the queue is required
    pub sheets: Option<SheetsConfig>,
    /// Present when the image stage is required
    pub fal: Option<FalConfig>,
    pub speech: SpeechConfig,
    pub composition: CompositionStyle,
}

impl PipelineConfig {
    /// Load configuration from the environment.
    ///
    /// Settings a command needs but lacks are errors; settings it does not
    /// need are left unset.
    pub fn from_env(needs: Requirements) -> PipelineResult<Self> {
        let output_dir = std::env::var("OUTPUT_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let sheets = if needs.queue {
            let config = SheetsConfig::from_env().map_err(|e| PipelineError::config(e.to_string()))?;
            if !config.credentials_path.is_file() {
                return Err(PipelineError::config(format!(
                    "service account file not found: {} (set GOOGLE_APPLICATION_CREDENTIALS)",
                    config.credentials_path.display()
                )));
            }
            Some(config)
        } else {
            None
        };

        let fal = if needs.image {
            Some(FalConfig::from_env().map_err(|e| PipelineError::config(e.to_string()))?)
        } else {
            None
        };

        let speech = if needs.audio {
            SpeechConfig::from_env().map_err(|e| PipelineError::config(e.to_string()))?
        } else {
            SpeechConfig::from_env().unwrap_or_default()
        };

        Ok(Self {
            output_dir,
            sheets,
            fal,
            speech,
            composition: CompositionStyle::from_env(),
        })
    }

    /// Replace the output root (from `--output-dir`).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.output_dir)
    }

    pub fn sheets(&self) -> PipelineResult<&SheetsConfig> {
        self.sheets
            .as_ref()
            .ok_or_else(|| PipelineError::config("queue access is not configured"))
    }

    pub fn fal(&self) -> PipelineResult<&FalConfig> {
        self.fal
            .as_ref()
            .ok_or_else(|| PipelineError::config("image generation is not configured"))
    }
}
