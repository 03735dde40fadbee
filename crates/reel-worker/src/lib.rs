//! ReelQueue pipeline driver.
//!
//! This crate provides:
//! - The image, audio and video stages over pluggable adapters
//! - `Pipeline`: one pending row through every stage, then mark it done
//! - Configuration gathering and validation per command
//! - The `reel` command line

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod stages;

pub use cli::{Cli, Commands};
pub use config::{PipelineConfig, Requirements};
pub use error::{PipelineError, PipelineResult};
pub use logging::RowLogger;
pub use pipeline::{Pipeline, RunOutcome};
pub use stages::{AudioStage, ImageStage, VideoStage};
