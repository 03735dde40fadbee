//! Generation adapters for the image and audio stages.
//!
//! This crate provides:
//! - `FalImageClient`: fal.ai text-to-image, downloaded to bytes
//! - `SpeechEngine` with Coqui TTS CLI and server adapters

pub mod error;
pub mod fal;
pub mod speech;

pub use error::{GenError, GenResult};
pub use fal::{FalConfig, FalImageClient, ImageGenerator};
pub use speech::{
    engine_from_config, CoquiCli, CoquiServer, SpeechBackend, SpeechConfig, SpeechEngine,
};
