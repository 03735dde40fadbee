#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for narrated still-image videos.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Audio duration from WAV headers or FFprobe
//! - Caption card rendering with `imageproc`
//! - The zoom/fade/caption composition used for every row

pub mod caption;
pub mod command;
pub mod compose;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use caption::{render_caption, write_caption_png, CaptionStyle};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{
    check_inputs, CaptionCard, ComposeRequest, ComposedVideo, CompositionPlan, CompositionStyle,
    FfmpegComposer, Layer, VideoComposer,
};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{ensure_non_empty, move_file, part_path, remove_if_exists, write_artifact};
pub use probe::{audio_duration, probe_media, wav_duration, MediaInfo};
pub use progress::FfmpegProgress;
