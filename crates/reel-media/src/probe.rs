//! FFprobe media information and audio duration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Media file information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
    /// Width in pixels (0 without a video stream)
    pub width: u32,
    /// Height in pixels (0 without a video stream)
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse FFprobe's JSON report.
pub(crate) fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    // Container duration first, then the audio stream's own duration
    let duration = probe
        .format
        .duration
        .as_deref()
        .or_else(|| audio.and_then(|a| a.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let fps = video
        .and_then(|v| v.avg_frame_rate.as_deref().or(v.r_frame_rate.as_deref()))
        .and_then(parse_frame_rate)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        size,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        fps,
        video_codec: video.map(|v| v.codec_name.clone().unwrap_or_default()),
        audio_codec: audio.map(|a| a.codec_name.clone().unwrap_or_default()),
    })
}

/// Duration of an audio file in seconds.
///
/// WAV files are read from their header; anything else goes through FFprobe.
pub async fn audio_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    let duration = if is_wav {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || wav_duration(&owned))
            .await
            .map_err(|e| MediaError::internal(format!("WAV reader task failed: {}", e)))??
    } else {
        probe_media(path).await?.duration
    };

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::invalid_audio(format!(
            "{} has no playable duration",
            path.display()
        )));
    }

    Ok(duration)
}

/// Duration of a WAV file from its header.
pub fn wav_duration(path: &Path) -> MediaResult<f64> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(MediaError::invalid_audio(format!(
            "{} reports a zero sample rate",
            path.display()
        )));
    }
    // duration() counts samples per channel
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}
