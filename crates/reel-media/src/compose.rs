//! Still-image + narration video composition.
//!
//! The composition is a fixed treatment: a slow Lanczos zoom-in on the
//! image, fades at both ends, and an optional caption card anchored to the
//! bottom of the frame. The whole graph is built as one FFmpeg
//! `-filter_complex` so the encode is a single pass.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reel_models::{ArtifactLayout, RowId};
use tracing::{debug, info};

use crate::caption::{write_caption_png, CaptionStyle};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_non_empty, file_len, move_file, part_path, remove_if_exists};
use crate::probe::audio_duration;

// =============================================================================
// Style
// =============================================================================

pub const DEFAULT_FPS: u32 = 24;
pub const DEFAULT_ZOOM: f64 = 0.05;
pub const DEFAULT_FADE_SECS: f64 = 0.5;
pub const DEFAULT_DURATION_PAD: f64 = 1.05;
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
pub const DEFAULT_THREADS: u32 = 4;

/// Visual treatment and encoding settings.
#[derive(Debug, Clone)]
pub struct CompositionStyle {
    pub fps: u32,
    /// Extra scale reached at the end of the video (0.05 = 105%)
    pub zoom: f64,
    /// Fade-in and fade-out length in seconds
    pub fade_secs: f64,
    /// Video length as a multiple of the audio length
    pub duration_pad: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub pixel_format: String,
    pub threads: u32,
    /// Kill FFmpeg after this many seconds
    pub timeout_secs: Option<u64>,
    pub caption: CaptionStyle,
}

impl Default for CompositionStyle {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            zoom: DEFAULT_ZOOM,
            fade_secs: DEFAULT_FADE_SECS,
            duration_pad: DEFAULT_DURATION_PAD,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            threads: DEFAULT_THREADS,
            timeout_secs: None,
            caption: CaptionStyle::default(),
        }
    }
}

impl CompositionStyle {
    /// Create style from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut caption = CaptionStyle::default();
        if let Ok(path) = std::env::var("CAPTION_FONT_PATH") {
            if !path.trim().is_empty() {
                caption = caption.with_font_path(path);
            }
        }
        if let Some(size) = env_parse::<f32>("CAPTION_FONT_SIZE") {
            caption = caption.with_font_size(size);
        }

        Self {
            fps: env_parse("VIDEO_FPS").filter(|fps| *fps > 0).unwrap_or(defaults.fps),
            zoom: env_parse("VIDEO_ZOOM").unwrap_or(defaults.zoom),
            fade_secs: env_parse("VIDEO_FADE_SECS").unwrap_or(defaults.fade_secs),
            duration_pad: env_parse("VIDEO_DURATION_PAD")
                .filter(|pad: &f64| *pad > 0.0)
                .unwrap_or(defaults.duration_pad),
            video_codec: std::env::var("VIDEO_CODEC").unwrap_or(defaults.video_codec),
            audio_codec: std::env::var("AUDIO_CODEC").unwrap_or(defaults.audio_codec),
            pixel_format: defaults.pixel_format,
            threads: env_parse("VIDEO_THREADS").unwrap_or(defaults.threads),
            timeout_secs: env_parse("VIDEO_TIMEOUT_SECS"),
            caption,
        }
    }

    /// Video length for a given audio length.
    pub fn video_duration(&self, audio_secs: f64) -> f64 {
        audio_secs * self.duration_pad
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// Plan
// =============================================================================

/// A visual layer of the composition.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// The zooming still image
    Image { start: f64, end: f64 },
    /// Caption card overlay
    Caption {
        path: PathBuf,
        width: u32,
        height: u32,
        start: f64,
        end: f64,
    },
}

/// Caption card already rendered to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCard {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Everything needed to build the FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    pub image: PathBuf,
    pub audio: PathBuf,
    /// Output frame size (even dimensions)
    pub frame: (u32, u32),
    /// Output length in seconds
    pub duration: f64,
    pub caption: Option<CaptionCard>,
    pub style: CompositionStyle,
}

impl CompositionPlan {
    /// Round image dimensions down to what H.264 4:2:0 accepts.
    pub fn even_frame(width: u32, height: u32) -> (u32, u32) {
        ((width & !1).max(2), (height & !1).max(2))
    }

    /// Layers from bottom to top.
    pub fn layers(&self) -> Vec<Layer> {
        let mut layers = vec![Layer::Image {
            start: 0.0,
            end: self.duration,
        }];
        if let Some(card) = &self.caption {
            layers.push(Layer::Caption {
                path: card.path.clone(),
                width: card.width,
                height: card.height,
                start: 0.0,
                end: self.duration,
            });
        }
        layers
    }

    /// Fade length, shortened so fade-in and fade-out never overlap.
    fn fade(&self) -> f64 {
        self.style.fade_secs.clamp(0.0, self.duration / 2.0)
    }

    fn fade_chain(&self) -> String {
        let fade = self.fade();
        if fade <= 0.0 {
            return String::new();
        }
        format!(
            ",fade=t=in:st=0:d={fade},fade=t=out:st={out}:d={fade}",
            fade = fade,
            out = self.duration - fade
        )
    }

    /// Per-frame zoom: scale by `1 + zoom * t / duration`, then crop back to the frame.
    ///
    /// The duration is written at full precision; rounding a sub-millisecond
    /// duration would divide by zero.
    pub fn zoom_filter(&self) -> String {
        let (w, h) = self.frame;
        let factor = format!("(1+{:.4}*t/{})", self.style.zoom, self.duration);
        format!(
            "scale=w='trunc(iw*{f}/2)*2':h='trunc(ih*{f}/2)*2':eval=frame:flags=lanczos,crop={w}:{h},setsar=1",
            f = factor,
            w = w,
            h = h
        )
    }

    /// Full filter graph. Output label is `[v]`.
    pub fn filter_complex(&self) -> String {
        let fades = self.fade_chain();
        let mut chains = vec![format!("[0:v]{}{}[base]", self.zoom_filter(), fades)];

        if self.caption.is_some() {
            chains.push(format!("[2:v]format=rgba{}[cap]", fades));
            chains.push("[base][cap]overlay=x=(W-w)/2:y=H-h:format=auto[comp]".to_string());
            chains.push(format!("[comp]format={}[v]", self.style.pixel_format));
        } else {
            chains.push(format!("[base]format={}[v]", self.style.pixel_format));
        }

        chains.join(";")
    }

    /// Build the FFmpeg command writing to `output`.
    pub fn to_command(&self, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output)
            .looped_image(&self.image, self.style.fps)
            .input(&self.audio);

        if let Some(card) = &self.caption {
            cmd = cmd.looped_image(&card.path, self.style.fps);
        }

        cmd.filter_complex(self.filter_complex())
            .map("[v]")
            .map("1:a")
            .duration(self.duration)
            .frame_rate(self.style.fps)
            .video_codec(&self.style.video_codec)
            .pixel_format(&self.style.pixel_format)
            .audio_codec(&self.style.audio_codec)
            .threads(self.style.threads)
            .output_args(["-movflags", "+faststart"])
            .format("mp4")
    }
}

// =============================================================================
// Preconditions
// =============================================================================

/// Fail with every absent input listed, then with the first empty one.
pub async fn check_inputs(inputs: &[&Path]) -> MediaResult<()> {
    let mut missing = Vec::new();
    let mut empty = None;

    for path in inputs {
        match file_len(path).await {
            None => missing.push(path.to_path_buf()),
            Some(0) if empty.is_none() => empty = Some(path.to_path_buf()),
            Some(_) => {}
        }
    }

    if !missing.is_empty() {
        return Err(MediaError::MissingInputs(missing));
    }
    if let Some(path) = empty {
        return Err(MediaError::EmptyFile(path));
    }
    Ok(())
}

// =============================================================================
// Composer
// =============================================================================

/// Input of one video composition.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
    /// Caption text; blank text is treated as no caption
    pub caption: Option<String>,
}

impl ComposeRequest {
    /// Request wired to a row's artifact paths under `layout`.
    pub fn for_row(layout: &ArtifactLayout, id: &RowId, caption: Option<String>) -> Self {
        Self {
            image: layout.image(id),
            audio: layout.audio(id),
            output: layout.video(id),
            caption,
        }
    }

    fn caption_text(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Result of a finished composition.
#[derive(Debug, Clone)]
pub struct ComposedVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub layers: usize,
    pub size: u64,
}

/// Produces a video from an image, an audio track and an optional caption.
#[async_trait]
pub trait VideoComposer: Send + Sync {
    async fn compose(&self, request: &ComposeRequest) -> MediaResult<ComposedVideo>;
}

/// Composer backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegComposer {
    style: CompositionStyle,
}

impl FfmpegComposer {
    pub fn new(style: CompositionStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &CompositionStyle {
        &self.style
    }

    /// Build the plan for a request without running FFmpeg.
    pub async fn plan(
        &self,
        request: &ComposeRequest,
        caption: Option<CaptionCard>,
    ) -> MediaResult<CompositionPlan> {
        let audio_secs = audio_duration(&request.audio).await?;
        let (width, height) = image::image_dimensions(&request.image)?;

        Ok(CompositionPlan {
            image: request.image.clone(),
            audio: request.audio.clone(),
            frame: CompositionPlan::even_frame(width, height),
            duration: self.style.video_duration(audio_secs),
            caption,
            style: self.style.clone(),
        })
    }

    async fn encode(&self, request: &ComposeRequest, caption_dir: &Path) -> MediaResult<ComposedVideo> {
        let mut plan = self.plan(request, None).await?;

        // Held until the encode finishes; the file is deleted on drop
        let caption_file = match request.caption_text() {
            Some(text) => {
                let file = tempfile::Builder::new()
                    .prefix(".caption-")
                    .suffix(".png")
                    .tempfile_in(caption_dir)?;
                let (width, height) =
                    write_caption_png(text, plan.frame.0, &self.style.caption, file.path()).await?;
                plan.caption = Some(CaptionCard {
                    path: file.path().to_path_buf(),
                    width,
                    height,
                });
                Some(file)
            }
            None => None,
        };

        let part = part_path(&request.output);
        let cmd = plan.to_command(&part);
        let total_ms = (plan.duration * 1000.0) as i64;

        info!(
            output = %request.output.display(),
            duration = plan.duration,
            frame = ?plan.frame,
            layers = plan.layers().len(),
            "Encoding video"
        );

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.style.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        runner
            .run_with_progress(&cmd, move |p| {
                debug!(percent = p.percentage(total_ms).round(), "Encode progress");
            })
            .await?;
        drop(caption_file);

        move_file(&part, &request.output).await?;
        let size = ensure_non_empty(&request.output).await?;

        Ok(ComposedVideo {
            path: request.output.clone(),
            duration: plan.duration,
            layers: plan.layers().len(),
            size,
        })
    }
}

#[async_trait]
impl VideoComposer for FfmpegComposer {
    async fn compose(&self, request: &ComposeRequest) -> MediaResult<ComposedVideo> {
        check_inputs(&[&request.image, &request.audio]).await?;

        let out_dir = request
            .output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&out_dir).await?;

        let result = self.encode(request, &out_dir).await;
        if result.is_err() {
            let _ = remove_if_exists(&part_path(&request.output)).await;
            let _ = remove_if_exists(&request.output).await;
        }
        result
    }
}
