//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input with the arguments that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    path: PathBuf,
    args: Vec<String>,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order (input index = position)
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add a plain input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(path, std::iter::empty::<String>())
    }

    /// Add an input preceded by its own arguments.
    pub fn input_with_args<I, S>(mut self, path: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            path: path.as_ref().to_path_buf(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a still image looped into an endless video stream.
    pub fn looped_image(self, path: impl AsRef<Path>, fps: u32) -> Self {
        self.input_with_args(
            path,
            ["-loop".to_string(), "1".to_string(), "-framerate".to_string(), fps.to_string()],
        )
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Limit output duration. Written at full precision.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(seconds.to_string())
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set encoder thread count.
    pub fn threads(self, threads: u32) -> Self {
        self.output_arg("-threads").output_arg(threads.to_string())
    }

    /// Force the container format (needed when the extension is not `.mp4`).
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        // Overwrite, errors only, progress on stderr
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2", "-nostats"]
            .iter()
            .map(|a| a.to_string())
            .collect();

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress lines feed the callback; everything else is kept for diagnostics
        let stderr_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                    progress_callback(progress);
                    continue;
                }
                if is_progress_line(&line) || line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            tail.into_iter().collect::<Vec<_>>()
        });

        let status = self.wait_for_completion(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        match status? {
            Some(code) if code != 0 => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_tail.join("\n")),
                Some(code),
            )),
            None => Err(MediaError::ffmpeg_failed(
                "FFmpeg terminated by signal",
                Some(stderr_tail.join("\n")),
                None,
            )),
            Some(_) => Ok(()),
        }
    }

    /// Wait for the child process, honouring the timeout. Returns the exit code.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<Option<i32>> {
        let status = match self.timeout_secs {
            Some(timeout_secs) => {
                match tokio::time::timeout(
                    std::time::Duration::from_secs(timeout_secs),
                    child.wait(),
                )
                .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                        let _ = child.kill().await;
                        return Err(MediaError::Timeout(timeout_secs));
                    }
                }
            }
            None => child.wait().await?,
        };

        Ok(status.code())
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
