//! Coqui TTS speech synthesis.
//!
//! Two adapters implement [`SpeechEngine`]:
//! - [`CoquiCli`] runs the `tts` command line tool
//! - [`CoquiServer`] calls a running `tts-server` over HTTP
//!
//! Both produce a WAV file and remove any partial output on failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reel_media::{ensure_non_empty, remove_if_exists, write_artifact};
use reqwest::Client;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{GenError, GenResult};

pub const DEFAULT_TTS_BINARY: &str = "tts";
pub const DEFAULT_TTS_MODEL: &str = "tts_models/en/ljspeech/tacotron2-DDC";
pub const DEFAULT_TTS_SERVER_URL: &str = "http://localhost:5002";

/// Stderr lines kept from a failed `tts` run.
const STDERR_TAIL_LINES: usize = 20;

// =============================================================================
// Configuration
// =============================================================================

/// Which engine adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechBackend {
    #[default]
    Cli,
    Server,
}

impl SpeechBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechBackend::Cli => "cli",
            SpeechBackend::Server => "server",
        }
    }
}

impl FromStr for SpeechBackend {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "" => Ok(SpeechBackend::Cli),
            "server" | "http" => Ok(SpeechBackend::Server),
            other => Err(GenError::config(format!(
                "unknown TTS_BACKEND {:?} (expected \"cli\" or \"server\")",
                other
            ))),
        }
    }
}

/// Speech engine configuration.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    /// `tts` executable (CLI backend)
    pub binary: String,
    /// Voice model (CLI backend; the server has its model fixed at startup)
    pub model: String,
    /// `tts-server` base URL (server backend)
    pub server_url: String,
    /// Kill or abandon synthesis after this long
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Cli,
            binary: DEFAULT_TTS_BINARY.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            server_url: DEFAULT_TTS_SERVER_URL.to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("TTS_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            backend,
            binary: std::env::var("TTS_BINARY").unwrap_or(defaults.binary),
            model: std::env::var("TTS_MODEL").unwrap_or(defaults.model),
            server_url: std::env::var("TTS_SERVER_URL").unwrap_or(defaults.server_url),
            timeout: std::env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

// =============================================================================
// Engine trait
// =============================================================================

/// Synthesizes narration into a WAV file.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Write `text` as speech to `out_path`, replacing any existing file.
    async fn synthesize(&self, text: &str, out_path: &Path) -> GenResult<()>;
}

/// Build the engine selected by `config`.
pub fn engine_from_config(config: &SpeechConfig) -> GenResult<Box<dyn SpeechEngine>> {
    Ok(match config.backend {
        SpeechBackend::Cli => Box::new(CoquiCli::new(config.clone())),
        SpeechBackend::Server => Box::new(CoquiServer::new(config.clone())?),
    })
}

fn ensure_text(text: &str) -> GenResult<()> {
    if text.trim().is_empty() {
        return Err(GenError::synthesis_failed("narration text is empty", None, None));
    }
    Ok(())
}

// =============================================================================
// CLI adapter
// =============================================================================

/// Runs `tts --text=<text> --model_name <model> --out_path <path>`.
#[derive(Debug, Clone)]
pub struct CoquiCli {
    config: SpeechConfig,
}

impl CoquiCli {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Resolve the `tts` binary.
    pub fn check_binary(&self) -> GenResult<PathBuf> {
        which::which(&self.config.binary).map_err(|_| GenError::ToolNotFound(self.config.binary.clone()))
    }

    /// The text is joined to its flag so a leading `-` is never read as an option.
    fn build_args(&self, text: &str, out_path: &Path) -> Vec<String> {
        vec![
            format!("--text={}", text),
            "--model_name".to_string(),
            self.config.model.clone(),
            "--out_path".to_string(),
            out_path.to_string_lossy().to_string(),
        ]
    }

    async fn run(&self, binary: &Path, text: &str, out_path: &Path) -> GenResult<()> {
        let mut command = Command::new(binary);
        command
            .args(self.build_args(text, out_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let secs = self.config.timeout.as_secs();
        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| GenError::Timeout(secs))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(GenError::synthesis_failed(
                format!("{} exited with {}", self.config.binary, output.status),
                Some(tail),
                output.status.code(),
            ));
        }

        ensure_non_empty(out_path).await?;
        Ok(())
    }
}

#[async_trait]
impl SpeechEngine for CoquiCli {
    fn name(&self) -> &'static str {
        "coqui-cli"
    }

    async fn synthesize(&self, text: &str, out_path: &Path) -> GenResult<()> {
        ensure_text(text)?;
        let binary = self.check_binary()?;

        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Stale output from an earlier run must not pass the emptiness check
        remove_if_exists(out_path).await?;

        debug!(model = %self.config.model, path = %out_path.display(), "Running tts");
        let result = self.run(&binary, text, out_path).await;
        if result.is_err() {
            let _ = remove_if_exists(out_path).await;
        } else {
            info!(path = %out_path.display(), "Synthesized narration");
        }
        result
    }
}

// =============================================================================
// Server adapter
// =============================================================================

/// Calls `GET {url}/api/tts?text=<text>` on a `tts-server`.
pub struct CoquiServer {
    http: Client,
    config: SpeechConfig,
}

impl CoquiServer {
    pub fn new(config: SpeechConfig) -> GenResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("reelqueue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GenError::Network)?;

        Ok(Self { http, config })
    }

    async fn fetch(&self, text: &str) -> GenResult<Vec<u8>> {
        let url = format!("{}/api/tts", self.config.server_url.trim_end_matches('/'));
        let response = self.http.get(&url).query(&[("text", text)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenError::request_failed(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        if !bytes.starts_with(b"RIFF") {
            return Err(GenError::InvalidResponse(format!(
                "tts-server returned {} bytes that are not a WAV file",
                bytes.len()
            )));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechEngine for CoquiServer {
    fn name(&self) -> &'static str {
        "coqui-server"
    }

    async fn synthesize(&self, text: &str, out_path: &Path) -> GenResult<()> {
        ensure_text(text)?;
        let bytes = self.fetch(text).await?;
        write_artifact(out_path, &bytes).await?;
        info!(path = %out_path.display(), bytes = bytes.len(), "Synthesized narration");
        Ok(())
    }
}
