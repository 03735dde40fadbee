//! Structured row logging and subscriber setup.

use tracing::{error, info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::RowId;

/// Logger carrying the row id and stage on every event.
#[derive(Debug, Clone)]
pub struct RowLogger {
    row_id: String,
    stage: String,
}

impl RowLogger {
    pub fn new(row_id: &RowId, stage: &str) -> Self {
        Self {
            row_id: row_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(row_id = %self.row_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(row_id = %self.row_id, stage = %self.stage, "Stage failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(row_id = %self.row_id, stage = %self.stage, "Stage completed: {}", message);
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span for instrumenting the stage's future.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("row", row_id = %self.row_id, stage = %self.stage)
    }
}

/// Install the global subscriber: pretty for terminals, JSON with `LOG_FORMAT=json`.
pub fn init_tracing(verbose: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "reel={lvl},reel_worker={lvl},reel_media={lvl},reel_sheets={lvl},reel_gen={lvl},warn",
            lvl = default_level
        ))
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}
