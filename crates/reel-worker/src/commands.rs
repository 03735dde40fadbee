//! Command execution.
//!
//! Every command returns the lines it wants printed on stdout. Commands that
//! produce an artifact print its path last.

use std::path::PathBuf;
use std::sync::Arc;

use reel_gen::{engine_from_config, FalImageClient, SpeechBackend};
use reel_media::{check_ffmpeg, check_ffprobe, FfmpegComposer};
use reel_models::RowId;
use reel_sheets::{SheetQueue, SheetsClient};
use tracing::info;

use crate::cli::Commands;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Pipeline, RunOutcome};
use crate::stages::{AudioStage, ImageStage, VideoStage};

pub const NO_PENDING_ROWS: &str = "No pending rows found.";

/// Run one command.
pub async fn execute(command: &Commands, config: &PipelineConfig) -> PipelineResult<Vec<String>> {
    match command {
        Commands::Run => run(&Pipeline::from_config(config)?).await,
        Commands::Pending => {
            let client = SheetsClient::new(config.sheets()?.clone())?;
            pending(&SheetQueue::new(Arc::new(client))).await
        }
        Commands::Image { prompt, id } => {
            let id = RowId::parse(id)?;
            let client = FalImageClient::new(config.fal()?.clone())?;
            let stage = ImageStage::new(Arc::new(client), config.layout());
            Ok(vec![path_line(stage.run(prompt, &id).await?)])
        }
        Commands::Audio { text, id } => {
            let id = RowId::parse(id)?;
            let engine = engine_from_config(&config.speech)?;
            let stage = AudioStage::new(Arc::from(engine), config.layout());
            Ok(vec![path_line(stage.run(text, &id).await?)])
        }
        Commands::Video { id, caption } => {
            let id = RowId::parse(id)?;
            let composer = FfmpegComposer::new(config.composition.clone());
            let stage = VideoStage::new(Arc::new(composer), config.layout());
            Ok(vec![path_line(stage.run(&id, caption.as_deref()).await?)])
        }
        Commands::CheckTools => check_tools(config),
    }
}

fn path_line(path: PathBuf) -> String {
    path.display().to_string()
}

/// Full pipeline on the first pending row.
pub async fn run(pipeline: &Pipeline) -> PipelineResult<Vec<String>> {
    match pipeline.run_once().await? {
        RunOutcome::Empty => Ok(vec![NO_PENDING_ROWS.to_string()]),
        RunOutcome::Completed {
            row_id,
            row_number,
            video,
            ..
        } => {
            info!(row_id = %row_id, row_number, "Row completed");
            Ok(vec![
                format!("Completed row {} (id {})", row_number, row_id),
                path_line(video),
            ])
        }
    }
}

/// `key: value` for every field of the first pending row.
pub async fn pending(queue: &SheetQueue) -> PipelineResult<Vec<String>> {
    let Some(pending) = queue.next_pending().await? else {
        return Ok(vec![NO_PENDING_ROWS.to_string()]);
    };

    let mut lines = vec![format!("row: {}", pending.row_number)];
    lines.extend(
        pending
            .row
            .fields()
            .into_iter()
            .map(|(name, value)| format!("{}: {}", name, value)),
    );
    Ok(lines)
}

/// Report external tools; fails if any required one is missing.
pub fn check_tools(config: &PipelineConfig) -> PipelineResult<Vec<String>> {
    let mut checks: Vec<(String, Option<PathBuf>)> = vec![
        ("ffmpeg".to_string(), check_ffmpeg().ok()),
        ("ffprobe".to_string(), check_ffprobe().ok()),
    ];
    if config.speech.backend == SpeechBackend::Cli {
        let binary = config.speech.binary.clone();
        let found = which::which(&binary).ok();
        checks.push((binary, found));
    }

    let mut lines = Vec::new();
    let mut missing = Vec::new();
    for (name, path) in checks {
        match path {
            Some(path) => lines.push(format!("{}: {}", name, path.display())),
            None => {
                lines.push(format!("{}: not found", name));
                missing.push(name);
            }
        }
    }

    if missing.is_empty() {
        Ok(lines)
    } else {
        Err(PipelineError::MissingTools(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_sheets::MemoryQueue;

    #[tokio::test]
    async fn test_pending_prints_fields() {
        let memory = MemoryQueue::from_table(
            &["id", "image_prompt", "audio_script", "video_status", "video link"],
            &[&["001", "a red fox", "Hello world", "pending", ""]],
        );
        let lines = pending(&SheetQueue::new(Arc::new(memory))).await.unwrap();

        assert_eq!(lines[0], "row: 2");
        assert!(lines.contains(&"id: 001".to_string()));
        assert!(lines.contains(&"image_prompt: a red fox".to_string()));
        assert!(lines.contains(&"video_status: pending".to_string()));
    }

    #[tokio::test]
    async fn test_pending_with_empty_queue() {
        let memory = MemoryQueue::from_table(&["id", "video_status"], &[&["1", "done"]]);
        let lines = pending(&SheetQueue::new(Arc::new(memory))).await.unwrap();
        assert_eq!(lines, vec![NO_PENDING_ROWS]);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_stage_command_rejects_path_like_id() {
        let config = PipelineConfig::from_env(crate::config::Requirements::NONE).unwrap();
        let command = Commands::Video {
            id: "../escape".into(),
            caption: None,
        };

        let err = execute(&command, &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::RowId(_)));
    }
}
