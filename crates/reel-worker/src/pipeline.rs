//! Pipeline driver.
//!
//! One invocation handles at most one row: claim the first pending row,
//! run image → audio → video in order, then mark the row done. Any failure
//! stops the run and leaves the row pending.

use std::path::PathBuf;
use std::sync::Arc;

use reel_gen::{engine_from_config, FalImageClient};
use reel_media::FfmpegComposer;
use reel_models::{PendingRow, RowId};
use reel_sheets::{SheetQueue, SheetsClient};
use tracing::{info, Instrument};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RowLogger;
use crate::metrics::record_run;
use crate::stages::{AudioStage, ImageStage, VideoStage};

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No row was pending; nothing was done
    Empty,
    /// A row went through every stage and was marked done
    Completed {
        row_id: RowId,
        row_number: usize,
        image: PathBuf,
        audio: PathBuf,
        video: PathBuf,
    },
}

/// Queue plus the three stages.
#[derive(Clone)]
pub struct Pipeline {
    queue: SheetQueue,
    image: ImageStage,
    audio: AudioStage,
    video: VideoStage,
}

impl Pipeline {
    pub fn new(queue: SheetQueue, image: ImageStage, audio: AudioStage, video: VideoStage) -> Self {
        Self {
            queue,
            image,
            audio,
            video,
        }
    }

    /// Wire the production adapters from configuration.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let layout = config.layout();
        let sheets = SheetsClient::new(config.sheets()?.clone())?;
        let fal = FalImageClient::new(config.fal()?.clone())?;
        let speech = engine_from_config(&config.speech)?;
        let composer = FfmpegComposer::new(config.composition.clone());

        Ok(Self::new(
            SheetQueue::new(Arc::new(sheets)),
            ImageStage::new(Arc::new(fal), layout.clone()),
            AudioStage::new(Arc::from(speech), layout.clone()),
            VideoStage::new(Arc::new(composer), layout),
        ))
    }

    pub fn queue(&self) -> &SheetQueue {
        &self.queue
    }

    /// Process the first pending row, if any.
    pub async fn run_once(&self) -> PipelineResult<RunOutcome> {
        let Some(pending) = self.queue.next_pending().await? else {
            info!("No pending rows found.");
            record_run("empty");
            return Ok(RunOutcome::Empty);
        };

        let result = self.process(&pending).await;
        record_run(if result.is_ok() { "completed" } else { "failed" });
        result
    }

    async fn process(&self, pending: &PendingRow) -> PipelineResult<RunOutcome> {
        let row = &pending.row;
        let id = row.row_id()?;
        let logger = RowLogger::new(&id, "pipeline");

        async {
            logger.log_start(&format!("sheet row {}", pending.row_number));

            let image = self.image.run(&row.image_prompt, &id).await?;
            let audio = self.audio.run(&row.audio_script, &id).await?;
            let video = self.video.run(&id, Some(&row.audio_script)).await?;

            self.queue
                .mark_done(pending, &video.display().to_string())
                .await?;

            logger.log_completion(&video.display().to_string());
            Ok::<_, PipelineError>(RunOutcome::Completed {
                row_id: id.clone(),
                row_number: pending.row_number,
                image,
                audio,
                video,
            })
        }
        .instrument(logger.create_span())
        .await
    }
}
