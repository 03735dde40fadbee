//! The three generation stages.
//!
//! Each stage takes a row id, writes exactly one artifact at its layout
//! path and returns that path. Stages never touch the queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reel_gen::{ImageGenerator, SpeechEngine};
use reel_media::{check_inputs, ensure_non_empty, write_artifact, ComposeRequest, MediaError, VideoComposer};
use reel_models::{ArtifactLayout, RowId};
use tracing::Instrument;

use crate::error::{PipelineError, PipelineResult};
use crate::logging::RowLogger;
use crate::metrics::record_stage;

/// Re-check a freshly written artifact.
async fn verify_artifact(path: &Path) -> PipelineResult<u64> {
    match ensure_non_empty(path).await {
        Ok(len) => Ok(len),
        Err(MediaError::FileNotFound(p)) => Err(PipelineError::MissingArtifacts(vec![p])),
        Err(e) => Err(e.into()),
    }
}

/// Time a stage and record its outcome.
async fn timed<T, F>(stage: &'static str, logger: &RowLogger, fut: F) -> PipelineResult<T>
where
    F: std::future::Future<Output = PipelineResult<T>>,
{
    let start = Instant::now();
    let result = fut.instrument(logger.create_span()).await;
    record_stage(stage, result.is_ok(), start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        logger.log_error(&e.to_string());
    }
    result
}

// =============================================================================
// Image
// =============================================================================

/// Prompt → `images/<id>.png`.
#[derive(Clone)]
pub struct ImageStage {
    generator: Arc<dyn ImageGenerator>,
    layout: ArtifactLayout,
}

impl ImageStage {
    pub fn new(generator: Arc<dyn ImageGenerator>, layout: ArtifactLayout) -> Self {
        Self { generator, layout }
    }

    pub async fn run(&self, prompt: &str, id: &RowId) -> PipelineResult<PathBuf> {
        let logger = RowLogger::new(id, "image");
        timed("image", &logger, async {
            if prompt.trim().is_empty() {
                return Err(PipelineError::invalid_row("image_prompt is empty"));
            }
            logger.log_start(prompt);

            let bytes = self.generator.generate(prompt).await?;
            let path = self.layout.image(id);
            write_artifact(&path, &bytes).await?;
            let len = verify_artifact(&path).await?;

            logger.log_completion(&format!("{} ({} bytes)", path.display(), len));
            Ok(path)
        })
        .await
    }
}

// =============================================================================
// Audio
// =============================================================================

/// Narration → `audio/<id>.wav`.
#[derive(Clone)]
pub struct AudioStage {
    engine: Arc<dyn SpeechEngine>,
    layout: ArtifactLayout,
}

impl AudioStage {
    pub fn new(engine: Arc<dyn SpeechEngine>, layout: ArtifactLayout) -> Self {
        Self { engine, layout }
    }

    pub async fn run(&self, text: &str, id: &RowId) -> PipelineResult<PathBuf> {
        let logger = RowLogger::new(id, "audio");
        timed("audio", &logger, async {
            if text.trim().is_empty() {
                return Err(PipelineError::invalid_row("audio_script is empty"));
            }
            logger.log_start(self.engine.name());

            let path = self.layout.audio(id);
            self.engine.synthesize(text, &path).await?;
            let len = verify_artifact(&path).await?;

            logger.log_completion(&format!("{} ({} bytes)", path.display(), len));
            Ok(path)
        })
        .await
    }
}

// =============================================================================
// Video
// =============================================================================

/// Image + audio (+ caption) → `videos/<id>.mp4`.
#[derive(Clone)]
pub struct VideoStage {
    composer: Arc<dyn VideoComposer>,
    layout: ArtifactLayout,
}

impl VideoStage {
    pub fn new(composer: Arc<dyn VideoComposer>, layout: ArtifactLayout) -> Self {
        Self { composer, layout }
    }

    pub async fn run(&self, id: &RowId, caption: Option<&str>) -> PipelineResult<PathBuf> {
        let logger = RowLogger::new(id, "video");
        timed("video", &logger, async {
            let request =
                ComposeRequest::for_row(&self.layout, id, caption.map(str::to_string));
            check_inputs(&[&request.image, &request.audio]).await?;
            logger.log_start(if request.caption.is_some() { "with caption" } else { "no caption" });

            let video = self.composer.compose(&request).await?;
            verify_artifact(&video.path).await?;

            logger.log_completion(&format!(
                "{} ({:.2}s, {} layers)",
                video.path.display(),
                video.duration,
                video.layers
            ));
            Ok::<_, PipelineError>(video.path)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reel_gen::{GenError, GenResult};
    use reel_media::{ComposedVideo, MediaResult};
    use tempfile::TempDir;

    struct StaticImage(Vec<u8>);

    #[async_trait]
    impl ImageGenerator for StaticImage {
        async fn generate(&self, _prompt: &str) -> GenResult<Vec<u8>> {
            if self.0.is_empty() {
                return Err(GenError::NoImages);
            }
            Ok(self.0.clone())
        }
    }

    struct NoopComposer;

    #[async_trait]
    impl VideoComposer for NoopComposer {
        async fn compose(&self, request: &ComposeRequest) -> MediaResult<ComposedVideo> {
            tokio::fs::create_dir_all(request.output.parent().unwrap_or(Path::new("."))).await?;
            tokio::fs::write(&request.output, b"mp4").await?;
            Ok(ComposedVideo {
                path: request.output.clone(),
                duration: 1.0,
                layers: 1,
                size: 3,
            })
        }
    }

    fn id() -> RowId {
        RowId::parse("001").unwrap()
    }

    #[tokio::test]
    async fn test_image_stage_writes_layout_path() {
        let dir = TempDir::new().unwrap();
        let stage = ImageStage::new(Arc::new(StaticImage(b"png".to_vec())), ArtifactLayout::new(dir.path()));

        let path = stage.run("a red fox", &id()).await.unwrap();

        assert_eq!(path, dir.path().join("images/001.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_image_stage_rejects_blank_prompt() {
        let dir = TempDir::new().unwrap();
        let stage = ImageStage::new(Arc::new(StaticImage(b"png".to_vec())), ArtifactLayout::new(dir.path()));

        let err = stage.run("  ", &id()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRow(_)));
    }

    #[tokio::test]
    async fn test_video_stage_names_missing_inputs() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(layout.image(&id()), b"png").unwrap();

        let stage = VideoStage::new(Arc::new(NoopComposer), layout.clone());
        let err = stage.run(&id(), None).await.unwrap_err();

        assert_eq!(err.missing_paths(), Some(&[layout.audio(&id())][..]));
        assert!(!layout.video(&id()).exists());
    }

    #[tokio::test]
    async fn test_video_stage_runs_with_both_inputs() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::create_dir_all(dir.path().join("audio")).unwrap();
        std::fs::write(layout.image(&id()), b"png").unwrap();
        std::fs::write(layout.audio(&id()), b"wav").unwrap();

        let stage = VideoStage::new(Arc::new(NoopComposer), layout.clone());
        let path = stage.run(&id(), Some("Hello world")).await.unwrap();

        assert_eq!(path, layout.video(&id()));
    }
}
