//! End-to-end pipeline runs against an in-memory queue and fake generators.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reel_gen::{GenError, GenResult, ImageGenerator, SpeechEngine};
use reel_media::{wav_duration, ComposeRequest, ComposedVideo, MediaResult, VideoComposer};
use reel_models::{ArtifactLayout, RowId};
use reel_sheets::{CellUpdate, MemoryQueue, QueueBackend, SheetQueue};
use reel_worker::{AudioStage, ImageStage, Pipeline, PipelineError, RunOutcome, VideoStage};
use tempfile::TempDir;

const HEADER: &[&str] = &["id", "image_prompt", "audio_script", "video_status", "video link"];

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct Calls {
    image: AtomicUsize,
    audio: AtomicUsize,
    video: AtomicUsize,
}

impl Calls {
    fn total(&self) -> usize {
        self.image.load(Ordering::SeqCst) + self.audio.load(Ordering::SeqCst) + self.video.load(Ordering::SeqCst)
    }
}

struct FakeImage {
    calls: Arc<Calls>,
    fail: bool,
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate(&self, prompt: &str) -> GenResult<Vec<u8>> {
        let n = self.calls.image.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenError::NoImages);
        }
        Ok(format!("png:{}:{}", prompt, n).into_bytes())
    }
}

/// Writes one second of silence per call.
struct FakeSpeech {
    calls: Arc<Calls>,
}

#[async_trait]
impl SpeechEngine for FakeSpeech {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, _text: &str, out_path: &Path) -> GenResult<()> {
        self.calls.audio.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(out_path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        Ok(())
    }
}

struct FakeComposer {
    calls: Arc<Calls>,
}

#[async_trait]
impl VideoComposer for FakeComposer {
    async fn compose(&self, request: &ComposeRequest) -> MediaResult<ComposedVideo> {
        self.calls.video.fetch_add(1, Ordering::SeqCst);
        let duration = wav_duration(&request.audio)? * 1.05;
        let image = tokio::fs::read(&request.image).await?;

        let mut body = b"mp4:".to_vec();
        body.extend_from_slice(&image);
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output, &body).await?;

        Ok(ComposedVideo {
            path: request.output.clone(),
            duration,
            layers: if request.caption.is_some() { 2 } else { 1 },
            size: body.len() as u64,
        })
    }
}

struct Harness {
    dir: TempDir,
    memory: Arc<MemoryQueue>,
    calls: Arc<Calls>,
    pipeline: Pipeline,
}

impl Harness {
    fn new(rows: &[&[&str]]) -> Self {
        Self::build(rows, false)
    }

    fn failing_image(rows: &[&[&str]]) -> Self {
        Self::build(rows, true)
    }

    fn build(rows: &[&[&str]], fail_image: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let memory = Arc::new(MemoryQueue::from_table(HEADER, rows));
        let calls = Arc::new(Calls::default());

        let pipeline = Pipeline::new(
            SheetQueue::new(memory.clone()),
            ImageStage::new(
                Arc::new(FakeImage {
                    calls: calls.clone(),
                    fail: fail_image,
                }),
                layout.clone(),
            ),
            AudioStage::new(Arc::new(FakeSpeech { calls: calls.clone() }), layout.clone()),
            VideoStage::new(Arc::new(FakeComposer { calls: calls.clone() }), layout),
        );

        Self {
            dir,
            memory,
            calls,
            pipeline,
        }
    }

    fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.dir.path())
    }
}

fn id(raw: &str) -> RowId {
    RowId::parse(raw).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_single_pending_row_end_to_end() {
    let h = Harness::new(&[&["001", "a red fox", "Hello world", "pending", ""]]);

    let outcome = h.pipeline.run_once().await.unwrap();

    let layout = h.layout();
    let video = layout.video(&id("001"));
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            row_id: id("001"),
            row_number: 2,
            image: layout.image(&id("001")),
            audio: layout.audio(&id("001")),
            video: video.clone(),
        }
    );
    for path in [layout.image(&id("001")), layout.audio(&id("001")), video.clone()] {
        assert!(std::fs::metadata(&path).unwrap().len() > 0, "{} is empty", path.display());
    }
    assert_eq!(h.memory.cell(2, 4), "done");
    assert_eq!(h.memory.cell(2, 5), video.display().to_string());
}

#[tokio::test]
async fn test_pending_row_is_found_after_done_rows() {
    let h = Harness::new(&[
        &["001", "a red fox", "Hello", "done", "videos/001.mp4"],
        &["002", "a blue whale", "Hi", "Done", "videos/002.mp4"],
        &["003", "a green frog", "Hey", "pending", ""],
    ]);

    let outcome = h.pipeline.run_once().await.unwrap();

    let RunOutcome::Completed { row_id, row_number, .. } = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(row_id, id("003"));
    assert_eq!(row_number, 4);
    assert_eq!(h.memory.cell(4, 4), "done");
    assert_eq!(h.memory.cell(2, 5), "videos/001.mp4");
    assert_eq!(h.memory.writes().len(), 2);
}

#[tokio::test]
async fn test_only_first_pending_row_is_processed() {
    let h = Harness::new(&[
        &["001", "a red fox", "Hello", "pending", ""],
        &["002", "a blue whale", "Hi", "pending", ""],
    ]);

    h.pipeline.run_once().await.unwrap();

    assert_eq!(h.memory.cell(2, 4), "done");
    assert_eq!(h.memory.cell(3, 4), "pending");
    assert!(!h.layout().image(&id("002")).exists());
}

#[tokio::test]
async fn test_no_pending_rows_does_nothing() {
    let h = Harness::new(&[&["001", "a red fox", "Hello", "done", "videos/001.mp4"]]);

    let outcome = h.pipeline.run_once().await.unwrap();

    assert_eq!(outcome, RunOutcome::Empty);
    assert_eq!(h.calls.total(), 0);
    assert!(h.memory.writes().is_empty());
}

#[tokio::test]
async fn test_failed_stage_leaves_row_pending() {
    let h = Harness::failing_image(&[&["001", "a red fox", "Hello", "pending", ""]]);

    let err = h.pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, PipelineError::Gen(_)));
    assert_eq!(h.calls.audio.load(Ordering::SeqCst), 0);
    assert_eq!(h.calls.video.load(Ordering::SeqCst), 0);
    assert!(h.memory.writes().is_empty());
    assert_eq!(h.memory.cell(2, 4), "pending");
}

#[tokio::test]
async fn test_invalid_row_id_is_not_marked_done() {
    let h = Harness::new(&[&["../x", "a red fox", "Hello", "pending", ""]]);

    let err = h.pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, PipelineError::RowId(_)));
    assert_eq!(h.calls.total(), 0);
    assert!(h.memory.writes().is_empty());
}

#[tokio::test]
async fn test_rerun_overwrites_artifacts() {
    let h = Harness::new(&[&["001", "a red fox", "Hello", "pending", ""]]);
    h.pipeline.run_once().await.unwrap();
    let first = std::fs::read(h.layout().image(&id("001"))).unwrap();

    // Put the row back in the queue by hand.
    h.memory
        .write_cells(&[CellUpdate::new(2, 4, "pending")])
        .await
        .unwrap();
    h.pipeline.run_once().await.unwrap();

    let second = std::fs::read(h.layout().image(&id("001"))).unwrap();
    assert_ne!(first, second);
    assert_eq!(h.calls.image.load(Ordering::SeqCst), 2);
    assert_eq!(h.memory.cell(2, 4), "done");
}

#[tokio::test]
async fn test_video_stage_reports_missing_inputs() {
    let h = Harness::new(&[]);
    let layout = h.layout();
    let stage = VideoStage::new(Arc::new(FakeComposer { calls: h.calls.clone() }), layout.clone());

    let err = stage.run(&id("042"), Some("Hello")).await.unwrap_err();

    assert_eq!(
        err.missing_paths(),
        Some(&[layout.image(&id("042")), layout.audio(&id("042"))][..])
    );
    let message = err.to_string();
    assert!(message.contains(&layout.image(&id("042")).display().to_string()));
    assert!(message.contains(&layout.audio(&id("042")).display().to_string()));
    assert_eq!(h.calls.video.load(Ordering::SeqCst), 0);
}
