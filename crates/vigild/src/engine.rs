use crate::config::Config;
use crate::delivery::AlertQueue;
use crate::snapshot::SnapshotWriter;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::oneshot;
use vigil_core::gallery::{GalleryError, GalleryStore};
use vigil_core::{
    DecisionConfig, DetectionSession, FrameSource, Orchestrator, RunOptions, RunOutcome, SessionSummary, SourceError,
};
use vigil_hw::{Camera, ImageDirSource};
use vigil_recognizer::{OnnxRecognizer, RecognizerError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] vigil_hw::CameraError),
    #[error("replay source error: {0}")]
    Replay(#[from] vigil_hw::ReplayError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
    #[error("frame source failed: {0}")]
    Source(#[from] SourceError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// State shared between the engine thread and the control surface.
#[derive(Clone)]
pub struct EngineStatus {
    running: Arc<AtomicBool>,
    summary: Arc<Mutex<SessionSummary>>,
}

impl EngineStatus {
    fn new(summary: SessionSummary) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            summary: Arc::new(Mutex::new(summary)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ask the engine to stop after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn summary(&self) -> SessionSummary {
        match self.summary.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, summary: SessionSummary) {
        if let Ok(mut guard) = self.summary.lock() {
            *guard = summary;
        }
    }

    /// Status document served over D-Bus.
    pub fn to_json(&self) -> serde_json::Value {
        let summary = self.summary();
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "running": self.is_running(),
            "frames_processed": summary.frames_processed,
            "fired": summary.fired,
            "session_started": summary.started_at,
            "unknown_since": summary.unknown_since,
        })
    }
}

/// Handle to the running engine thread.
pub struct EngineHandle {
    pub status: EngineStatus,
    done: oneshot::Receiver<Result<RunOutcome, EngineError>>,
}

impl EngineHandle {
    /// Wait for the engine thread to finish.
    pub async fn wait(self) -> Result<RunOutcome, EngineError> {
        self.done.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

fn open_source(config: &Config) -> Result<Box<dyn FrameSource + Send>, EngineError> {
    if let Some(dir) = &config.replay_dir {
        return Ok(Box::new(ImageDirSource::open(dir)?));
    }

    let camera = Camera::open(&config.camera_device)?;
    tracing::info!(
        device = %config.camera_device,
        width = camera.width,
        height = camera.height,
        fourcc = ?camera.fourcc,
        "camera opened"
    );
    if config.warmup_frames > 0 {
        tracing::info!(count = config.warmup_frames, "discarding warmup frames");
        camera.warm_up(config.warmup_frames)?;
    }
    Ok(Box::new(camera))
}

/// Spawn the engine on a dedicated OS thread.
///
/// Opens the frame source, loads both ONNX models and the gallery, then runs
/// the decision loop until stopped or the source is exhausted. Fails fast at
/// startup if any resource is unavailable.
pub fn spawn_engine(config: &Config, alerts: AlertQueue) -> Result<EngineHandle, EngineError> {
    let mut source = open_source(config)?;

    let recognizer = OnnxRecognizer::load(&config.model_dir)?;
    tracing::info!(dir = %config.model_dir.display(), "recognizer models loaded");

    let gallery = GalleryStore::new(&config.gallery_path).load()?;
    tracing::info!(path = %config.gallery_path.display(), faces = gallery.len(), "gallery loaded");

    let decision = DecisionConfig {
        unknown_dwell: config.unknown_dwell,
        ..DecisionConfig::default()
    };
    let mut orchestrator = Orchestrator::new(
        decision,
        recognizer,
        gallery,
        Box::new(SnapshotWriter::new(config.snapshot_dir.clone())),
        Box::new(alerts),
    );
    let options = RunOptions {
        frame_interval: config.frame_interval,
        ..RunOptions::default()
    };

    let mut session = DetectionSession::new(Local::now().naive_local());
    let status = EngineStatus::new(session.summary());
    let (done_tx, done_rx) = oneshot::channel();

    let thread_status = status.clone();
    std::thread::Builder::new()
        .name("vigil-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let control = Arc::clone(&thread_status.running);
            let outcome = vigil_core::run(
                source.as_mut(),
                &mut orchestrator,
                &mut session,
                &control,
                &options,
                |session| thread_status.publish(session.summary()),
            );
            thread_status.stop();
            thread_status.publish(session.summary());
            tracing::info!(frames = session.frames_processed(), ?outcome, "engine thread exiting");
            // Dropping the orchestrator here closes the delivery queue.
            drop(orchestrator);
            let _ = done_tx.send(outcome.map_err(EngineError::from));
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { status, done: done_rx })
}
