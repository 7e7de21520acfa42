//! Seams to the engine's external collaborators: frame source, face
//! recognizer, snapshot requester, alert dispatcher and run control.

use crate::frame::Frame;
use crate::types::{AlertEvent, FaceEmbedding, FaceLocation, SnapshotRef};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// The source has no more frames. Ends the run loop.
    #[error("end of stream")]
    EndOfStream,
    #[error("frame source failed: {0}")]
    Device(String),
}

/// Blocking producer of frames.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame, SourceError>;
}

/// Face location and embedding extraction, done outside the engine.
pub trait FaceRecognizer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceLocation>, Self::Error>;

    fn embed(&mut self, frame: &Frame, location: &FaceLocation) -> Result<FaceEmbedding, Self::Error>;
}

/// Persists a frame for an alert and returns a reference to it.
///
/// Failures are the implementation's to log; `None` means no snapshot.
pub trait SnapshotRequester {
    fn capture(&self, frame: &Frame, label: &str) -> Option<SnapshotRef>;
}

/// Snapshot requester that never captures.
pub struct NoSnapshots;

impl SnapshotRequester for NoSnapshots {
    fn capture(&self, _frame: &Frame, _label: &str) -> Option<SnapshotRef> {
        None
    }
}

/// Hands an alert to delivery. Must not block on delivery completing.
pub trait AlertDispatcher {
    fn dispatch(&self, event: AlertEvent);
}

impl AlertDispatcher for std::sync::mpsc::Sender<AlertEvent> {
    fn dispatch(&self, event: AlertEvent) {
        if self.send(event).is_err() {
            tracing::warn!("alert receiver dropped; event discarded");
        }
    }
}

/// Whether the engine should keep running. Checked once per cycle.
pub trait RunControl {
    fn is_active(&self) -> bool;
}

impl RunControl for AtomicBool {
    fn is_active(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: RunControl + ?Sized> RunControl for std::sync::Arc<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
