//! vigil-recognizer — ONNX face location and encoding for the Vigil engine.
//!
//! [`OnnxRecognizer`] pairs an SCRFD detector with an ArcFace encoder and
//! implements [`vigil_core::FaceRecognizer`]. Faces the detector reported
//! landmarks for are aligned before encoding.

pub mod alignment;
pub mod detector;
pub mod embedder;

use alignment::{align_face, Landmarks};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vigil_core::{FaceEmbedding, FaceLocation, FaceRecognizer, Frame};

pub use detector::{Detection, FaceDetector};
pub use embedder::FaceEmbedder;

pub const DETECTOR_MODEL: &str = "det_10g.onnx";
pub const EMBEDDER_MODEL: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(PathBuf),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face location {0:?} is outside the frame")]
    InvalidRegion(FaceLocation),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

pub struct OnnxRecognizer {
    detector: FaceDetector,
    embedder: FaceEmbedder,
    /// Landmarks from the latest `locate`, keyed by the location handed out.
    last_located: Vec<(FaceLocation, Option<Landmarks>)>,
}

impl OnnxRecognizer {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, RecognizerError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL))?;
        let embedder = FaceEmbedder::load(&model_dir.join(EMBEDDER_MODEL))?;
        Ok(Self {
            detector,
            embedder,
            last_located: Vec::new(),
        })
    }
}

/// The encoder input for one face: the aligned crop when landmarks are known,
/// otherwise the plain bounding-box crop.
fn face_input(frame: &Frame, location: &FaceLocation, landmarks: Option<&Landmarks>) -> Result<RgbImage, RecognizerError> {
    if let Some(aligned) = landmarks.and_then(|lm| align_face(&frame.image, lm)) {
        return Ok(aligned);
    }
    let region = frame
        .checked_region(location)
        .ok_or(RecognizerError::InvalidRegion(*location))?;
    Ok(frame.crop(region))
}

impl FaceRecognizer for OnnxRecognizer {
    type Error = RecognizerError;

    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceLocation>, RecognizerError> {
        let detections = self.detector.detect(&frame.image)?;
        tracing::trace!(frame = frame.sequence, faces = detections.len(), "faces located");
        self.last_located = detections
            .into_iter()
            .map(|d| (d.to_location(frame.width(), frame.height()), d.landmarks))
            .collect();
        Ok(self.last_located.iter().map(|(loc, _)| *loc).collect())
    }

    fn embed(&mut self, frame: &Frame, location: &FaceLocation) -> Result<FaceEmbedding, RecognizerError> {
        let landmarks = self
            .last_located
            .iter()
            .find(|(loc, _)| loc == location)
            .and_then(|(_, lm)| lm.as_ref());
        let face = face_input(frame, location, landmarks)?;
        self.embedder.embed(&face)
    }
}
