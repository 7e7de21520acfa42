use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Face rectangle in pixel coordinates, `(top, right, bottom, left)` order.
///
/// Right and bottom are exclusive. Signed so that detector output slightly
/// outside the frame can be represented and rejected rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceLocation {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self { top, right, bottom, left }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Box area; zero for degenerate boxes.
    pub fn area(&self) -> u64 {
        if self.width() <= 0 || self.height() <= 0 {
            return 0;
        }
        self.width() as u64 * self.height() as u64
    }

    /// Width divided by height, or `None` for a zero-height box.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height() <= 0 {
            return None;
        }
        Some(self.width() as f64 / self.height() as f64)
    }
}

/// Face embedding vector produced by the external recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEmbedding {
    pub values: Vec<f32>,
}

impl FaceEmbedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance, or `None` if the dimensions differ.
    pub fn distance(&self, other: &FaceEmbedding) -> Option<f32> {
        if self.values.len() != other.values.len() {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt(),
        )
    }
}

/// One trained encoding in the known-face gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownFace {
    pub label: String,
    pub embedding: FaceEmbedding,
}

/// Outcome of comparing a candidate embedding against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionMatch {
    Known { label: String, distance: f32 },
    Unknown,
}

impl RecognitionMatch {
    pub fn is_known(&self) -> bool {
        matches!(self, RecognitionMatch::Known { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            RecognitionMatch::Known { label, .. } => Some(label),
            RecognitionMatch::Unknown => None,
        }
    }
}

/// Strategy for comparing a candidate embedding against the known-face gallery.
pub trait Matcher {
    fn compare(&self, candidate: &FaceEmbedding, gallery: &[KnownFace], tolerance: f64) -> RecognitionMatch;
}

/// Euclidean-distance matcher: the closest gallery entry wins if its
/// distance is within tolerance.
///
/// Always visits every entry; entries with a different dimension are skipped.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, candidate: &FaceEmbedding, gallery: &[KnownFace], tolerance: f64) -> RecognitionMatch {
        let mut best: Option<(usize, f32)> = None;

        for (i, known) in gallery.iter().enumerate() {
            let Some(distance) = candidate.distance(&known.embedding) else {
                tracing::debug!(label = %known.label, "gallery entry dimension mismatch; skipped");
                continue;
            };
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        match best {
            Some((idx, distance)) if distance as f64 <= tolerance => RecognitionMatch::Known {
                label: gallery[idx].label.clone(),
                distance,
            },
            _ => RecognitionMatch::Unknown,
        }
    }
}

/// Closed set of alert categories; each fires at most once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKey {
    GuestWithKnown,
    KnownPerson,
    HighThreat,
    NormalThreat,
    MotionDetected,
}

impl AlertKey {
    pub const ALL: [AlertKey; 5] = [
        AlertKey::GuestWithKnown,
        AlertKey::KnownPerson,
        AlertKey::HighThreat,
        AlertKey::NormalThreat,
        AlertKey::MotionDetected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKey::GuestWithKnown => "guest_with_known",
            AlertKey::KnownPerson => "known_person",
            AlertKey::HighThreat => "high_threat",
            AlertKey::NormalThreat => "normal_threat",
            AlertKey::MotionDetected => "motion_detected",
        }
    }

    /// Label used to name snapshot files.
    pub fn snapshot_label(&self) -> &'static str {
        match self {
            AlertKey::MotionDetected => "motion",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Opaque reference returned by the snapshot requester (a file path, URL, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotRef(pub String);

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A classified, deduplicated alert ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub key: AlertKey,
    pub message: String,
    pub snapshot: Option<SnapshotRef>,
    pub timestamp: NaiveDateTime,
}
