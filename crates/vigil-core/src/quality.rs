//! Face quality gate — rejects blurred, flat or implausibly sized detections
//! before they reach recognition.

use crate::filters;
use crate::frame::{self, Frame};
use crate::lighting::{self, LightingBucket};
use crate::types::FaceLocation;
use serde::Serialize;

/// Face area ÷ frame area must fall inside this range.
pub const MIN_FACE_RATIO: f64 = 0.0005;
pub const MAX_FACE_RATIO: f64 = 0.4;

const CANNY_LOW: i32 = 30;
const CANNY_HIGH: i32 = 100;
const VERTICAL_GRADIENT_MIN: i32 = 20;

/// Why a candidate region was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Rectangle is outside the frame or has no area.
    OutOfBounds,
    /// Face ratio outside the accepted range.
    SizeRatio,
    /// Region extracted to nothing.
    EmptyRegion,
    /// Texture statistics below the lighting profile's thresholds.
    BelowThresholds,
}

/// Texture statistics measured on a face region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMeasurements {
    pub brightness: f64,
    pub bucket: LightingBucket,
    pub edge_density: f64,
    pub vertical_density: f64,
    pub color_std: f64,
}

/// Result of one quality check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVerdict {
    pub accepted: bool,
    pub face_ratio: f64,
    pub measurements: Option<QualityMeasurements>,
    pub rejection: Option<RejectReason>,
}

impl QualityVerdict {
    fn rejected(face_ratio: f64, reason: RejectReason, measurements: Option<QualityMeasurements>) -> Self {
        Self {
            accepted: false,
            face_ratio,
            measurements,
            rejection: Some(reason),
        }
    }
}

/// Face area as a fraction of the frame area.
pub fn face_ratio(location: &FaceLocation, frame: &Frame) -> f64 {
    let frame_area = frame.area();
    if frame_area == 0 {
        return 0.0;
    }
    location.area() as f64 / frame_area as f64
}

/// Check whether a located face is usable for recognition.
pub fn check_face_quality(location: &FaceLocation, frame: &Frame) -> QualityVerdict {
    let Some(region) = frame.checked_region(location) else {
        tracing::debug!(?location, "face rejected: rectangle outside frame or empty");
        return QualityVerdict::rejected(0.0, RejectReason::OutOfBounds, None);
    };

    let ratio = face_ratio(location, frame);
    if !(MIN_FACE_RATIO..=MAX_FACE_RATIO).contains(&ratio) {
        tracing::debug!(ratio, "face rejected: size ratio out of range");
        return QualityVerdict::rejected(ratio, RejectReason::SizeRatio, None);
    }

    let face = frame.crop(region);
    if face.width() == 0 || face.height() == 0 {
        tracing::debug!(?location, "face rejected: empty region");
        return QualityVerdict::rejected(ratio, RejectReason::EmptyRegion, None);
    }

    let gray = frame::to_grayscale(&face);
    let brightness = frame::mean_brightness(&gray);
    let profile = lighting::select_profile(brightness);

    let measurements = QualityMeasurements {
        brightness,
        bucket: profile.bucket,
        edge_density: filters::edge_density(&gray, CANNY_LOW, CANNY_HIGH),
        vertical_density: filters::vertical_density(&gray, VERTICAL_GRADIENT_MIN),
        color_std: frame::color_std_dev(&face),
    };

    let passes = measurements.edge_density >= profile.edge_density
        && measurements.vertical_density >= profile.vertical_density
        && measurements.color_std >= profile.color_std;

    if !passes {
        tracing::debug!(
            edge = measurements.edge_density,
            vertical = measurements.vertical_density,
            color = measurements.color_std,
            lighting = %profile.bucket,
            "face rejected: below quality thresholds"
        );
        return QualityVerdict::rejected(ratio, RejectReason::BelowThresholds, Some(measurements));
    }

    QualityVerdict {
        accepted: true,
        face_ratio: ratio,
        measurements: Some(measurements),
        rejection: None,
    }
}
