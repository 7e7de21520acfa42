//! Adaptive face-match tolerance.
//!
//! Widens the accepted embedding distance for dim scenes, angled faces and
//! faces that are very small or very large in the frame.

use crate::frame::{self, Frame};
use crate::lighting;
use crate::quality::face_ratio;
use crate::types::FaceLocation;

/// Hard ceiling on the returned tolerance.
pub const MAX_TOLERANCE: f64 = 0.75;
/// Used when the face region cannot be measured.
pub const FALLBACK_TOLERANCE: f64 = 0.6;

/// Aspect ratios outside this band indicate a profile view.
const PROFILE_ASPECT: (f64, f64) = (0.7, 1.3);
const PROFILE_BONUS: f64 = 0.10;
/// Aspect ratios outside this (narrower) band indicate a mild angle.
const ANGLED_ASPECT: (f64, f64) = (0.8, 1.2);
const ANGLED_BONUS: f64 = 0.05;
/// Face ratios outside this band are very far or very close.
const NOMINAL_FACE_RATIO: (f64, f64) = (0.005, 0.2);
const SIZE_BONUS: f64 = 0.05;

fn outside(value: f64, (lo, hi): (f64, f64)) -> bool {
    value < lo || value > hi
}

/// Angle adjustment: the profile band is tested first and at most one
/// bonus applies.
pub fn angle_adjustment(aspect_ratio: f64) -> f64 {
    if outside(aspect_ratio, PROFILE_ASPECT) {
        PROFILE_BONUS
    } else if outside(aspect_ratio, ANGLED_ASPECT) {
        ANGLED_BONUS
    } else {
        0.0
    }
}

/// Size adjustment for faces far from the nominal frame share.
pub fn size_adjustment(face_ratio: f64) -> f64 {
    if outside(face_ratio, NOMINAL_FACE_RATIO) {
        SIZE_BONUS
    } else {
        0.0
    }
}

/// Compute the match tolerance for one located face.
pub fn adaptive_tolerance(location: &FaceLocation, frame: &Frame) -> f64 {
    let (Some(region), Some(aspect)) = (frame.checked_region(location), location.aspect_ratio()) else {
        tracing::debug!(?location, "tolerance: unmeasurable face region, using fallback");
        return FALLBACK_TOLERANCE;
    };

    let gray = frame::to_grayscale(&frame.crop(region));
    let profile = lighting::select_profile(frame::mean_brightness(&gray));

    let tolerance = profile.base_tolerance
        + angle_adjustment(aspect)
        + size_adjustment(face_ratio(location, frame));

    tolerance.min(MAX_TOLERANCE)
}
