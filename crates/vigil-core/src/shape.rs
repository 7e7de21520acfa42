//! Human shape verification for the no-face branch.
//!
//! Expands a seed rectangle to an approximate body region and checks for
//! upright, textured structure plus optional inter-frame motion support.
//! A coarse filter: there is no body-pose model behind it.

use crate::filters;
use crate::frame::{self, Frame, Region};
use crate::lighting::{self, LightingBucket};
use crate::types::FaceLocation;
use image::GrayImage;
use serde::Serialize;

/// Body region extends this many face heights above the face.
const EXPAND_UP: f64 = 1.5;
/// ...this many face heights below it...
const EXPAND_DOWN: f64 = 1.0;
/// ...and this many face widths to each side.
const EXPAND_SIDE: f64 = 1.0;

/// Lower Canny thresholds tolerate clothing texture.
const CANNY_LOW: i32 = 10;
const CANNY_HIGH: i32 = 50;
const VERTICAL_GRADIENT_MIN: i32 = 10;
/// Per-pixel intensity change counted as motion.
const MOTION_PIXEL_DELTA: u8 = 5;

/// Result of one human shape check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HumanVerdict {
    pub is_human: bool,
    pub bucket: Option<LightingBucket>,
    pub edge_density: f64,
    pub vertical_density: f64,
    /// 0.0 when no previous region of the same shape was available.
    pub motion_density: f64,
}

impl HumanVerdict {
    fn empty() -> Self {
        Self {
            is_human: false,
            bucket: None,
            edge_density: 0.0,
            vertical_density: 0.0,
            motion_density: 0.0,
        }
    }
}

/// Expand a face box to the estimated body region, clamped to the frame.
pub fn body_region(location: &FaceLocation, frame_width: u32, frame_height: u32) -> Region {
    let face_h = location.height().max(0) as f64;
    let face_w = location.width().max(0) as f64;

    let top = (location.top as i64 - (face_h * EXPAND_UP) as i64).max(0);
    let bottom = (location.bottom as i64 + (face_h * EXPAND_DOWN) as i64).min(frame_height as i64);
    let left = (location.left as i64 - (face_w * EXPAND_SIDE) as i64).max(0);
    let right = (location.right as i64 + (face_w * EXPAND_SIDE) as i64).min(frame_width as i64);

    Region {
        x: left.min(frame_width as i64) as u32,
        y: top.min(frame_height as i64) as u32,
        width: (right - left).max(0) as u32,
        height: (bottom - top).max(0) as u32,
    }
}

/// Fraction of pixels that changed by more than a few intensity levels,
/// or `None` when the two regions differ in shape.
pub fn motion_density(current: &GrayImage, previous: &GrayImage) -> Option<f64> {
    if current.dimensions() != previous.dimensions() || current.as_raw().is_empty() {
        return None;
    }
    let changed = filters::diff_mask(current, previous, MOTION_PIXEL_DELTA)
        .into_iter()
        .filter(|&m| m)
        .count();
    Some(changed as f64 / current.as_raw().len() as f64)
}

/// Verify that the region around `location` looks like a person.
///
/// `previous` is the grayscale body region from the last call. The returned
/// state is the current region, handed back regardless of the verdict; an
/// empty region leaves the state untouched.
pub fn verify_human_shape(
    location: &FaceLocation,
    frame: &Frame,
    previous: Option<GrayImage>,
) -> (HumanVerdict, Option<GrayImage>) {
    let region = body_region(location, frame.width(), frame.height());
    if region.is_empty() {
        tracing::debug!(?location, "shape rejected: empty body region");
        return (HumanVerdict::empty(), previous);
    }

    let gray = frame::to_grayscale(&frame.crop(region));
    let profile = lighting::select_profile(frame::mean_brightness(&gray));

    let edge_density = filters::edge_density(&gray, CANNY_LOW, CANNY_HIGH);
    let vertical_density = filters::vertical_density(&gray, VERTICAL_GRADIENT_MIN);
    let motion = match previous.as_ref() {
        Some(prev) => motion_density(&gray, prev).unwrap_or_else(|| {
            tracing::debug!("previous body region shape differs; motion density treated as 0");
            0.0
        }),
        None => 0.0,
    };

    let is_human = edge_density >= profile.edge_density
        && vertical_density >= profile.vertical_density
        && (motion >= profile.motion_density || motion == 0.0);

    if !is_human {
        tracing::debug!(
            edge = edge_density,
            vertical = vertical_density,
            motion,
            lighting = %profile.bucket,
            "human shape check failed"
        );
    }

    let verdict = HumanVerdict {
        is_human,
        bucket: Some(profile.bucket),
        edge_density,
        vertical_density,
        motion_density: motion,
    };
    (verdict, Some(gray))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn striped_frame(w: u32, h: u32) -> Frame {
        let image = RgbImage::from_fn(w, h, |_, y| {
            let v = if (y / 4) % 2 == 0 { 20 } else { 200 };
            Rgb([v, v, v])
        });
        Frame::new(image, 0)
    }

    #[test]
    fn test_body_region_expansion() {
        let loc = FaceLocation::new(100, 140, 140, 100);
        let region = body_region(&loc, 400, 400);
        // top 100 - 60, bottom 140 + 40, left 100 - 40, right 140 + 40
        assert_eq!(region, Region { x: 60, y: 40, width: 120, height: 140 });
    }

    #[test]
    fn test_body_region_clamped() {
        let loc = FaceLocation::new(5, 30, 25, 10);
        let region = body_region(&loc, 40, 40);
        assert_eq!(region, Region { x: 0, y: 0, width: 40, height: 40 });
    }

    #[test]
    fn test_body_region_empty_for_degenerate_outside_box() {
        let loc = FaceLocation::new(50, 60, 50, 60);
        let region = body_region(&loc, 40, 40);
        assert!(region.is_empty());
    }

    #[test]
    fn test_first_call_accepts_textured_region_and_seeds_state() {
        let frame = striped_frame(120, 120);
        let loc = FaceLocation::new(50, 70, 70, 50);
        let (verdict, state) = verify_human_shape(&loc, &frame, None);
        assert!(verdict.is_human, "{verdict:?}");
        assert_eq!(verdict.motion_density, 0.0);
        let state = state.unwrap();
        assert_eq!(state.dimensions(), (60, 70));
    }

    #[test]
    fn test_flat_region_rejected_but_state_updated() {
        let frame = Frame::new(RgbImage::from_pixel(120, 120, Rgb([100, 100, 100])), 0);
        let loc = FaceLocation::new(50, 70, 70, 50);
        let (verdict, state) = verify_human_shape(&loc, &frame, None);
        assert!(!verdict.is_human);
        assert!(state.is_some());
    }

    #[test]
    fn test_static_scene_with_previous_has_zero_motion_and_passes() {
        let frame = striped_frame(120, 120);
        let loc = FaceLocation::new(50, 70, 70, 50);
        let (_, state) = verify_human_shape(&loc, &frame, None);
        let (verdict, _) = verify_human_shape(&loc, &frame, state);
        assert_eq!(verdict.motion_density, 0.0);
        assert!(verdict.is_human);
    }

    #[test]
    fn test_motion_density_shape_mismatch() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(5, 4);
        assert_eq!(motion_density(&a, &b), None);
    }

    #[test]
    fn test_motion_density_counts_changes_above_five() {
        let a = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 5, 6, 100][x as usize]]));
        let b = GrayImage::new(4, 1);
        assert_eq!(motion_density(&a, &b), Some(0.5));
    }
}
