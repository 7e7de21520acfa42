//! Frame-differencing motion detector.
//!
//! The detector itself is stateless: the caller owns the previous grayscale
//! frame and gets the new one back from every call, including calls that
//! report no motion.

use crate::filters;
use crate::frame::Frame;
use crate::types::FaceLocation;
use image::GrayImage;

/// Tunables for [`MotionDetector`].
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Gaussian kernel size (odd).
    pub blur_kernel: usize,
    /// Absolute difference above which a pixel counts as changed.
    pub diff_threshold: u8,
    /// 3×3 dilation passes merging nearby changes.
    pub dilate_iterations: usize,
    /// Blobs at or below this pixel area are ignored as noise.
    pub min_blob_area: usize,
    /// Motion is reported only when the blob area fraction exceeds this.
    pub min_area_fraction: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 21,
            diff_threshold: 30,
            dilate_iterations: 2,
            min_blob_area: 100,
            min_area_fraction: 0.001,
        }
    }
}

/// Result of one motion check.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionVerdict {
    pub detected: bool,
    /// Summed area of significant blobs ÷ frame area.
    pub fraction: f64,
    /// Bounding box of the largest significant blob.
    pub largest_region: Option<FaceLocation>,
}

impl MotionVerdict {
    fn none() -> Self {
        Self {
            detected: false,
            fraction: 0.0,
            largest_region: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MotionDetector {
    config: MotionConfig,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Whether a motion area fraction counts as significant (strictly greater
    /// than the configured fraction).
    pub fn is_significant(&self, fraction: f64) -> bool {
        fraction > self.config.min_area_fraction
    }

    /// Compare `frame` against the previous grayscale frame.
    ///
    /// Returns the verdict and the current grayscale frame, which becomes the
    /// caller's new previous frame. Without a usable previous frame (first
    /// call, or a resolution change) the verdict is "no motion".
    pub fn detect(&self, frame: &Frame, previous: Option<&GrayImage>) -> (MotionVerdict, GrayImage) {
        let gray = frame.to_gray();

        let Some(previous) = previous else {
            return (MotionVerdict::none(), gray);
        };
        if previous.dimensions() != gray.dimensions() {
            tracing::debug!(
                previous = ?previous.dimensions(),
                current = ?gray.dimensions(),
                "motion: frame size changed, reseeding"
            );
            return (MotionVerdict::none(), gray);
        }

        let current_blur = filters::gaussian_blur(&gray, self.config.blur_kernel);
        let previous_blur = filters::gaussian_blur(previous, self.config.blur_kernel);

        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let mask = filters::diff_mask(&current_blur, &previous_blur, self.config.diff_threshold);
        let mask = filters::dilate(&mask, w, h, self.config.dilate_iterations);

        let significant: Vec<_> = filters::blobs(&mask, w, h)
            .into_iter()
            .filter(|b| b.area > self.config.min_blob_area)
            .collect();

        let total: usize = significant.iter().map(|b| b.area).sum();
        let fraction = total as f64 / (w * h) as f64;
        let largest_region = significant.iter().max_by_key(|b| b.area).map(|b| {
            FaceLocation::new(
                b.min_y as i32,
                b.max_x as i32 + 1,
                b.max_y as i32 + 1,
                b.min_x as i32,
            )
        });

        let detected = self.is_significant(fraction);
        if detected {
            tracing::debug!(fraction, blobs = significant.len(), "motion detected");
        }

        (
            MotionVerdict {
                detected,
                fraction,
                largest_region,
            },
            gray,
        )
    }
}
