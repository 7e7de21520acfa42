//! Frame type and region helpers — RGB frames, grayscale conversion, crops.

use crate::types::FaceLocation;
use image::{GenericImageView, GrayImage, Luma, RgbImage};

/// A captured RGB video frame (height × width × 3).
#[derive(Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Monotonic sequence number assigned by the frame source.
    pub sequence: u64,
}

/// Pixel-space rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Total pixel count.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Convert a face location to a region, if it lies inside the frame
    /// and has positive area.
    pub fn checked_region(&self, location: &FaceLocation) -> Option<Region> {
        if location.left < 0
            || location.top < 0
            || location.right <= location.left
            || location.bottom <= location.top
            || location.right as i64 > self.width() as i64
            || location.bottom as i64 > self.height() as i64
        {
            return None;
        }
        Some(Region {
            x: location.left as u32,
            y: location.top as u32,
            width: (location.right - location.left) as u32,
            height: (location.bottom - location.top) as u32,
        })
    }

    /// Copy out a sub-image. The region must already be inside the frame.
    pub fn crop(&self, region: Region) -> RgbImage {
        self.image
            .view(region.x, region.y, region.width, region.height)
            .to_image()
    }

    /// Grayscale copy of the whole frame.
    pub fn to_gray(&self) -> GrayImage {
        to_grayscale(&self.image)
    }
}

/// ITU-R BT.601 luma, matching the weights most capture pipelines use.
pub fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
        Luma([luma.min(255) as u8])
    })
}

/// Arithmetic mean of a grayscale image (0.0–255.0).
pub fn mean_brightness(gray: &GrayImage) -> f64 {
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|&p| p as f64).sum::<f64>() / raw.len() as f64
}

/// Population standard deviation over every channel value of an RGB image.
pub fn color_std_dev(rgb: &RgbImage) -> f64 {
    let raw = rgb.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let n = raw.len() as f64;
    let mean = raw.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = raw.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
