//! Brightness buckets and the detection thresholds tuned for each.

use serde::Serialize;
use std::fmt;

/// Ambient lighting regime derived from mean grayscale brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingBucket {
    VeryDim,
    Dim,
    Normal,
    Bright,
}

impl fmt::Display for LightingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LightingBucket::VeryDim => "very-dim",
            LightingBucket::Dim => "dim",
            LightingBucket::Normal => "normal",
            LightingBucket::Bright => "bright",
        })
    }
}

/// Thresholds applied to face and body regions under one lighting regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightingProfile {
    pub bucket: LightingBucket,
    /// Minimum fraction of Canny edge pixels.
    pub edge_density: f64,
    /// Minimum fraction of pixels with a strong vertical derivative.
    pub vertical_density: f64,
    /// Minimum standard deviation of colour values.
    pub color_std: f64,
    /// Minimum inter-frame changed-pixel fraction for body regions.
    pub motion_density: f64,
    /// Starting embedding-distance tolerance before angle/size adjustments.
    pub base_tolerance: f64,
}

/// Upper (exclusive) brightness edge of each bucket except the last.
const VERY_DIM_BELOW: f64 = 30.0;
const DIM_BELOW: f64 = 60.0;
const NORMAL_BELOW: f64 = 120.0;

const VERY_DIM: LightingProfile = LightingProfile {
    bucket: LightingBucket::VeryDim,
    edge_density: 0.015,
    vertical_density: 0.003,
    color_std: 10.0,
    motion_density: 0.0001,
    base_tolerance: 0.65,
};

const DIM: LightingProfile = LightingProfile {
    bucket: LightingBucket::Dim,
    edge_density: 0.02,
    vertical_density: 0.005,
    color_std: 15.0,
    motion_density: 0.0002,
    base_tolerance: 0.6,
};

const NORMAL: LightingProfile = LightingProfile {
    bucket: LightingBucket::Normal,
    edge_density: 0.025,
    vertical_density: 0.008,
    color_std: 20.0,
    motion_density: 0.0003,
    base_tolerance: 0.55,
};

const BRIGHT: LightingProfile = LightingProfile {
    bucket: LightingBucket::Bright,
    edge_density: 0.03,
    vertical_density: 0.01,
    color_std: 25.0,
    motion_density: 0.0005,
    base_tolerance: 0.5,
};

/// All profiles in increasing brightness order.
pub const PROFILES: [LightingProfile; 4] = [VERY_DIM, DIM, NORMAL, BRIGHT];

/// Map a mean brightness (0–255) to its lighting profile.
///
/// Each bucket includes its lower edge: 30.0 is dim, 60.0 normal, 120.0 bright.
pub fn select_profile(brightness: f64) -> &'static LightingProfile {
    if brightness < VERY_DIM_BELOW {
        &PROFILES[0]
    } else if brightness < DIM_BELOW {
        &PROFILES[1]
    } else if brightness < NORMAL_BELOW {
        &PROFILES[2]
    } else {
        &PROFILES[3]
    }
}
