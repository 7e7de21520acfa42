//! vigil-hw — Frame sources for the Vigil engine.
//!
//! Provides V4L2-based camera capture producing RGB frames, and a replay
//! source that feeds still images from a directory.

pub mod camera;
pub mod convert;
pub mod replay;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use convert::FrameError;
pub use replay::{ImageDirSource, ReplayError};
