use chrono::TimeDelta;
use std::path::PathBuf;
use std::time::Duration;
use vigil_core::paths;

/// Which message bus the control surface is exported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Session,
    System,
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Replay still images from this directory instead of the camera.
    pub replay_dir: Option<PathBuf>,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    pub gallery_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub alert_log: PathBuf,
    /// Pause between decision cycles.
    pub frame_interval: Duration,
    /// How long an unknown face must stay before a threat alert.
    pub unknown_dwell: TimeDelta,
    /// Number of alert delivery workers.
    pub delivery_workers: usize,
    /// Alerts buffered ahead of delivery.
    pub queue_capacity: usize,
    /// Number of warmup frames to discard at startup (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    pub bus: BusKind,
}

impl Config {
    /// Load configuration from `VIGIL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let bus = match std::env::var("VIGIL_BUS").as_deref() {
            Ok("system") => BusKind::System,
            _ => BusKind::Session,
        };

        Self {
            camera_device: std::env::var("VIGIL_CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_string()),
            replay_dir: std::env::var("VIGIL_REPLAY_DIR").ok().map(PathBuf::from),
            model_dir: paths::env_path("VIGIL_MODEL_DIR", paths::default_model_dir),
            gallery_path: paths::env_path("VIGIL_GALLERY_PATH", paths::default_gallery_path),
            snapshot_dir: paths::env_path("VIGIL_SNAPSHOT_DIR", paths::default_snapshot_dir),
            alert_log: paths::env_path("VIGIL_ALERT_LOG", paths::default_alert_log),
            frame_interval: Duration::from_millis(env_u64("VIGIL_FRAME_INTERVAL_MS", 100)),
            unknown_dwell: TimeDelta::milliseconds((env_f32("VIGIL_UNKNOWN_DWELL_SECS", 5.0) * 1000.0) as i64),
            delivery_workers: env_usize("VIGIL_DELIVERY_WORKERS", 2).max(1),
            queue_capacity: env_usize("VIGIL_QUEUE_CAPACITY", 64).max(1),
            warmup_frames: env_usize("VIGIL_WARMUP_FRAMES", 4),
            bus,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
