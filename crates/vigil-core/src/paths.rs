//! Default on-disk locations shared by the daemon and the CLI.

use std::path::PathBuf;

/// `$XDG_DATA_HOME/vigil`, falling back to `~/.local/share/vigil`.
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("vigil")
}

pub fn default_model_dir() -> PathBuf {
    data_dir().join("models")
}

pub fn default_gallery_path() -> PathBuf {
    data_dir().join("gallery.json")
}

pub fn default_snapshot_dir() -> PathBuf {
    data_dir().join("snapshots")
}

pub fn default_alert_log() -> PathBuf {
    data_dir().join("alerts.jsonl")
}

/// Read a path from `key`, or use `default`.
pub fn env_path(key: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| default())
}
