//! Writes alert snapshots as timestamped JPEGs.

use chrono::Local;
use std::path::PathBuf;
use vigil_core::{Frame, SnapshotRef, SnapshotRequester};

pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn file_name(label: &str) -> String {
        format!("{label}_{}.jpg", Local::now().format("%Y-%m-%d_%H-%M-%S"))
    }
}

impl SnapshotRequester for SnapshotWriter {
    fn capture(&self, frame: &Frame, label: &str) -> Option<SnapshotRef> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create snapshot directory");
            return None;
        }

        let path = self.dir.join(Self::file_name(label));
        match frame.image.save(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "snapshot saved");
                Some(SnapshotRef(path.to_string_lossy().into_owned()))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "snapshot write failed");
                None
            }
        }
    }
}
