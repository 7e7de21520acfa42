//! On-disk store of trained face encodings, keyed by label.

use crate::types::{FaceEmbedding, KnownFace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GALLERY_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gallery file is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported gallery version {0}")]
    Version(u32),
}

#[derive(Serialize, Deserialize)]
struct GalleryFile {
    version: u32,
    faces: Vec<KnownFace>,
}

/// JSON file holding every known-face encoding.
///
/// A label may appear many times, one entry per enrolled image.
pub struct GalleryStore {
    path: PathBuf,
}

impl GalleryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the gallery. A missing file is an empty gallery.
    pub fn load(&self) -> Result<Vec<KnownFace>, GalleryError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "no gallery found; every face will be unknown");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(GalleryError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let file: GalleryFile = serde_json::from_slice(&data)?;
        if file.version != GALLERY_VERSION {
            return Err(GalleryError::Version(file.version));
        }
        Ok(file.faces)
    }

    /// Write the gallery, replacing the file atomically.
    pub fn save(&self, faces: &[KnownFace]) -> Result<(), GalleryError> {
        let io_err = |source| GalleryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = GalleryFile {
            version: GALLERY_VERSION,
            faces: faces.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Append encodings under `label` and save.
    pub fn enroll(&self, label: &str, embeddings: Vec<FaceEmbedding>) -> Result<usize, GalleryError> {
        let mut faces = self.load()?;
        let added = embeddings.len();
        faces.extend(embeddings.into_iter().map(|embedding| KnownFace {
            label: label.to_string(),
            embedding,
        }));
        self.save(&faces)?;
        tracing::info!(label, added, total = faces.len(), "gallery updated");
        Ok(added)
    }
}

/// Distinct labels in first-seen order.
pub fn labels(faces: &[KnownFace]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for face in faces {
        if !seen.contains(&face.label.as_str()) {
            seen.push(&face.label);
        }
    }
    seen
}
