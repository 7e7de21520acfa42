//! Frame source that replays still images from a directory in name order.

use std::path::{Path, PathBuf};
use thiserror::Error;
use vigil_core::{Frame, FrameSource, SourceError};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("cannot read replay directory {path}: {source}")]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no png/jpg images in {0}")]
    Empty(PathBuf),
}

/// Replays every image in a directory once, then reports end of stream.
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, ReplayError> {
        let entries = std::fs::read_dir(dir).map_err(|source| ReplayError::Dir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(ReplayError::Empty(dir.to_path_buf()));
        }
        tracing::info!(dir = %dir.display(), frames = files.len(), "replay source opened");
        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn read(&mut self) -> Result<Frame, SourceError> {
        let Some(path) = self.files.get(self.next) else {
            return Err(SourceError::EndOfStream);
        };
        let sequence = self.next as u64;
        self.next += 1;

        let image = image::open(path)
            .map_err(|e| SourceError::Device(format!("{}: {e}", path.display())))?
            .to_rgb8();
        Ok(Frame::new(image, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_replays_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 3, Rgb([10, 10, 10])).save(dir.path().join("b.png")).unwrap();
        RgbImage::from_pixel(4, 3, Rgb([200, 200, 200])).save(dir.path().join("a.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.read().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.image.get_pixel(0, 0).0, [200, 200, 200]);
        let second = source.read().unwrap();
        assert_eq!((second.width(), second.height()), (4, 3));
        assert!(matches!(source.read(), Err(SourceError::EndOfStream)));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ImageDirSource::open(dir.path()), Err(ReplayError::Empty(_))));
    }

    #[test]
    fn test_unreadable_image_is_a_device_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut source = ImageDirSource::open(dir.path()).unwrap();
        assert!(matches!(source.read(), Err(SourceError::Device(_))));
    }
}
