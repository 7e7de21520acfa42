//! Offline enrollment: encode faces from image files into the gallery.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vigil_core::gallery::GalleryStore;
use vigil_core::{FaceEmbedding, FaceRecognizer, Frame};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Expand directories into their image files, sorted by name.
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("cannot read {}", path.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            found.sort();
            images.extend(found);
        } else {
            images.push(path.clone());
        }
    }
    Ok(images)
}

/// Label for encodings from `path`: the explicit label or the file stem,
/// with `prefix` prepended.
pub fn label_for(path: &Path, label: Option<&str>, prefix: &str) -> String {
    let base = match label {
        Some(label) => label.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    format!("{prefix}{base}")
}

/// Encode every face in one image.
fn encode_image<R: FaceRecognizer>(recognizer: &mut R, path: &Path) -> Result<Vec<FaceEmbedding>> {
    let image = image::open(path)
        .with_context(|| format!("could not load {}", path.display()))?
        .to_rgb8();
    let frame = Frame::new(image, 0);

    let locations = recognizer.locate(&frame)?;
    locations
        .iter()
        .map(|loc| recognizer.embed(&frame, loc).map_err(anyhow::Error::from))
        .collect()
}

/// Encode `images` and append them to the gallery. Returns encodings added.
pub fn enroll<R: FaceRecognizer>(
    recognizer: &mut R,
    store: &GalleryStore,
    images: &[PathBuf],
    label: Option<&str>,
    prefix: &str,
) -> Result<usize> {
    let mut added = 0;
    for path in images {
        let name = label_for(path, label, prefix);
        match encode_image(recognizer, path) {
            Ok(encodings) if encodings.is_empty() => {
                println!("  {}: no face found, skipped", path.display());
            }
            Ok(encodings) => {
                println!("  {}: {} face(s) as {name}", path.display(), encodings.len());
                added += store.enroll(&name, encodings)?;
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = ?e, "enroll: image skipped");
                println!("  {}: {e:#}, skipped", path.display());
            }
        }
    }
    Ok(added)
}
