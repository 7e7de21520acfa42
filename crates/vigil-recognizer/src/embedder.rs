//! ArcFace face encoder via ONNX Runtime.
//!
//! Produces 512-dimensional encodings from aligned 112×112 faces (or plain
//! crops resized to that size), using the w600k_r50 ArcFace model.

use crate::RecognizerError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use vigil_core::FaceEmbedding;

const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
const ARCFACE_EMBEDDING_DIM: usize = 512;
/// Encodings are scaled to half-unit length so Euclidean distances span 0..1.
const ENCODING_NORM: f32 = 0.5;

pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()?.with_intra_threads(2)?.commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );
        Ok(Self { session })
    }

    /// Encode one face image.
    pub fn embed(&mut self, face: &RgbImage) -> Result<FaceEmbedding, RecognizerError> {
        let input = preprocess(face);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }
        Ok(FaceEmbedding::new(normalize(raw)))
    }
}

fn preprocess(face: &RgbImage) -> Array4<f32> {
    let size = ARCFACE_INPUT_SIZE;
    let resized = imageops::resize(face, size, size, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

fn normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm * ENCODING_NORM).collect()
    } else {
        raw.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_resizes_and_normalizes() {
        let face = RgbImage::from_pixel(40, 50, image::Rgb([255, 127, 0]));
        let tensor = preprocess(&face);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert!((tensor[[0, 0, 5, 5]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 1, 5, 5]] - (127.0 - 127.5) / 127.5).abs() < 0.01);
        assert!((tensor[[0, 2, 111, 111]] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_normalize_to_half_unit() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.3).abs() < 1e-6);
        assert!((v[1] - 0.4).abs() < 1e-6);
        // Opposite encodings are at most one unit apart.
        let a = FaceEmbedding::new(normalize(&[1.0, 0.0]));
        let b = FaceEmbedding::new(normalize(&[-1.0, 0.0]));
        assert!((a.distance(&b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
