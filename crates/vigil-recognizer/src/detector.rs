//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the RGB frame to 640×640, decodes the three anchor-free
//! stride heads (boxes plus five-point landmarks when the model exports them)
//! and suppresses overlapping boxes.

use crate::alignment::Landmarks;
use crate::RecognizerError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use vigil_core::FaceLocation;

const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// Maps letterboxed coordinates back to the source frame.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: usize,
    pad_y: usize,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: usize) -> (Self, u32, u32) {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target as u32);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target as u32);
        let letterbox = Self {
            scale,
            pad_x: (target - new_w as usize) / 2,
            pad_y: (target - new_h as usize) / 2,
        };
        (letterbox, new_w, new_h)
    }

    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x as f32) / self.scale, (y - self.pad_y as f32) / self.scale)
    }
}

/// One scored detection in source-frame pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub landmarks: Option<Landmarks>,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Round to whole pixels and clip to the frame.
    pub fn to_location(&self, width: u32, height: u32) -> FaceLocation {
        let clip = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as i32;
        FaceLocation::new(
            clip(self.y1, height),
            clip(self.x2, width),
            clip(self.y2, height),
            clip(self.x1, width),
        )
    }
}

/// Output tensor indices for one stride: (score, bbox, kps).
type StrideOutputIndices = (usize, usize, Option<usize>);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()?.with_intra_threads(2)?.commit_from_file(model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        tracing::info!(path = %model_path.display(), outputs = ?output_names, "loaded SCRFD model");

        if output_names.len() < 6 {
            return Err(RecognizerError::InferenceFailed(format!(
                "SCRFD model requires score and bbox outputs for 3 strides, got {} outputs",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self { session, stride_indices })
    }

    /// Detect faces, highest confidence first.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, RecognizerError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        let (input, letterbox) = preprocess(image);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut detections = Vec::new();
        for (pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[pos];
            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| RecognizerError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| RecognizerError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;
            let kps = match kps_idx {
                Some(idx) => Some(
                    outputs[idx]
                        .try_extract_tensor::<f32>()
                        .map_err(|e| RecognizerError::InferenceFailed(format!("kps stride {stride}: {e}")))?
                        .1,
                ),
                None => None,
            };

            detections.extend(decode_stride(
                scores,
                bboxes,
                kps,
                stride,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        Ok(nms(detections, SCRFD_NMS_THRESHOLD))
    }
}

/// Letterbox an RGB frame into a normalized NCHW tensor.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let (letterbox, new_w, new_h) = Letterbox::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    // Padding stays at 0.0, which is the normalized mean.
    let mut tensor = Array4::<f32>::zeros((1, 3, SCRFD_INPUT_SIZE, SCRFD_INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (tx, ty) = (x as usize + letterbox.pad_x, y as usize + letterbox.pad_y);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = (pixel[c] as f32 - SCRFD_MEAN) / SCRFD_STD;
        }
    }
    (tensor, letterbox)
}

/// Map outputs by name ("score_8", "bbox_8", "kps_8", ...), falling back to
/// the standard positional layout [scores 8/16/32, bboxes 8/16/32, kps 8/16/32].
/// Landmark outputs are optional; models without them align nothing.
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| names.iter().position(|n| *n == format!("{prefix}_{stride}"));

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?, find("kps", stride))))
        .collect();

    match named {
        Some(v) => [v[0], v[1], v[2]],
        None => {
            tracing::info!(?names, "SCRFD: output names not recognized, using positional mapping");
            let kps = |i: usize| (names.len() >= 9).then_some(i);
            [(0, 3, kps(6)), (1, 4, kps(7)), (2, 5, kps(8))]
        }
    }
}

fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    kps: Option<&[f32]>,
    stride: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<Detection> {
    let grid_w = SCRFD_INPUT_SIZE / stride;
    let grid_h = SCRFD_INPUT_SIZE / stride;
    let num_anchors = grid_w * grid_h * SCRFD_ANCHORS_PER_CELL;
    let s = stride as f32;

    let mut detections = Vec::new();
    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }
        let Some(d) = bboxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };

        let cell = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_x = (cell % grid_w) as f32 * s;
        let anchor_y = (cell / grid_w) as f32 * s;

        let (x1, y1) = letterbox.unmap(anchor_x - d[0] * s, anchor_y - d[1] * s);
        let (x2, y2) = letterbox.unmap(anchor_x + d[2] * s, anchor_y + d[3] * s);
        let landmarks = kps.and_then(|k| k.get(idx * 10..idx * 10 + 10)).map(|k| {
            std::array::from_fn(|i| letterbox.unmap(anchor_x + k[i * 2] * s, anchor_y + k[i * 2 + 1] * s))
        });
        detections.push(Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            landmarks,
        });
    }
    detections
}

fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<Detection> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(k, &det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let inter = Detection {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
        confidence: 0.0,
        landmarks: None,
    }
    .area();
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}
