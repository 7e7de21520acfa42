//! Five-point face alignment.
//!
//! Maps detector landmarks onto the ArcFace 112×112 reference positions with a
//! least-squares similarity transform (scale, rotation, translation) and warps
//! the frame into that canonical crop.

use image::{Rgb, RgbImage};

/// Eye, eye, nose, mouth corner, mouth corner.
pub type Landmarks = [(f32, f32); 5];

pub const ALIGNED_SIZE: u32 = 112;

const ARCFACE_REFERENCE: Landmarks = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Similarity transform `dst = [a -b; b a] · src + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Closed-form least-squares fit over centred point sets.
    /// `None` when the source points are degenerate.
    fn estimate(src: &Landmarks, dst: &Landmarks) -> Option<Self> {
        let mean = |pts: &Landmarks| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(x, y), p| (x + p.0, y + p.1));
            (sx / 5.0, sy / 5.0)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let (mut dot, mut cross, mut norm) = (0.0f32, 0.0f32, 0.0f32);
        for (s, d) in src.iter().zip(dst) {
            let (sx, sy) = (s.0 - smx, s.1 - smy);
            let (dx, dy) = (d.0 - dmx, d.1 - dmy);
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }
        if norm < 1e-6 {
            return None;
        }

        let (a, b) = (dot / norm, cross / norm);
        Some(Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        })
    }

    /// Map a destination point back into the source frame.
    fn invert(&self, x: f32, y: f32) -> (f32, f32) {
        let det = self.a * self.a + self.b * self.b;
        let (dx, dy) = (x - self.tx, y - self.ty);
        ((self.a * dx + self.b * dy) / det, (-self.b * dx + self.a * dy) / det)
    }
}

/// Bilinear sample; pixels outside the frame read as black.
fn sample(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (x0, y0) = (x.floor() as i64, y.floor() as i64);
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);
    let at = |px: i64, py: i64, c: usize| -> f32 {
        if px >= 0 && py >= 0 && px < image.width() as i64 && py < image.height() as i64 {
            image.get_pixel(px as u32, py as u32)[c] as f32
        } else {
            0.0
        }
    };

    let mut out = [0u8; 3];
    for (c, v) in out.iter_mut().enumerate() {
        let top = at(x0, y0, c) * (1.0 - fx) + at(x0 + 1, y0, c) * fx;
        let bottom = at(x0, y0 + 1, c) * (1.0 - fx) + at(x0 + 1, y0 + 1, c) * fx;
        *v = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Warp the face described by `landmarks` into a 112×112 aligned crop.
///
/// Returns `None` if the landmarks collapse to a single point.
pub fn align_face(image: &RgbImage, landmarks: &Landmarks) -> Option<RgbImage> {
    let transform = Similarity::estimate(landmarks, &ARCFACE_REFERENCE)?;
    Some(RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |x, y| {
        let (sx, sy) = transform.invert(x as f32, y as f32);
        sample(image, sx, sy)
    }))
}
