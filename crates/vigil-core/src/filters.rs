//! Image statistics — Sobel gradients, Canny edges, Gaussian blur,
//! binary dilation and connected blobs.
//!
//! Borders are handled by reflection without repeating the edge pixel
//! (`dcb|abcd|cba`), the common default for these operators.

use image::{GrayImage, Luma};
use std::collections::VecDeque;

/// tan(22.5°) and tan(67.5°) scaled by 1000 for integer sector tests.
const TAN_22_5_X1000: i64 = 414;
const TAN_67_5_X1000: i64 = 2414;

/// Reflect an out-of-range index back into `[0, n)`.
fn reflect(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Per-pixel 3×3 Sobel derivatives.
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    /// d/dx
    pub gx: Vec<i32>,
    /// d/dy
    pub gy: Vec<i32>,
}

/// Compute 3×3 Sobel derivatives in both directions.
pub fn sobel(gray: &GrayImage) -> Gradients {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    let raw = gray.as_raw();
    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];

    let px = |x: i64, y: i64| -> i32 {
        raw[reflect(y, h as i64) * w + reflect(x, w as i64)] as i32
    };

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let tl = px(x - 1, y - 1);
            let t = px(x, y - 1);
            let tr = px(x + 1, y - 1);
            let l = px(x - 1, y);
            let r = px(x + 1, y);
            let bl = px(x - 1, y + 1);
            let b = px(x, y + 1);
            let br = px(x + 1, y + 1);

            let idx = y as usize * w + x as usize;
            gx[idx] = (tr + 2 * r + br) - (tl + 2 * l + bl);
            gy[idx] = (bl + 2 * b + br) - (tl + 2 * t + tr);
        }
    }

    Gradients { width: w, height: h, gx, gy }
}

/// Fraction of pixels whose vertical derivative magnitude exceeds `threshold`.
pub fn vertical_density(gray: &GrayImage, threshold: i32) -> f64 {
    let grad = sobel(gray);
    if grad.gy.is_empty() {
        return 0.0;
    }
    let strong = grad.gy.iter().filter(|g| g.abs() > threshold).count();
    strong as f64 / grad.gy.len() as f64
}

/// Canny edge detector with L1 gradient magnitude and 8-connected hysteresis.
///
/// Returns one flag per pixel, row-major.
pub fn canny(gray: &GrayImage, low: i32, high: i32) -> Vec<bool> {
    let grad = sobel(gray);
    let (w, h) = (grad.width, grad.height);
    let mag: Vec<i32> = grad
        .gx
        .iter()
        .zip(grad.gy.iter())
        .map(|(x, y)| x.abs() + y.abs())
        .collect();

    let mag_at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // 0 = suppressed, 1 = weak candidate, 2 = strong edge
    let mut class = vec![0u8; w * h];
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let m = mag[idx];
            if m <= low {
                continue;
            }

            let ax = grad.gx[idx].abs() as i64;
            let ay = grad.gy[idx].abs() as i64;
            let (xi, yi) = (x as i64, y as i64);

            let (n1, n2) = if ay * 1000 < ax * TAN_22_5_X1000 {
                (mag_at(xi - 1, yi), mag_at(xi + 1, yi))
            } else if ay * 1000 > ax * TAN_67_5_X1000 {
                (mag_at(xi, yi - 1), mag_at(xi, yi + 1))
            } else if (grad.gx[idx] ^ grad.gy[idx]) < 0 {
                (mag_at(xi + 1, yi - 1), mag_at(xi - 1, yi + 1))
            } else {
                (mag_at(xi - 1, yi - 1), mag_at(xi + 1, yi + 1))
            };

            if m > n1 && m >= n2 {
                if m > high {
                    class[idx] = 2;
                    queue.push_back(idx);
                } else {
                    class[idx] = 1;
                }
            }
        }
    }

    // Promote weak candidates connected to a strong edge.
    while let Some(idx) = queue.pop_front() {
        let (x, y) = ((idx % w) as i64, (idx / w) as i64);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if class[n] == 1 {
                    class[n] = 2;
                    queue.push_back(n);
                }
            }
        }
    }

    class.into_iter().map(|c| c == 2).collect()
}

/// Fraction of pixels flagged by [`canny`].
pub fn edge_density(gray: &GrayImage, low: i32, high: i32) -> f64 {
    let edges = canny(gray, low, high);
    if edges.is_empty() {
        return 0.0;
    }
    edges.iter().filter(|&&e| e).count() as f64 / edges.len() as f64
}

/// Standard deviation derived from a kernel size when none is given
/// explicitly: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
pub fn sigma_for_kernel(ksize: usize) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Separable Gaussian blur with an odd `ksize × ksize` kernel.
pub fn gaussian_blur(gray: &GrayImage, ksize: usize) -> GrayImage {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 || ksize < 2 {
        return gray.clone();
    }

    let sigma = sigma_for_kernel(ksize);
    let half = (ksize / 2) as i64;
    let mut kernel: Vec<f64> = (-half..=half)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);

    let raw = gray.as_raw();
    let mut horizontal = vec![0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect(x as i64 + k as i64 - half, w as i64);
                acc += raw[y * w + sx] as f64 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect(y as i64 + k as i64 - half, h as i64);
            acc += horizontal[sy * w + x] * weight;
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Binary mask of pixels whose absolute difference exceeds `threshold`.
///
/// Both images must have the same dimensions.
pub fn diff_mask(a: &GrayImage, b: &GrayImage, threshold: u8) -> Vec<bool> {
    a.as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&p, &q)| p.abs_diff(q) > threshold)
        .collect()
}

/// Dilate a binary mask with a 3×3 square, `iterations` times.
pub fn dilate(mask: &[bool], width: usize, height: usize, iterations: usize) -> Vec<bool> {
    let mut current = mask.to_vec();
    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 0..height {
            for x in 0..width {
                if !current[y * width + x] {
                    continue;
                }
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        next[ny * width + nx] = true;
                    }
                }
            }
        }
        current = next;
    }
    current
}

/// An 8-connected group of set mask pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub area: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

/// Label the 8-connected blobs of a binary mask.
pub fn blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
    let mut seen = vec![false; mask.len()];
    let mut found = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut blob = Blob {
            area: 0,
            min_x: start % width,
            min_y: start / width,
            max_x: start % width,
            max_y: start / width,
        };

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            blob.area += 1;
            blob.min_x = blob.min_x.min(x);
            blob.max_x = blob.max_x.max(x);
            blob.min_y = blob.min_y.min(y);
            blob.max_y = blob.max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if mask[n] && !seen[n] {
                        seen[n] = true;
                        stack.push(n);
                    }
                }
            }
        }
        found.push(blob);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_from(w: u32, h: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([f(x, y)]))
    }

    #[test]
    fn test_reflect_indices() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn test_sobel_flat_is_zero() {
        let grad = sobel(&gray_from(6, 6, |_, _| 90));
        assert!(grad.gx.iter().all(|&g| g == 0));
        assert!(grad.gy.iter().all(|&g| g == 0));
    }

    #[test]
    fn test_sobel_horizontal_step_only_vertical_gradient() {
        // Top half 0, bottom half 200: intensity changes along y only.
        let img = gray_from(8, 8, |_, y| if y < 4 { 0 } else { 200 });
        let grad = sobel(&img);
        assert!(grad.gx.iter().all(|&g| g == 0));
        assert_eq!(grad.gy[3 * 8 + 4], 800);
        assert_eq!(grad.gy[4 * 8 + 4], 800);
        assert_eq!(grad.gy[0], 0);
    }

    #[test]
    fn test_vertical_density_step() {
        let img = gray_from(10, 10, |_, y| if y < 5 { 0 } else { 200 });
        // Rows 4 and 5 carry the step.
        assert!((vertical_density(&img, 20) - 0.2).abs() < 1e-9);
        // A vertical step has no d/dy response.
        let img = gray_from(10, 10, |x, _| if x < 5 { 0 } else { 200 });
        assert_eq!(vertical_density(&img, 20), 0.0);
    }

    #[test]
    fn test_canny_flat_has_no_edges() {
        assert_eq!(edge_density(&gray_from(16, 16, |_, _| 120), 30, 100), 0.0);
    }

    #[test]
    fn test_canny_thin_step_edge() {
        let img = gray_from(16, 16, |x, _| if x < 8 { 10 } else { 220 });
        let edges = canny(&img, 30, 100);
        // Non-maximum suppression keeps a single column.
        for y in 0..16 {
            let row: Vec<bool> = edges[y * 16..(y + 1) * 16].to_vec();
            assert_eq!(row.iter().filter(|&&e| e).count(), 1, "row {y}");
            assert!(row[7]);
        }
    }

    #[test]
    fn test_canny_weak_only_is_dropped() {
        // Step of 10 → magnitude 40: above low (30) but never above high (100).
        let img = gray_from(16, 16, |x, _| if x < 8 { 100 } else { 110 });
        assert_eq!(edge_density(&img, 30, 100), 0.0);
        assert!(edge_density(&img, 10, 30) > 0.0);
    }

    #[test]
    fn test_sigma_for_kernel_21() {
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_blur_preserves_flat() {
        let img = gray_from(30, 30, |_, _| 77);
        let blurred = gaussian_blur(&img, 21);
        assert!(blurred.as_raw().iter().all(|&p| p == 77));
    }

    #[test]
    fn test_gaussian_blur_spreads_point() {
        let img = gray_from(41, 41, |x, y| if x == 20 && y == 20 { 255 } else { 0 });
        let blurred = gaussian_blur(&img, 21);
        let center = blurred.get_pixel(20, 20).0[0];
        assert!(center > 0 && center < 255);
        assert!(blurred.get_pixel(21, 20).0[0] > 0);
        assert_eq!(blurred.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_diff_mask_threshold_is_exclusive() {
        let a = gray_from(3, 1, |x, _| [0, 30, 31][x as usize]);
        let b = gray_from(3, 1, |_, _| 0);
        assert_eq!(diff_mask(&a, &b, 30), vec![false, false, true]);
    }

    #[test]
    fn test_dilate_grows_by_iteration() {
        let mut mask = vec![false; 9 * 9];
        mask[4 * 9 + 4] = true;
        let once = dilate(&mask, 9, 9, 1);
        assert_eq!(once.iter().filter(|&&m| m).count(), 9);
        let twice = dilate(&mask, 9, 9, 2);
        assert_eq!(twice.iter().filter(|&&m| m).count(), 25);
    }

    #[test]
    fn test_blobs_are_eight_connected() {
        // Two diagonal pixels form one blob; a distant pixel forms another.
        let mut mask = vec![false; 6 * 6];
        mask[0] = true;
        mask[6 + 1] = true;
        mask[5 * 6 + 5] = true;
        let mut found = blobs(&mask, 6, 6);
        found.sort_by_key(|b| b.area);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].area, 2);
        assert_eq!((found[1].min_x, found[1].max_x), (0, 1));
        assert_eq!((found[0].min_x, found[0].min_y), (5, 5));
    }
}
