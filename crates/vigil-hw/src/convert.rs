//! Raw buffer to RGB conversion for the pixel formats the camera negotiates.

use image::RgbImage;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), FrameError> {
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

fn image_from(width: u32, height: u32, out: Vec<u8>) -> Result<RgbImage, FrameError> {
    let actual = out.len();
    RgbImage::from_raw(width, height, out).ok_or(FrameError::InvalidLength {
        expected: (width * height * 3) as usize,
        actual,
    })
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 limited-range YCbCr to RGB, in 8.8 fixed point.
fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as i32 - 16).max(0);
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    [
        clamp_u8((298 * c + 409 * e + 128) >> 8),
        clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp_u8((298 * c + 516 * d + 128) >> 8),
    ]
}

/// Convert packed YUYV (4:2:2) to RGB.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share
/// the chroma pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 2) as usize;
    check_len(yuyv, expected)?;

    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
        out.extend_from_slice(&ycbcr_to_rgb(y0, u, v));
        out.extend_from_slice(&ycbcr_to_rgb(y1, u, v));
    }
    image_from(width, height, out)
}

/// Packed 24-bit RGB, copied as-is.
pub fn rgb24_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 3) as usize;
    check_len(buf, expected)?;
    image_from(width, height, buf[..expected].to_vec())
}

/// 8-bit grayscale replicated into all three channels.
pub fn grey_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    check_len(buf, expected)?;
    let out = buf[..expected].iter().flat_map(|&g| [g, g, g]).collect();
    image_from(width, height, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_black_and_white() {
        // Y=16 is black, Y=235 is white at neutral chroma.
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // Approximately pure red in BT.601 limited range.
        let yuyv = vec![81, 90, 81, 240];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        let [r, g, b] = rgb.get_pixel(0, 0).0;
        assert!(r > 240 && g < 10 && b < 10, "{r} {g} {b}");
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_rgb(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_grey_replicates_channels() {
        let rgb = grey_to_rgb(&[7, 200], 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(1, 0).0, [200, 200, 200]);
        assert!(grey_to_rgb(&[7], 2, 1).is_err());
    }

    #[test]
    fn test_rgb24_ignores_trailing_padding() {
        let rgb = rgb24_to_rgb(&[1, 2, 3, 4, 5, 6, 0, 0], 2, 1).unwrap();
        assert_eq!(rgb.into_raw(), vec![1, 2, 3, 4, 5, 6]);
    }
}
