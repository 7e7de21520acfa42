//! V4L2 camera capture via the `v4l` crate.

use crate::convert;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;
use vigil_core::{Frame, FrameSource, SourceError};

const REQUEST_WIDTH: u32 = 640;
const REQUEST_HEIGHT: u32 = 480;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Packed 24-bit RGB.
    Rgb24,
    /// 8-bit grayscale, replicated into RGB.
    Grey,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(b"YUYV") {
            Some(Self::Yuyv)
        } else if fourcc == FourCC::new(b"RGB3") {
            Some(Self::Rgb24)
        } else if fourcc == FourCC::new(b"GREY") {
            Some(Self::Grey)
        } else {
            None
        }
    }
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to query capabilities: {e}")))?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV at VGA; accept whatever convertible format the driver settles on.
        let mut fmt = device
            .format()
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to get format: {e}")))?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUEST_WIDTH;
        fmt.height = REQUEST_HEIGHT;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to set format: {e}")))?;

        let fourcc = negotiated.fourcc;
        let pixel_format = PixelFormat::from_fourcc(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, RGB3, or GREY)"
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            fourcc,
            pixel_format,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Capture a single frame, converted to RGB.
    // TODO: keep one MmapStream open across captures instead of re-queuing buffers per frame.
    pub fn capture_frame(&self) -> Result<Frame, CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let (w, h) = (self.width, self.height);
        let image = match self.pixel_format {
            PixelFormat::Yuyv => convert::yuyv_to_rgb(buf, w, h),
            PixelFormat::Rgb24 => convert::rgb24_to_rgb(buf, w, h),
            PixelFormat::Grey => convert::grey_to_rgb(buf, w, h),
        }
        .map_err(|e| CameraError::CaptureFailed(format!("{:?} conversion failed: {e}", self.pixel_format)))?;

        Ok(Frame::new(image, meta.sequence as u64))
    }

    /// Capture and drop `count` frames so auto-exposure can settle.
    pub fn warm_up(&self, count: usize) -> Result<(), CameraError> {
        for _ in 0..count {
            self.capture_frame()?;
        }
        tracing::debug!(count, "camera warm-up frames discarded");
        Ok(())
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl FrameSource for Camera {
    fn read(&mut self) -> Result<Frame, SourceError> {
        self.capture_frame().map_err(|e| SourceError::Device(e.to_string()))
    }
}
