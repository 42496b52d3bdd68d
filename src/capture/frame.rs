use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use v4l::FourCC;

/// A raw frame as dequeued from the device
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub meta: FrameMetadata,
    /// When the frame left the driver
    pub timestamp: Instant,
}

#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per line as reported by the driver, padding included
    pub stride: u32,
    pub format: PixelFormat,
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

/// Pixel formats we can turn into a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl PixelFormat {
    pub fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
            PixelFormat::Bgr24 => FourCC::new(b"BGR3"),
            PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
        }
    }

    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        [
            PixelFormat::Mjpeg,
            PixelFormat::Yuyv4,
            PixelFormat::Rgb24,
            PixelFormat::Bgr24,
        ]
        .into_iter()
        .find(|format| format.fourcc() == fourcc)
    }
}
