//! Error types for the capture side of the plugin.
//!
//! None of these ever reach the host: the plugin turns them into sentinel
//! readings at the primitive boundary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of the optional auto-gain tuning step
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("video capture device {path} not available: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{request} failed for control {id:#x}: {errno}")]
    Ioctl {
        request: &'static str,
        id: u32,
        errno: nix::errno::Errno,
    },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("device error: {0}")]
    Device(#[from] io::Error),

    #[error("device doesn't support video capture")]
    NotCaptureDevice,

    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(crate::capture::PixelFormat),

    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("failed to save frame to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelBufferError {
    #[error("pixel buffer length {0} is not a multiple of 3")]
    Ragged(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
