pub mod control;
pub mod decoder;
pub mod frame;
pub mod v4l2;

use std::path::Path;

use crate::error::{CaptureError, ControlError};

pub use frame::Frame;
pub use frame::PixelFormat;
pub use v4l2::V4l2Camera;

/// The capture operations the plugin sequences. Every call blocks.
pub trait CameraBackend {
    /// Best-effort tuning step; callers log and discard the error.
    fn disable_auto_gain(&mut self) -> Result<(), ControlError>;

    fn save_frame_to_file(&mut self, path: &Path) -> Result<(), CaptureError>;

    fn stop_capture(&mut self);
}
