use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use v4l::{capability::Flags, video::Capture, Device};

use crate::capture::frame::PixelFormat;

// Detected capture device info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundDevice {
    pub path: String,
    pub card: String,
    /// Decodable formats the device offers
    pub formats: Vec<PixelFormat>,
    /// Best of `formats`, if there is one
    pub format: Option<PixelFormat>,
}

impl FoundDevice {
    /// `wanted` if the device offers it, otherwise the best offered format.
    /// Devices that offer nothing we decode are left to the driver.
    pub fn pick_format(&self, wanted: PixelFormat) -> PixelFormat {
        match self.format {
            Some(best) if !self.formats.contains(&wanted) => {
                warn!("{} does not offer {:?}, using {:?}", self.path, wanted, best);
                best
            }
            _ => wanted,
        }
    }
}

/// Check that `path` is a V4L2 node with video capture capability.
pub fn probe_device(path: &str) -> Option<FoundDevice> {
    if !Path::new(path).exists() {
        debug!("{} does not exist", path);
        return None;
    }

    let dev = match Device::with_path(path) {
        Ok(dev) => dev,
        Err(e) => {
            debug!("cannot open {}: {}", path, e);
            return None;
        }
    };
    let caps = dev.query_caps().ok()?;
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        debug!("{} ({}) is not a capture device", path, caps.card);
        return None;
    }

    // Prefer MJPEG, then YUYV, then packed RGB
    let offered: Vec<PixelFormat> = dev
        .enum_formats()
        .map(|formats| {
            formats
                .into_iter()
                .filter_map(|fmt| PixelFormat::from_fourcc(fmt.fourcc))
                .collect()
        })
        .unwrap_or_default();
    let format = [
        PixelFormat::Mjpeg,
        PixelFormat::Yuyv4,
        PixelFormat::Rgb24,
        PixelFormat::Bgr24,
    ]
    .into_iter()
    .find(|f| offered.contains(f));

    Some(FoundDevice {
        path: path.to_string(),
        card: caps.card,
        formats: offered,
        format,
    })
}

/// Auto-detect the first usable capture device
pub fn auto_detect_device() -> Option<FoundDevice> {
    info!("Auto-detecting capture devices...");

    let found = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .find_map(|path| probe_device(&path));

    if let Some(dev) = &found {
        info!("Found capture device: {} - {}", dev.path, dev.card);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(formats: Vec<PixelFormat>) -> FoundDevice {
        FoundDevice {
            path: "/dev/video0".into(),
            card: "test".into(),
            format: formats.first().copied(),
            formats,
        }
    }

    #[test]
    fn keeps_configured_format_when_offered() {
        let dev = device(vec![PixelFormat::Mjpeg, PixelFormat::Yuyv4]);
        assert_eq!(dev.pick_format(PixelFormat::Yuyv4), PixelFormat::Yuyv4);
    }

    #[test]
    fn falls_back_to_best_offered_format() {
        let dev = device(vec![PixelFormat::Yuyv4]);
        assert_eq!(dev.pick_format(PixelFormat::Mjpeg), PixelFormat::Yuyv4);
    }

    #[test]
    fn unknown_formats_leave_choice_to_driver() {
        let dev = device(Vec::new());
        assert_eq!(dev.pick_format(PixelFormat::Mjpeg), PixelFormat::Mjpeg);
    }

    #[test]
    fn missing_node_is_not_a_device() {
        assert_eq!(probe_device("/dev/no-such-video-node"), None);
    }

    #[test]
    fn regular_file_is_not_a_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(probe_device(file.path().to_str().unwrap()), None);
    }

    #[test]
    #[ignore] // needs a camera: cargo test -- --ignored
    fn detects_attached_camera() {
        let dev = auto_detect_device().expect("no camera attached");
        assert!(dev.path.starts_with("/dev/video"));
    }
}
