//! Single-shot V4L2 camera: grab a frame, save it as a picture, stop

use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::Device;

use super::control;
use super::decoder::decode_frame;
use super::frame::{Frame, FrameMetadata, PixelFormat};
use super::CameraBackend;
use crate::error::{CaptureError, ControlError};
use crate::CaptureConfig;

struct Negotiated {
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

/// Camera backed by a V4L2 device node
pub struct V4l2Camera {
    config: CaptureConfig,
    // Declared before `_device` so the stream is dropped (STREAMOFF) first
    stream: Option<MmapStream<'static>>,
    _device: Option<Device>,
    negotiated: Option<Negotiated>,
    sequence: u64,
}

impl V4l2Camera {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stream: None,
            _device: None,
            negotiated: None,
            sequence: 0,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the device, negotiate a format and start memory-mapped streaming.
    pub fn start_stream(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = Device::with_path(&self.config.device)?;
        let caps = device.query_caps()?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(CaptureError::NotCaptureDevice);
        }

        let mut fmt = device.format()?;
        fmt.width = self.config.width;
        fmt.height = self.config.height;
        fmt.fourcc = self.config.format.fourcc();
        let fmt = device.set_format(&fmt)?;

        // Drivers may substitute their own format; accept it if we can decode it
        let format = PixelFormat::from_fourcc(fmt.fourcc)
            .ok_or(CaptureError::UnsupportedFormat(self.config.format))?;
        if format != self.config.format {
            warn!("Driver chose {:?} instead of {:?}", format, self.config.format);
        }

        let stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, self.config.buffer_count)?;

        self.negotiated = Some(Negotiated {
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
            format,
        });
        self.stream = Some(stream);
        self._device = Some(device);
        info!(
            "Capture stream started at {}x{} with {} buffers",
            fmt.width, fmt.height, self.config.buffer_count
        );
        Ok(())
    }

    /// Dequeue one frame, discarding the configured number of warm-up frames first.
    #[instrument(skip(self))]
    pub fn capture_frame(&mut self) -> Result<Frame, CaptureError> {
        self.start_stream()?;

        let (Some(stream), Some(negotiated)) = (self.stream.as_mut(), self.negotiated.as_ref())
        else {
            return Err(CaptureError::NotCaptureDevice);
        };

        for _ in 0..self.config.warmup_frames {
            stream.next()?;
        }

        let timestamp = Instant::now();
        let (buf, meta) = stream.next()?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = Bytes::copy_from_slice(&buf[..used]);

        self.sequence += 1;

        Ok(Frame {
            data,
            meta: FrameMetadata {
                sequence: self.sequence,
                width: negotiated.width,
                height: negotiated.height,
                stride: negotiated.stride,
                format: negotiated.format,
                device_timestamp: Some(
                    Duration::from_secs(meta.timestamp.sec as u64)
                        + Duration::from_micros(meta.timestamp.usec as u64),
                ),
            },
            timestamp,
        })
    }
}

impl CameraBackend for V4l2Camera {
    fn disable_auto_gain(&mut self) -> Result<(), ControlError> {
        control::disable_auto_gain(&self.config.device)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    fn save_frame_to_file(&mut self, path: &Path) -> Result<(), CaptureError> {
        let started = Instant::now();
        let frame = self.capture_frame()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let img = decode_frame(
            &frame.data,
            frame.meta.width,
            frame.meta.height,
            frame.meta.stride,
            frame.meta.format,
        )?;

        img.save(path).map_err(|source| CaptureError::Save {
            path: path.to_path_buf(),
            source,
        })?;

        metrics::histogram!("camsense_capture_time_ms")
            .record(started.elapsed().as_millis() as f64);
        debug!(
            sequence = frame.meta.sequence,
            device_timestamp = ?frame.meta.device_timestamp,
            frame_age_ms = frame.timestamp.elapsed().as_millis() as u64,
            "saved frame"
        );
        Ok(())
    }

    fn stop_capture(&mut self) {
        if self.stream.take().is_some() {
            debug!("Capture stream stopped");
        }
        self._device = None;
        self.negotiated = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(device: &str) -> CaptureConfig {
        CaptureConfig {
            device: device.into(),
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn missing_device_fails_to_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = V4l2Camera::new(config("/dev/no-such-video-node"));

        let err = camera
            .save_frame_to_file(&dir.path().join("pic.png"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Device(_)));
        assert!(!camera.is_streaming());
        assert!(!dir.path().join("pic.png").exists());
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let mut camera = V4l2Camera::new(config("/dev/no-such-video-node"));
        camera.stop_capture();
        camera.stop_capture();
        assert!(!camera.is_streaming());
    }

    #[test]
    #[ignore] // needs a camera: cargo test -- --ignored
    fn saves_a_picture_from_video0() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        let mut camera = V4l2Camera::new(CaptureConfig::default());

        camera.save_frame_to_file(&path).unwrap();
        assert!(camera.is_streaming());
        camera.stop_capture();
        assert!(!camera.is_streaming());
        assert!(image::open(&path).is_ok());
    }
}
