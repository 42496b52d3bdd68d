//! Camera sensor blocks: brightness, average colour and "take a picture".

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::host::{BlockSpec, Host, Palette, ValueHandler};
use super::Plugin;
use crate::capture::decoder::load_pixel_buffer;
use crate::capture::{CameraBackend, V4l2Camera};
use crate::reduce::{reduce, PixelBuffer, ReduceMode, Reduction};
use crate::utils::probe_device;
use crate::{CaptureConfig, Config, PluginConfig};

const PALETTE: &str = "sensor";

struct Inner {
    /// `None` when no capture device was found; never filled in later
    camera: Option<Box<dyn CameraBackend>>,
    image_path: PathBuf,
}

/// Exposes a camera to the host interpreter.
///
/// Primitive handlers share the plugin state through an `Rc`, so the plugin
/// and every handler it registers must stay on the host's thread.
pub struct CameraPlugin {
    inner: Rc<RefCell<Inner>>,
}

/// Where pictures are written: inside the activity data dir when there is one.
pub fn image_path_for(config: &PluginConfig, data_dir: Option<&Path>) -> PathBuf {
    match data_dir {
        Some(dir) => dir.join("data").join(&config.image_name),
        None => config.fallback_dir.join(&config.image_name),
    }
}

impl CameraPlugin {
    /// Probe the configured device once; the result fixes the capture status for good.
    pub fn new(config: &Config, host: &dyn Host) -> Self {
        let image_path = image_path_for(&config.plugin, host.data_dir().as_deref());

        let camera = match probe_device(&config.capture.device) {
            Some(found) => {
                info!("Using capture device: {} ({})", found.path, found.card);
                let capture = CaptureConfig {
                    format: found.pick_format(config.capture.format),
                    ..config.capture.clone()
                };
                Some(Box::new(V4l2Camera::new(capture)) as Box<dyn CameraBackend>)
            }
            None => {
                info!("No capture device at {}", config.capture.device);
                None
            }
        };

        Self::with_backend(camera, image_path)
    }

    pub fn with_backend(camera: Option<Box<dyn CameraBackend>>, image_path: PathBuf) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner { camera, image_path })),
        }
    }

    pub fn status_report(&self) -> bool {
        let status = self.inner.borrow().camera.is_some();
        info!("Reporting camera status: {}", status);
        status
    }

    pub fn image_path(&self) -> PathBuf {
        self.inner.borrow().image_path.clone()
    }

    /// Media block: save a picture and point the host at it.
    pub fn take_picture(&self, host: &mut dyn Host) {
        take_picture(&self.inner, host)
    }

    /// Capture, decode at canvas size and reduce.
    ///
    /// Luminance readings update the `luminance` label; RGB readings push
    /// B, G, R onto the host heap. Failures come back as sentinels.
    pub fn read_camera(&self, host: &mut dyn Host, mode: ReduceMode) -> Reduction {
        read_camera(&self.inner, host, mode)
    }
}

impl Plugin for CameraPlugin {
    fn setup(&mut self, host: &mut dyn Host) {
        host.add_palette(Palette {
            name: PALETTE.into(),
            help: "Palette of sensor blocks".into(),
        });

        if self.inner.borrow().camera.is_none() {
            return;
        }

        host.register_primitive(
            BlockSpec::value(
                "luminance",
                PALETTE,
                "brightness",
                "light level detected by camera",
            )
            .with_prim_name("luminance"),
            luminance_handler(&self.inner),
        );

        // Deprecated alias kept so old projects still load
        host.register_primitive(
            BlockSpec::value(
                "read_camera",
                PALETTE,
                "brightness",
                "Average RGB color from camera is pushed to the stack",
            )
            .with_prim_name("luminance"),
            luminance_handler(&self.inner),
        );

        let inner = Rc::clone(&self.inner);
        host.register_media_primitive(
            BlockSpec::content("camera", PALETTE, " ", "camera output").with_default("CAMERA"),
            Box::new(move |host| take_picture(&inner, host)),
        );
    }

    fn stop(&mut self) {
        if let Some(camera) = self.inner.borrow_mut().camera.as_mut() {
            camera.stop_capture();
        }
    }
}

fn luminance_handler(inner: &Rc<RefCell<Inner>>) -> ValueHandler {
    let inner = Rc::clone(inner);
    Box::new(move |host| match read_camera(&inner, host, ReduceMode::Luminance) {
        Reduction::Luminance(value) => value,
        Reduction::Rgb(avg) => avg.luminance(),
    })
}

fn take_picture(inner: &RefCell<Inner>, host: &mut dyn Host) {
    let mut inner = inner.borrow_mut();
    let Inner { camera, image_path } = &mut *inner;
    let Some(camera) = camera.as_mut() else {
        return;
    };

    let saved = camera.save_frame_to_file(image_path);
    camera.stop_capture();

    match saved {
        Ok(()) => {
            metrics::counter!("camsense_captures_total").increment(1);
            host.set_last_image_path(image_path);
        }
        Err(e) => {
            warn!("Failed to take picture: {}", e);
            metrics::counter!("camsense_capture_failures_total").increment(1);
        }
    }
}

fn read_camera(inner: &RefCell<Inner>, host: &mut dyn Host, mode: ReduceMode) -> Reduction {
    let (width, height) = host.canvas_size();

    let buffer = {
        let mut inner = inner.borrow_mut();
        let Inner { camera, image_path } = &mut *inner;
        match camera.as_mut() {
            Some(camera) if width > 0 && height > 0 => {
                capture_buffer(&mut **camera, image_path, width as u32, height as u32)
            }
            _ => None,
        }
    };

    let reduction = reduce(buffer.as_ref(), mode);
    match reduction {
        Reduction::Luminance(value) if !reduction.is_sentinel() => {
            host.update_label_value("luminance", value);
        }
        Reduction::Luminance(_) => {}
        Reduction::Rgb(avg) => {
            for value in avg.to_array() {
                host.push_heap(value);
            }
        }
    }
    reduction
}

fn capture_buffer(
    camera: &mut dyn CameraBackend,
    path: &Path,
    width: u32,
    height: u32,
) -> Option<PixelBuffer> {
    if let Err(e) = camera.disable_auto_gain() {
        debug!("AUTOGAIN control not available: {}", e);
    }

    let saved = camera.save_frame_to_file(path);
    camera.stop_capture();

    match saved {
        Ok(()) => {
            metrics::counter!("camsense_captures_total").increment(1);
            load_pixel_buffer(path, width, height)
        }
        Err(e) => {
            warn!("No frame captured: {}", e);
            metrics::counter!("camsense_capture_failures_total").increment(1);
            None
        }
    }
}
