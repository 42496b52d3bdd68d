pub mod capture;
pub mod error;
pub mod plugin;
pub mod reduce;
pub mod utils;

use std::path::{Path, PathBuf};

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

pub use capture::{CameraBackend, Frame, V4l2Camera};
pub use error::{CaptureError, ConfigError, ControlError, PixelBufferError};
pub use plugin::{camera::CameraPlugin, host::Host, Plugin};
pub use reduce::{reduce, ChannelAverages, PixelBuffer, ReduceMode, Reduction};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Prefix for environment overrides, e.g. `CAMSENSE_CAPTURE__DEVICE=/dev/video2`
pub const ENV_PREFIX: &str = "CAMSENSE";

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub plugin: PluginConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
    /// Frames thrown away before the one that is saved, so exposure settles
    pub warmup_frames: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub image_name: String,
    /// Used when the host has no activity data directory
    pub fallback_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            width: 640,
            height: 480,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
            warmup_frames: 2,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            image_name: "turtlepic.png".into(),
            fallback_dir: PathBuf::from("/tmp"),
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `CAMSENSE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.device.is_empty() {
            return Err(ConfigError::Invalid("capture.device is empty".into()));
        }
        if self.capture.buffer_count == 0 {
            return Err(ConfigError::Invalid("capture.buffer_count must be > 0".into()));
        }
        if self.plugin.image_name.is_empty() {
            return Err(ConfigError::Invalid("plugin.image_name is empty".into()));
        }
        Ok(())
    }
}
