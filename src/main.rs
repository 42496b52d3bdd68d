//! Camsense console host: loads the camera plugin and runs its blocks from the command line

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camsense::plugin::host::{BlockSpec, MediaHandler, Palette, ValueHandler};
use camsense::{utils, CameraPlugin, Config, Host, Plugin, ReduceMode, Reduction};
use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: camsense [--config <file.toml>] [--data-dir <dir>] \
<status|detect|luminance|read_camera|rgb|camera>";

/// Stands in for the visual-programming host: keeps the registry, a heap
/// and a canvas the size of the configured capture.
struct ConsoleHost {
    canvas: (i32, i32),
    data_dir: Option<PathBuf>,
    palettes: Vec<Palette>,
    primitives: HashMap<String, (BlockSpec, ValueHandler)>,
    media: HashMap<String, (BlockSpec, MediaHandler)>,
    heap: Vec<i32>,
    last_image: Option<PathBuf>,
}

impl ConsoleHost {
    fn new(canvas: (i32, i32), data_dir: Option<PathBuf>) -> Self {
        Self {
            canvas,
            data_dir,
            palettes: Vec::new(),
            primitives: HashMap::new(),
            media: HashMap::new(),
            heap: Vec::new(),
            last_image: None,
        }
    }

    fn run_value(&mut self, name: &str) -> Option<i32> {
        let (block, mut handler) = self.primitives.remove(name)?;
        let value = handler(self);
        self.primitives.insert(name.to_string(), (block, handler));
        Some(value)
    }

    fn run_media(&mut self, name: &str) -> bool {
        let Some((block, mut handler)) = self.media.remove(name) else {
            return false;
        };
        handler(self);
        self.media.insert(name.to_string(), (block, handler));
        true
    }
}

impl Host for ConsoleHost {
    fn add_palette(&mut self, palette: Palette) {
        debug!("palette {}: {}", palette.name, palette.help);
        self.palettes.push(palette);
    }

    fn register_primitive(&mut self, block: BlockSpec, handler: ValueHandler) {
        debug!("value block {} ({})", block.name, block.style);
        self.primitives.insert(block.name.clone(), (block, handler));
    }

    fn register_media_primitive(&mut self, block: BlockSpec, handler: MediaHandler) {
        debug!("media block {} ({})", block.name, block.style);
        self.media.insert(block.name.clone(), (block, handler));
    }

    fn canvas_size(&self) -> (i32, i32) {
        self.canvas
    }

    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }

    fn set_last_image_path(&mut self, path: &Path) {
        self.last_image = Some(path.to_path_buf());
    }

    fn update_label_value(&mut self, label: &str, value: i32) {
        info!("{} = {}", label, value);
    }

    fn push_heap(&mut self, value: i32) {
        self.heap.push(value);
    }
}

struct Args {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    command: String,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut data_dir = None;
    let mut command = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().ok_or_else(|| eyre!("--config requires a value"))?,
                ))
            }
            "--data-dir" => {
                data_dir = Some(PathBuf::from(
                    args.next().ok_or_else(|| eyre!("--data-dir requires a value"))?,
                ))
            }
            "-h" | "--help" => return Err(eyre!(USAGE)),
            other if command.is_none() => command = Some(other.to_string()),
            other => return Err(eyre!("unexpected argument {other}\n{USAGE}")),
        }
    }

    Ok(Args {
        config,
        data_dir,
        command: command.ok_or_else(|| eyre!(USAGE))?,
    })
}

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("camsense=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let args = parse_args()?;

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    camsense::CONFIG.store(Arc::new(config.clone()));

    if args.command == "detect" {
        match utils::auto_detect_device() {
            Some(dev) => println!("{} {} {:?}", dev.path, dev.card, dev.format),
            None => println!("no capture device found"),
        }
        return Ok(());
    }

    let canvas = (config.capture.width as i32, config.capture.height as i32);
    let mut host = ConsoleHost::new(canvas, args.data_dir);
    let mut plugin = CameraPlugin::new(&config, &host);
    plugin.setup(&mut host);
    debug!(
        "{} palettes, {} value blocks, {} media blocks",
        host.palettes.len(),
        host.primitives.len(),
        host.media.len()
    );
    plugin.start();

    match args.command.as_str() {
        "status" => println!("{}", plugin.status_report()),
        "luminance" | "read_camera" => {
            // Unregistered when there is no camera; report the sentinel like the block would
            let value = host.run_value(&args.command).unwrap_or(-1);
            println!("{value}");
        }
        "rgb" => {
            if let Reduction::Rgb(avg) = plugin.read_camera(&mut host, ReduceMode::Rgb) {
                info!("heap: {:?}", host.heap);
                println!("{} {} {}", avg.b, avg.g, avg.r);
            }
        }
        "camera" => {
            if host.run_media("camera") {
                if let Some(path) = &host.last_image {
                    println!("{}", path.display());
                }
            } else {
                println!("no camera");
            }
        }
        other => return Err(eyre!("unknown command {other}\n{USAGE}")),
    }

    plugin.stop();
    plugin.quit();
    info!("Camsense shutting down");
    Ok(())
}
