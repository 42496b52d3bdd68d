//! What a plugin needs from the application hosting it: a block registry and
//! a small window onto the running interpreter.

use std::fmt;
use std::path::{Path, PathBuf};

/// Called by the interpreter when a value block runs; returns the block's value.
pub type ValueHandler = Box<dyn FnMut(&mut dyn Host) -> i32>;

/// Called by the interpreter when a media block runs.
pub type MediaHandler = Box<dyn FnMut(&mut dyn Host)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub help: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Box,
    BoxMedia,
}

impl fmt::Display for BlockStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStyle::Box => f.write_str("box-style"),
            BlockStyle::BoxMedia => f.write_str("box-style-media"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Evaluates to a number
    Value,
    /// Produces media such as a picture
    Content,
}

/// How a block is drawn and described in the palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub name: String,
    pub palette: String,
    pub style: BlockStyle,
    pub kind: BlockKind,
    pub label: String,
    pub help: String,
    /// Primitive the block dispatches to when it differs from `name`
    pub prim_name: Option<String>,
    pub default: Option<String>,
}

impl BlockSpec {
    pub fn value(name: &str, palette: &str, label: &str, help: &str) -> Self {
        Self {
            name: name.into(),
            palette: palette.into(),
            style: BlockStyle::Box,
            kind: BlockKind::Value,
            label: label.into(),
            help: help.into(),
            prim_name: None,
            default: None,
        }
    }

    pub fn content(name: &str, palette: &str, label: &str, help: &str) -> Self {
        Self {
            style: BlockStyle::BoxMedia,
            kind: BlockKind::Content,
            ..Self::value(name, palette, label, help)
        }
    }

    pub fn with_prim_name(mut self, prim_name: &str) -> Self {
        self.prim_name = Some(prim_name.into());
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.into());
        self
    }
}

pub trait Host {
    fn add_palette(&mut self, palette: Palette);

    fn register_primitive(&mut self, block: BlockSpec, handler: ValueHandler);

    fn register_media_primitive(&mut self, block: BlockSpec, handler: MediaHandler);

    /// Canvas width and height in pixels; frames are decoded at this size.
    fn canvas_size(&self) -> (i32, i32);

    /// Per-activity storage, when the host runs inside a managed activity.
    fn data_dir(&self) -> Option<PathBuf> {
        None
    }

    /// Picture shown by the next media block that displays "the last image".
    fn set_last_image_path(&mut self, path: &Path);

    fn update_label_value(&mut self, label: &str, value: i32);

    /// Push onto the interpreter heap.
    fn push_heap(&mut self, value: i32);
}
