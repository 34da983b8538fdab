//! Command line and surface defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::model::Color4;

pub const DEFAULT_WIDTH: u32 = 500;
pub const DEFAULT_HEIGHT: u32 = 500;

#[derive(Debug, Parser)]
#[command(name = "annotate-canvas", version, about)]
pub struct Cli {
    /// Image to load when the window opens
    pub image: Option<PathBuf>,
}

/// How a fresh surface starts out before any image arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub background: Color4,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background: Color4::from_rgba8(0xf0, 0xf0, 0xf0, 1.0),
        }
    }
}
