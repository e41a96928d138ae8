use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::gpu::TextureFilter;

#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(version, about = "Sprite atlas packer and cache tool", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack images into atlases and write an atlas cache directory
    Pack(PackArgs),
    /// Summarize an atlas cache directory
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Input image files or directories; each one is packed as its own group
    #[arg(required_unless_present = "config")]
    pub input: Vec<PathBuf>,

    /// Load settings from a mosaic config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory to write [default: atlas-cache]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Maximum atlas side in pixels [default: 2048]
    #[arg(long, value_name = "N")]
    pub max_size: Option<u32>,

    /// Transparent border between images in pixels [default: 4]
    #[arg(short, long, value_name = "N")]
    pub border: Option<u32>,

    /// Texture filter recorded for the atlases [default: nearest]
    #[arg(long, value_enum)]
    pub filter: Option<FilterArg>,

    /// Reduce atlases to 4 bits per channel
    #[arg(long)]
    pub low_bit: bool,

    /// Compress PNG output (0-6 or 'max'). Default level is 2 if flag is present without value.
    #[arg(long, value_name = "LEVEL", default_missing_value = "2", num_args = 0..=1)]
    pub compress: Option<CompressionLevel>,

    /// Also save the merged settings as a mosaic config file
    #[arg(long, value_name = "FILE")]
    pub write_config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Atlas cache directory
    pub dir: PathBuf,

    /// Report whether the cache can be used on a device with this texture limit
    #[arg(long, value_name = "N")]
    pub max_size: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Texture filter shorthand for the command line
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum FilterArg {
    /// Nearest neighbor (best for pixel art)
    #[default]
    Nearest,
    /// Bilinear interpolation
    Linear,
}

impl From<FilterArg> for TextureFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::Nearest => TextureFilter::NEAREST,
            FilterArg::Linear => TextureFilter::LINEAR,
        }
    }
}

/// PNG compression level (0-6 or max)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression
    Max,
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            Ok(CompressionLevel::Max)
        } else {
            s.parse::<u8>()
                .map_err(|_e| format!("invalid compression level: {}", s))
                .and_then(|n| {
                    if n <= 6 {
                        Ok(CompressionLevel::Level(n))
                    } else {
                        Err(format!("compression level must be 0-6 or 'max', got {}", n))
                    }
                })
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Level(2)
    }
}
