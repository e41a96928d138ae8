use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::atlas::DEFAULT_BORDER;
use crate::cli::CompressionLevel;
use crate::error::{MosaicError, Result};
use crate::gpu::{ColorPrecision, TextureFilter};
use crate::render::{DEFAULT_MAX_SPRITES, MAX_SPRITES_PER_BATCH};

/// PNG compression level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompressConfig {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression ("max")
    Max(String),
}

impl CompressConfig {
    pub fn level(&self) -> Result<CompressionLevel> {
        match self {
            CompressConfig::Level(n) if *n <= 6 => Ok(CompressionLevel::Level(*n)),
            CompressConfig::Level(n) => Err(MosaicError::InvalidConfig(format!(
                "compression level must be 0-6 or \"max\", got {n}"
            ))),
            CompressConfig::Max(s) if s == "max" => Ok(CompressionLevel::Max),
            CompressConfig::Max(s) => Err(MosaicError::InvalidConfig(format!(
                "compression level must be 0-6 or \"max\", got \"{s}\""
            ))),
        }
    }
}

impl From<CompressionLevel> for CompressConfig {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Level(n) => CompressConfig::Level(n),
            CompressionLevel::Max => CompressConfig::Max("max".to_string()),
        }
    }
}

/// A group of input images sharing a base priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// File, directory or glob pattern, relative to the config file
    pub pattern: String,
    #[serde(default)]
    pub priority: i32,
}

/// Mosaic configuration file structure.
///
/// All paths in the config are relative to the config file location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Config file version (currently 1)
    pub version: u32,
    /// Transparent pixels kept between packed images
    pub border: u32,
    /// Sprites drawn per batch before a forced flush
    pub max_sprites_per_batch: usize,
    /// Cap on the atlas side below the device limit
    pub max_atlas_size: Option<u32>,
    pub texture_filter: TextureFilter,
    /// Allocate the offscreen targets masked drawing needs
    pub masking: bool,
    pub color_precision: ColorPrecision,
    /// Where packed atlases are cached between runs
    pub cache_dir: Option<PathBuf>,
    /// PNG compression for cached atlases (optional)
    pub compress: Option<CompressConfig>,
    /// Images to pack, used by the command line tool
    pub inputs: Vec<InputConfig>,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            version: 1,
            border: DEFAULT_BORDER,
            max_sprites_per_batch: DEFAULT_MAX_SPRITES,
            max_atlas_size: None,
            texture_filter: TextureFilter::NEAREST,
            masking: false,
            color_precision: ColorPrecision::Normal,
            cache_dir: None,
            compress: None,
            inputs: Vec::new(),
        }
    }
}

impl MosaicConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SPRITES_PER_BATCH).contains(&self.max_sprites_per_batch) {
            return Err(MosaicError::InvalidConfig(format!(
                "max_sprites_per_batch must be between 1 and {MAX_SPRITES_PER_BATCH}, got {}",
                self.max_sprites_per_batch
            )));
        }
        if self.max_atlas_size == Some(0) {
            return Err(MosaicError::InvalidConfig(
                "max_atlas_size must be greater than zero".to_string(),
            ));
        }
        if let Some(compress) = &self.compress {
            compress.level()?;
        }
        Ok(())
    }

    /// Compression level for cached atlas images, if any
    pub fn compress_level(&self) -> Result<Option<CompressionLevel>> {
        self.compress.as_ref().map(CompressConfig::level).transpose()
    }

    /// Largest atlas side usable on a device reporting `device_max`
    pub fn effective_max_atlas_size(&self, device_max: u32) -> u32 {
        self.max_atlas_size.map_or(device_max, |cap| cap.min(device_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: MosaicConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MosaicConfig::default());
        assert_eq!(config.border, 4);
        assert_eq!(config.max_sprites_per_batch, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_full_config() {
        let json = r#"{
            "max_atlas_size": 1024,
            "texture_filter": { "min": "linear", "mag": "nearest", "mipmap": "linear" },
            "masking": true,
            "color_precision": "low",
            "cache_dir": "cache",
            "compress": "max",
            "inputs": [
                { "pattern": "ui/*.png", "priority": 0 },
                { "pattern": "levels" }
            ]
        }"#;
        let config: MosaicConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_atlas_size, Some(1024));
        assert_eq!(config.texture_filter.mipmap, Some(crate::gpu::Interpolation::Linear));
        assert_eq!(config.color_precision, ColorPrecision::Low);
        assert_eq!(config.inputs[1].priority, 0);
        assert_eq!(config.compress_level().unwrap(), Some(CompressionLevel::Max));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = MosaicConfig {
            max_sprites_per_batch: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MosaicError::InvalidConfig(_))));

        let config = MosaicConfig {
            max_sprites_per_batch: MAX_SPRITES_PER_BATCH + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MosaicConfig {
            max_atlas_size: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MosaicConfig {
            compress: Some(CompressConfig::Level(9)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_max_atlas_size() {
        let mut config = MosaicConfig::default();
        assert_eq!(config.effective_max_atlas_size(4096), 4096);
        config.max_atlas_size = Some(1024);
        assert_eq!(config.effective_max_atlas_size(4096), 1024);
        assert_eq!(config.effective_max_atlas_size(512), 512);
    }
}
