use serde::{Deserialize, Serialize};

use crate::atlas::Region;
use crate::gpu::{ColorPrecision, TextureFilter};

/// Identifies the on-disk layout; caches with any other tag are discarded.
pub const FORMAT_TAG: &str = "mosaic-atlas-v1";

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_tag: String,
    /// Atlas size limit the layouts were computed for
    pub max_atlas_size: u32,
    pub texture_filter: TextureFilter,
    pub color_precision: ColorPrecision,
    pub atlases: Vec<ManifestAtlas>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAtlas {
    /// PNG file name, relative to the cache directory
    pub image: String,
    pub side: u32,
    pub regions: Vec<Region>,
}

impl Manifest {
    pub fn atlas_sides(&self) -> Vec<u32> {
        self.atlases.iter().map(|a| a.side).collect()
    }

    pub fn region_count(&self) -> usize {
        self.atlases.iter().map(|a| a.regions.len()).sum()
    }
}

pub fn atlas_png_filename(index: usize) -> String {
    format!("atlas_{}.png", index)
}
