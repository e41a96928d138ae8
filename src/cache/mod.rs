//! On-disk cache of packed atlases.
//!
//! Packing is deterministic, so a cache only saves the packing and
//! composition work; it can always be thrown away and rebuilt from the
//! source images.

mod manifest;
mod png;
mod store;

pub use manifest::{FORMAT_TAG, MANIFEST_FILE, Manifest, ManifestAtlas, atlas_png_filename};
pub use png::{load_atlas_image, save_atlas_image};
pub use store::{AtlasCache, CacheMeta, CachedResources, cache_compatible};
