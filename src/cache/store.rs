use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::manifest::{FORMAT_TAG, MANIFEST_FILE, Manifest, ManifestAtlas, atlas_png_filename};
use super::png::{load_atlas_image, save_atlas_image};
use crate::atlas::Atlas;
use crate::cli::CompressionLevel;
use crate::error::{MosaicError, Result};
use crate::gpu::{ColorPrecision, TextureFilter};

/// Settings the cached layouts were produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMeta {
    pub max_atlas_size: u32,
    pub texture_filter: TextureFilter,
    pub color_precision: ColorPrecision,
}

/// Atlases restored from a cache
#[derive(Debug, Clone)]
pub struct CachedResources {
    pub meta: CacheMeta,
    pub atlases: Vec<Atlas>,
}

/// Whether layouts packed for `cached_max` can be reused on a device whose
/// limit is `current_max`.
///
/// A larger limit might pack the same images into fewer atlases, so a cache
/// holding several atlases is stale once the limit grows. A smaller limit
/// invalidates any atlas that no longer fits.
pub fn cache_compatible(cached_max: u32, current_max: u32, atlas_sides: &[u32]) -> bool {
    if cached_max < current_max && atlas_sides.len() > 1 {
        return false;
    }
    if cached_max > current_max && atlas_sides.iter().any(|&side| side > current_max) {
        return false;
    }
    true
}

/// A directory holding packed atlases and their manifest
#[derive(Debug, Clone)]
pub struct AtlasCache {
    dir: PathBuf,
    compress: Option<CompressionLevel>,
}

impl AtlasCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            compress: None,
        }
    }

    pub fn compress(mut self, level: Option<CompressionLevel>) -> Self {
        self.compress = level;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the manifest without loading any image. `Ok(None)` if there is
    /// no cache.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| self.corrupt(e.to_string()))?;
        let manifest = serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        Ok(Some(manifest))
    }

    /// Load cached atlases usable with a device limited to `current_max`.
    ///
    /// Returns `None` on any miss. Corrupt caches and caches written in
    /// another format are deleted.
    pub fn load(&self, current_max: u32) -> Option<CachedResources> {
        let manifest = match self.read_manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                info!("No atlas cache at {}", self.dir.display());
                return None;
            }
            Err(e) => {
                warn!("{}; discarding", e);
                self.discard();
                return None;
            }
        };

        if manifest.format_tag != FORMAT_TAG {
            warn!(
                "Atlas cache {} has format '{}', expected '{}'; discarding",
                self.dir.display(),
                manifest.format_tag,
                FORMAT_TAG
            );
            self.discard();
            return None;
        }

        if !cache_compatible(manifest.max_atlas_size, current_max, &manifest.atlas_sides()) {
            info!(
                "Atlas cache packed for {}px is not reusable at {}px",
                manifest.max_atlas_size, current_max
            );
            return None;
        }

        match self.load_atlases(&manifest) {
            Ok(atlases) => {
                info!(
                    "Loaded {} atlas(es) from cache {}",
                    atlases.len(),
                    self.dir.display()
                );
                Some(CachedResources {
                    meta: CacheMeta {
                        max_atlas_size: manifest.max_atlas_size,
                        texture_filter: manifest.texture_filter,
                        color_precision: manifest.color_precision,
                    },
                    atlases,
                })
            }
            Err(e) => {
                warn!("{}; discarding", e);
                self.discard();
                None
            }
        }
    }

    fn load_atlases(&self, manifest: &Manifest) -> Result<Vec<Atlas>> {
        manifest
            .atlases
            .iter()
            .map(|entry| {
                if !entry.side.is_power_of_two() {
                    return Err(self.corrupt(format!("atlas side {} is not a power of two", entry.side)));
                }
                if let Some(region) = entry.regions.iter().find(|r| !r.fits_in(entry.side)) {
                    return Err(self.corrupt(format!(
                        "region '{}' lies outside its {}px atlas",
                        region.key, entry.side
                    )));
                }
                let canvas = load_atlas_image(&self.dir.join(&entry.image))
                    .map_err(|e| self.corrupt(e.to_string()))?;
                if canvas.dimensions() != (entry.side, entry.side) {
                    return Err(self.corrupt(format!(
                        "'{}' is {}x{}, manifest says {}",
                        entry.image,
                        canvas.width(),
                        canvas.height(),
                        entry.side
                    )));
                }
                Ok(Atlas {
                    side: entry.side,
                    canvas,
                    regions: entry.regions.clone(),
                })
            })
            .collect()
    }

    /// Write `atlases` as the new cache contents.
    ///
    /// Previous contents are replaced. On failure the partial cache is
    /// removed before the error is returned.
    pub fn save(&self, atlases: &[Atlas], meta: &CacheMeta) -> Result<()> {
        match self.write(atlases, meta) {
            Ok(()) => {
                info!(
                    "Saved {} atlas(es) to cache {}",
                    atlases.len(),
                    self.dir.display()
                );
                Ok(())
            }
            Err(e) => {
                self.discard();
                Err(MosaicError::CacheWrite {
                    path: self.dir.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn write(&self, atlases: &[Atlas], meta: &CacheMeta) -> Result<()> {
        if self.dir.is_dir() {
            self.remove_cache_files()
                .map_err(|e| MosaicError::OutputWrite {
                    path: self.dir.clone(),
                    source: e,
                })?;
        }
        fs::create_dir_all(&self.dir).map_err(|e| MosaicError::OutputWrite {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut entries = Vec::with_capacity(atlases.len());
        for (index, atlas) in atlases.iter().enumerate() {
            let image = atlas_png_filename(index);
            let path = self.dir.join(&image);
            save_atlas_image(atlas, &path, self.compress)?;
            debug!("Wrote {}", path.display());
            entries.push(ManifestAtlas {
                image,
                side: atlas.side,
                regions: atlas.regions.clone(),
            });
        }

        let manifest = Manifest {
            format_tag: FORMAT_TAG.to_string(),
            max_atlas_size: meta.max_atlas_size,
            texture_filter: meta.texture_filter,
            color_precision: meta.color_precision,
            atlases: entries,
        };
        let path = self.dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(&manifest).map_err(|e| MosaicError::CacheWrite {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, content).map_err(|e| MosaicError::OutputWrite { path, source: e })?;

        Ok(())
    }

    /// Remove the manifest and atlas images, then the directory unless
    /// something else lives in it
    pub fn discard(&self) {
        if !self.dir.is_dir() {
            return;
        }
        if let Err(e) = self.remove_cache_files() {
            warn!("Failed to remove atlas cache {}: {}", self.dir.display(), e);
            return;
        }
        if fs::remove_dir(&self.dir).is_err() {
            debug!("Keeping non-empty directory {}", self.dir.display());
        }
    }

    fn remove_cache_files(&self) -> std::io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && is_cache_file(&path) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn corrupt(&self, reason: String) -> MosaicError {
        MosaicError::CacheCorrupt {
            path: self.dir.clone(),
            reason,
        }
    }
}

/// Files the cache writes; nothing else in its directory is touched
fn is_cache_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name == MANIFEST_FILE || (name.starts_with("atlas_") && name.ends_with(".png"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasBuilder;
    use crate::sprite::ImageDescriptor;
    use image::{Rgba, RgbaImage};

    fn meta(max_atlas_size: u32) -> CacheMeta {
        CacheMeta {
            max_atlas_size,
            texture_filter: TextureFilter::LINEAR,
            color_precision: ColorPrecision::Normal,
        }
    }

    fn sample_atlases() -> Vec<Atlas> {
        let images = vec![
            ImageDescriptor::new("red", 0, RgbaImage::from_pixel(10, 6, Rgba([255, 0, 0, 255]))),
            ImageDescriptor::new("blue", 0, RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]))),
        ];
        AtlasBuilder::new(64).build(&images).unwrap()
    }

    #[test]
    fn test_cache_compatible_rules() {
        // same limit is always fine
        assert!(cache_compatible(1024, 1024, &[1024, 512]));
        // bigger device: one atlas cannot shrink further
        assert!(cache_compatible(512, 2048, &[512]));
        assert!(!cache_compatible(512, 2048, &[512, 256]));
        // smaller device: every atlas must still fit
        assert!(cache_compatible(2048, 1024, &[1024, 256]));
        assert!(!cache_compatible(2048, 1024, &[2048]));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        let atlases = sample_atlases();
        cache.save(&atlases, &meta(64)).unwrap();

        let loaded = cache.load(64).unwrap();
        assert_eq!(loaded.meta, meta(64));
        assert_eq!(loaded.atlases.len(), atlases.len());
        assert_eq!(loaded.atlases[0].regions, atlases[0].regions);
        assert_eq!(loaded.atlases[0].canvas, atlases[0].canvas);
    }

    #[test]
    fn test_missing_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("nothing"));
        assert!(cache.load(1024).is_none());
        assert!(cache.read_manifest().unwrap().is_none());
    }

    #[test]
    fn test_format_tag_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        cache.save(&sample_atlases(), &meta(64)).unwrap();

        let manifest_path = cache.dir().join(MANIFEST_FILE);
        let content = fs::read_to_string(&manifest_path).unwrap();
        fs::write(&manifest_path, content.replace(FORMAT_TAG, "mosaic-atlas-v0")).unwrap();

        assert!(cache.load(64).is_none());
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_corrupt_manifest_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.dir().join(MANIFEST_FILE), "{ not json").unwrap();

        assert!(matches!(
            cache.read_manifest(),
            Err(MosaicError::CacheCorrupt { .. })
        ));
        assert!(cache.load(64).is_none());
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_missing_image_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        cache.save(&sample_atlases(), &meta(64)).unwrap();
        fs::remove_file(cache.dir().join(atlas_png_filename(0))).unwrap();

        assert!(cache.load(64).is_none());
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_incompatible_cache_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        let atlases = sample_atlases();
        let side = atlases[0].side;
        cache.save(&atlases, &meta(side)).unwrap();

        assert!(cache.load(side / 2).is_none());
        assert!(cache.dir().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_failed_save_reports_cache_write() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let cache = AtlasCache::new(&blocker);
        let err = cache.save(&sample_atlases(), &meta(64)).unwrap_err();
        assert!(matches!(err, MosaicError::CacheWrite { .. }));
        assert!(blocker.is_file());
    }

    #[test]
    fn test_discard_leaves_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path());
        cache.save(&sample_atlases(), &meta(64)).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        cache.discard();
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join(MANIFEST_FILE).exists());
        assert!(!dir.path().join(atlas_png_filename(0)).exists());
    }

    #[test]
    fn test_save_replaces_stale_atlases() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AtlasCache::new(dir.path().join("atlases"));
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.dir().join(atlas_png_filename(7)), "stale").unwrap();

        cache.save(&sample_atlases(), &meta(64)).unwrap();
        assert!(!cache.dir().join(atlas_png_filename(7)).exists());
        assert!(cache.load(64).is_some());
    }
}
