//! GPU-resident atlases and the key index over them.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};

use crate::atlas::{Atlas, Region};
use crate::error::{MosaicError, Result};
use crate::gpu::{ColorPrecision, GraphicsDevice, PixelFormat, TextureDesc, TextureFilter, TextureId};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Everything needed to draw one packed image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    pub texture: TextureId,
    /// Texture coordinates for the top-left, top-right, bottom-left and
    /// bottom-right quad corners
    pub tex_coords: [[f32; 2]; 4],
    pub rotated: bool,
    /// Width over height of the source image
    pub aspect_ratio: f32,
}

impl Drawable {
    fn new(texture: TextureId, region: &Region, side: u32) -> Self {
        let side = side as f32;
        let left = region.top_left.0 as f32 / side;
        let top = region.top_left.1 as f32 / side;
        let right = region.bottom_right.0 as f32 / side;
        let bottom = region.bottom_right.1 as f32 / side;

        let tex_coords = if region.rotated {
            [[left, bottom], [left, top], [right, bottom], [right, top]]
        } else {
            [[left, top], [right, top], [left, bottom], [right, bottom]]
        };
        let (width, height) = region.source_size();

        Self {
            texture,
            tex_coords,
            rotated: region.rotated,
            aspect_ratio: width as f32 / height as f32,
        }
    }
}

/// Owns the atlas textures and maps keys to [`Drawable`]s.
///
/// Keys are kept sorted and looked up by binary search. Every table gets a
/// process-unique [`id`](ResourceTable::id) so that cached lookups can tell
/// a rebuilt table from the one they were resolved against.
#[derive(Debug)]
pub struct ResourceTable {
    id: u64,
    textures: Vec<TextureId>,
    keys: Vec<String>,
    drawables: Vec<Drawable>,
}

impl ResourceTable {
    /// Upload one texture per atlas and index every region.
    ///
    /// If an upload fails, the textures created so far are released before
    /// the error is returned.
    pub fn build<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        atlases: &[Atlas],
        filter: TextureFilter,
        precision: ColorPrecision,
    ) -> Result<Self> {
        let mut entries: Vec<(&Region, usize)> = atlases
            .iter()
            .enumerate()
            .flat_map(|(i, atlas)| atlas.regions.iter().map(move |r| (r, i)))
            .collect();
        entries.sort_by(|a, b| a.0.key.cmp(&b.0.key));
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0.key == pair[1].0.key) {
            return Err(MosaicError::DuplicateKey(pair[0].0.key.clone()));
        }

        let format = PixelFormat::from(precision);
        let mut textures = Vec::with_capacity(atlases.len());
        for (i, atlas) in atlases.iter().enumerate() {
            let label = format!("atlas_{}", i);
            let created = device.create_texture(&TextureDesc {
                label: &label,
                width: atlas.side,
                height: atlas.side,
                format,
                filter,
                pixels: Some(atlas.canvas.as_raw()),
            });
            match created {
                Ok(texture) => textures.push(texture),
                Err(e) => {
                    for texture in textures {
                        device.delete_texture(texture);
                    }
                    return Err(e);
                }
            }
        }

        let (keys, drawables) = entries
            .into_iter()
            .map(|(region, atlas)| {
                let drawable = Drawable::new(textures[atlas], region, atlases[atlas].side);
                (region.key.clone(), drawable)
            })
            .unzip();

        let table = Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            textures,
            keys,
            drawables,
        };
        info!(
            "Uploaded {} atlas texture(s) with {} drawables",
            table.textures.len(),
            table.keys.len()
        );
        Ok(table)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, key: &str) -> Result<&Drawable> {
        self.index_of(key)
            .map(|index| &self.drawables[index])
            .ok_or_else(|| MosaicError::UnknownKey(key.to_string()))
    }

    /// Position of `key` in the sorted index
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys
            .binary_search_by(|candidate| candidate.as_str().cmp(key))
            .ok()
    }

    pub fn drawable_at(&self, index: usize) -> Option<&Drawable> {
        self.drawables.get(index)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Release every atlas texture
    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        debug!("Releasing {} atlas texture(s)", self.textures.len());
        for texture in self.textures {
            device.delete_texture(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessDevice;

    fn region(key: &str, top_left: (u32, u32), bottom_right: (u32, u32), rotated: bool) -> Region {
        Region {
            key: key.to_string(),
            top_left,
            bottom_right,
            rotated,
        }
    }

    fn atlas(side: u32, regions: Vec<Region>) -> Atlas {
        let mut atlas = Atlas::new(side);
        atlas.regions = regions;
        atlas
    }

    fn build(device: &mut HeadlessDevice, atlases: &[Atlas]) -> Result<ResourceTable> {
        ResourceTable::build(device, atlases, TextureFilter::NEAREST, ColorPrecision::Normal)
    }

    #[test]
    fn test_texture_coordinates() {
        let mut device = HeadlessDevice::default();
        let atlases = [atlas(
            16,
            vec![
                region("plain", (0, 0), (8, 4), false),
                region("turned", (8, 0), (12, 8), true),
            ],
        )];
        let table = build(&mut device, &atlases).unwrap();

        let plain = table.get("plain").unwrap();
        assert_eq!(
            plain.tex_coords,
            [[0.0, 0.0], [0.5, 0.0], [0.0, 0.25], [0.5, 0.25]]
        );
        assert_eq!(plain.aspect_ratio, 2.0);

        let turned = table.get("turned").unwrap();
        assert!(turned.rotated);
        assert_eq!(
            turned.tex_coords,
            [[0.5, 0.5], [0.5, 0.0], [0.75, 0.5], [0.75, 0.0]]
        );
        // a 8x4 source stored as a 4x8 region
        assert_eq!(turned.aspect_ratio, 2.0);
    }

    #[test]
    fn test_keys_are_merged_and_sorted() {
        let mut device = HeadlessDevice::default();
        let atlases = [
            atlas(8, vec![region("zebra", (0, 0), (2, 2), false)]),
            atlas(8, vec![region("apple", (0, 0), (2, 2), false)]),
        ];
        let table = build(&mut device, &atlases).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["apple", "zebra"]);
        assert_eq!(table.get("apple").unwrap().texture, table.textures()[1]);
        assert!(matches!(
            table.get("mango"),
            Err(MosaicError::UnknownKey(key)) if key == "mango"
        ));
    }

    #[test]
    fn test_duplicate_key_creates_nothing() {
        let mut device = HeadlessDevice::default();
        let atlases = [
            atlas(8, vec![region("same", (0, 0), (2, 2), false)]),
            atlas(8, vec![region("same", (0, 0), (2, 2), false)]),
        ];
        assert!(matches!(
            build(&mut device, &atlases),
            Err(MosaicError::DuplicateKey(_))
        ));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_failed_upload_releases_earlier_textures() {
        let mut device = HeadlessDevice::new(32, 4);
        let atlases = [
            atlas(16, vec![region("small", (0, 0), (2, 2), false)]),
            atlas(64, vec![region("big", (0, 0), (40, 40), false)]),
        ];
        assert!(matches!(
            build(&mut device, &atlases),
            Err(MosaicError::GraphicsResource { .. })
        ));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_destroy_releases_textures_and_ids_are_unique() {
        let mut device = HeadlessDevice::default();
        let atlases = [atlas(8, vec![region("a", (0, 0), (2, 2), false)])];
        let first = build(&mut device, &atlases).unwrap();
        let second = build(&mut device, &atlases).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(device.live_textures(), 2);

        first.destroy(&mut device);
        second.destroy(&mut device);
        assert_eq!(device.live_textures(), 0);
    }
}
