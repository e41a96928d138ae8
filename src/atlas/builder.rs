use image::{RgbaImage, imageops};
use log::info;

use super::{Atlas, Region};
use crate::error::Result;
use crate::gpu::ColorPrecision;
use crate::packing::{self, PackedLayout};
use crate::sprite::ImageDescriptor;

/// Gap kept right of and below every image
pub const DEFAULT_BORDER: u32 = 4;

/// Configuration for atlas building
#[derive(Debug, Clone, Copy)]
pub struct AtlasBuilder {
    pub max_size: u32,
    pub border: u32,
    pub color_precision: ColorPrecision,
}

impl AtlasBuilder {
    pub fn new(max_size: u32) -> Self {
        Self {
            max_size,
            border: DEFAULT_BORDER,
            color_precision: ColorPrecision::Normal,
        }
    }

    pub fn border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    pub fn color_precision(mut self, precision: ColorPrecision) -> Self {
        self.color_precision = precision;
        self
    }

    /// Pack the images and render one atlas per layout
    pub fn build(&self, images: &[ImageDescriptor]) -> Result<Vec<Atlas>> {
        let layouts = packing::pack(images, self.max_size, self.border)?;
        let atlases: Vec<Atlas> = layouts
            .iter()
            .map(|layout| compose(layout, images, self.color_precision))
            .collect();

        for (index, atlas) in atlases.iter().enumerate() {
            info!(
                "Atlas {}: {}x{} with {} images",
                index,
                atlas.side,
                atlas.side,
                atlas.regions.len()
            );
        }
        info!(
            "Created {} atlas(es) with {} total images",
            atlases.len(),
            atlases.iter().map(|a| a.regions.len()).sum::<usize>()
        );

        Ok(atlases)
    }
}

/// Render a layout into an atlas canvas
///
/// Rotated images are turned 90° counter-clockwise, so the pixel at `(dx, dy)`
/// inside the region is the source pixel `(w - 1 - dy, dx)`.
pub fn compose(layout: &PackedLayout, images: &[ImageDescriptor], precision: ColorPrecision) -> Atlas {
    let mut atlas = Atlas::new(layout.side);

    for placement in &layout.placements {
        let source = &images[placement.image];
        let rect = placement.rect;

        if placement.rotated {
            let turned = imageops::rotate270(&source.image);
            imageops::replace(&mut atlas.canvas, &turned, i64::from(rect.x), i64::from(rect.y));
        } else {
            imageops::replace(
                &mut atlas.canvas,
                &source.image,
                i64::from(rect.x),
                i64::from(rect.y),
            );
        }

        atlas.regions.push(Region {
            key: source.key.clone(),
            top_left: (rect.x, rect.y),
            bottom_right: (rect.right(), rect.bottom()),
            rotated: placement.rotated,
        });
    }

    if precision == ColorPrecision::Low {
        quantize_low_bit(&mut atlas.canvas);
    }

    atlas
}

/// Reduce every channel to 4 bits, replicated into the low nibble so that
/// full intensity stays 255.
pub fn quantize_low_bit(canvas: &mut RgbaImage) {
    for channel in canvas.iter_mut() {
        *channel = (*channel & 0xF0) | (*channel >> 4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 7, 255])
        })
    }

    #[test]
    fn test_build_renders_every_region() {
        let images = vec![
            ImageDescriptor::new("a", 0, gradient(8, 8)),
            ImageDescriptor::new("b", 0, gradient(5, 3)),
        ];
        let atlases = AtlasBuilder::new(64).border(2).build(&images).unwrap();
        assert_eq!(atlases.len(), 1);
        let atlas = &atlases[0];
        assert_eq!(atlas.canvas.dimensions(), (atlas.side, atlas.side));

        let region = atlas.region("a").unwrap();
        assert!(!region.rotated);
        let (x, y) = region.top_left;
        assert_eq!(atlas.canvas.get_pixel(x + 3, y + 2), &Rgba([30, 20, 7, 255]));
    }

    #[test]
    fn test_rotated_blit() {
        let images = vec![ImageDescriptor::new("wide", 0, gradient(6, 2))];
        let atlases = AtlasBuilder::new(16).border(0).build(&images).unwrap();
        let region = atlases[0].region("wide").unwrap();
        assert!(region.rotated);
        assert_eq!((region.width(), region.height()), (2, 6));
        assert_eq!(region.source_size(), (6, 2));

        let canvas = &atlases[0].canvas;
        let (x0, y0) = region.top_left;
        for dy in 0..6 {
            for dx in 0..2 {
                let expected = images[0].image.get_pixel(5 - dy, dx);
                assert_eq!(canvas.get_pixel(x0 + dx, y0 + dy), expected);
            }
        }
    }

    #[test]
    fn test_low_precision_quantizes_canvas() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0x3C, 0xFF, 0x00, 0x81]));
        let images = vec![ImageDescriptor::new("q", 0, image)];
        let atlases = AtlasBuilder::new(16)
            .color_precision(ColorPrecision::Low)
            .build(&images)
            .unwrap();
        assert_eq!(atlases[0].canvas.get_pixel(0, 0), &Rgba([0x33, 0xFF, 0x00, 0x88]));
    }
}
