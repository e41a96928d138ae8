use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Where one image ended up inside an atlas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub key: String,
    /// Inclusive top-left pixel
    pub top_left: (u32, u32),
    /// Exclusive bottom-right pixel
    pub bottom_right: (u32, u32),
    /// The image was stored turned 90° counter-clockwise, so the region's
    /// extents are the image's height by width.
    pub rotated: bool,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.bottom_right.0 - self.top_left.0
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.1 - self.top_left.1
    }

    /// Size of the image before it was placed
    pub fn source_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.height(), self.width())
        } else {
            (self.width(), self.height())
        }
    }

    pub fn fits_in(&self, side: u32) -> bool {
        self.top_left.0 <= self.bottom_right.0
            && self.top_left.1 <= self.bottom_right.1
            && self.bottom_right.0 <= side
            && self.bottom_right.1 <= side
    }
}

/// A completed square texture atlas
#[derive(Debug, Clone)]
pub struct Atlas {
    /// Power-of-two side length
    pub side: u32,
    /// Rendered atlas image, `side`×`side`
    pub canvas: RgbaImage,
    /// All images packed into this atlas
    pub regions: Vec<Region>,
}

impl Atlas {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            canvas: RgbaImage::new(side, side),
            regions: Vec::new(),
        }
    }

    pub fn region(&self, key: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.key == key)
    }
}
