use std::collections::HashSet;

use image::RgbaImage;

use crate::error::{MosaicError, Result};
use crate::gpu::TextureFilter;

/// A source image submitted for packing
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// Unique lookup key
    pub key: String,
    /// Packing priority; images with close priorities share an atlas
    pub priority: i32,
    pub image: RgbaImage,
}

impl ImageDescriptor {
    pub fn new(key: impl Into<String>, priority: i32, image: RgbaImage) -> Self {
        Self {
            key: key.into(),
            priority,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Width over height of the image as submitted.
    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }
}

/// The images an application wants packed, plus how their atlases are sampled.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    images: Vec<ImageDescriptor>,
    keys: HashSet<String>,
    filter: TextureFilter,
}

impl ResourceSet {
    pub fn new(filter: TextureFilter) -> Self {
        Self {
            images: Vec::new(),
            keys: HashSet::new(),
            filter,
        }
    }

    /// Adds an image, rejecting empty images and keys already in the set.
    pub fn add(&mut self, image: ImageDescriptor) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MosaicError::EmptyImage(image.key));
        }
        if !self.keys.insert(image.key.clone()) {
            return Err(MosaicError::DuplicateKey(image.key));
        }
        self.images.push(image);
        Ok(())
    }

    pub fn with_image(mut self, image: ImageDescriptor) -> Result<Self> {
        self.add(image)?;
        Ok(self)
    }

    pub fn images(&self) -> &[ImageDescriptor] {
        &self.images
    }

    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl TryFrom<Vec<ImageDescriptor>> for ResourceSet {
    type Error = MosaicError;

    fn try_from(images: Vec<ImageDescriptor>) -> Result<Self> {
        let mut set = ResourceSet::default();
        for image in images {
            set.add(image)?;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_key() {
        let mut set = ResourceSet::default();
        set.add(ImageDescriptor::new("hero", 0, RgbaImage::new(4, 4)))
            .unwrap();
        let err = set
            .add(ImageDescriptor::new("hero", 1, RgbaImage::new(2, 2)))
            .unwrap_err();
        assert!(matches!(err, MosaicError::DuplicateKey(key) if key == "hero"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rejects_empty_image() {
        let mut set = ResourceSet::default();
        let err = set
            .add(ImageDescriptor::new("blank", 0, RgbaImage::new(0, 3)))
            .unwrap_err();
        assert!(matches!(err, MosaicError::EmptyImage(_)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_aspect_ratio_uses_native_size() {
        let desc = ImageDescriptor::new("wide", 0, RgbaImage::new(20, 10));
        assert_eq!(desc.aspect_ratio(), 2.0);
        assert_eq!(desc.area(), 200);
    }
}
