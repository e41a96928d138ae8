use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader, RgbaImage};

use crate::atlas::Atlas;
use crate::cli::CompressionLevel;
use crate::error::{MosaicError, Result};

/// Save an atlas canvas as PNG, optionally recompressed with oxipng
pub fn save_atlas_image(
    atlas: &Atlas,
    path: &Path,
    compress: Option<CompressionLevel>,
) -> Result<()> {
    let mut png_data = Cursor::new(Vec::new());
    atlas
        .canvas
        .write_to(&mut png_data, ImageFormat::Png)
        .map_err(|e| MosaicError::ImageSave {
            path: path.to_path_buf(),
            source: e,
        })?;

    let output_data = if let Some(level) = compress {
        let opts = match level {
            CompressionLevel::Level(n) => oxipng::Options::from_preset(n),
            CompressionLevel::Max => oxipng::Options::max_compression(),
        };
        oxipng::optimize_from_memory(&png_data.into_inner(), &opts).map_err(|e| {
            MosaicError::PngCompress {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?
    } else {
        png_data.into_inner()
    };

    fs::write(path, output_data).map_err(|e| MosaicError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Load a stored atlas canvas
pub fn load_atlas_image(path: &Path) -> Result<RgbaImage> {
    let image = ImageReader::open(path)
        .map_err(|e| MosaicError::ImageLoad {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .with_guessed_format()
        .map_err(|e| MosaicError::ImageLoad {
            path: path.to_path_buf(),
            source: e.into(),
        })?
        .decode()
        .map_err(|e| MosaicError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(image.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_compressed_png_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut atlas = Atlas::new(8);
        atlas.canvas.put_pixel(3, 5, Rgba([1, 2, 3, 4]));

        let path = dir.path().join("atlas_0.png");
        save_atlas_image(&atlas, &path, Some(CompressionLevel::Level(1))).unwrap();
        let loaded = load_atlas_image(&path).unwrap();
        assert_eq!(loaded, atlas.canvas);
    }
}
