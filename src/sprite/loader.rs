use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageReader;
use log::info;
use rayon::prelude::*;

use super::ImageDescriptor;
use crate::error::MosaicError;

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Priority distance between consecutive command-line input groups
pub const GROUP_PRIORITY_STRIDE: i32 = 1 << 16;

/// Inputs that should be packed together, starting at `priority`
#[derive(Debug, Clone)]
pub struct InputGroup {
    pub paths: Vec<PathBuf>,
    pub priority: i32,
}

/// Image path with the directory its key is computed from
struct ImagePath {
    path: PathBuf,
    base: Option<PathBuf>,
    priority: i32,
}

/// Load images from input groups (files or directories)
///
/// Within a group, images are ordered by path and given consecutive
/// priorities starting at the group's priority, so the packer only splits
/// a group when it cannot fit in one atlas. Keys are paths relative to the
/// directory input (or `base_dir` for file inputs) without the extension,
/// using `/` as separator.
pub fn load_images(groups: &[InputGroup], base_dir: Option<&Path>) -> Result<Vec<ImageDescriptor>> {
    let mut image_paths = Vec::new();
    for group in groups {
        let mut paths = collect_image_paths(&group.paths, base_dir)?;
        paths.sort_by(|a, b| a.path.cmp(&b.path));
        for (i, mut image_path) in paths.into_iter().enumerate() {
            let offset = i32::try_from(i).context("too many images in one input group")?;
            image_path.priority = group
                .priority
                .checked_add(offset)
                .context("image priority overflows i32")?;
            image_paths.push(image_path);
        }
    }

    if image_paths.is_empty() {
        return Err(MosaicError::NoImages.into());
    }

    info!("Loading {} images...", image_paths.len());

    image_paths
        .par_iter()
        .map(load_single_image)
        .collect()
}

fn collect_image_paths(inputs: &[PathBuf], base_dir: Option<&Path>) -> Result<Vec<ImagePath>> {
    let mut paths = Vec::new();

    for path in inputs {
        if !path.exists() {
            return Err(MosaicError::InputNotFound(path.clone()).into());
        }

        if path.is_file() {
            if is_supported_image(path) {
                paths.push(ImagePath {
                    path: path.clone(),
                    base: base_dir.map(Path::to_path_buf),
                    priority: 0,
                });
            }
        } else if path.is_dir() {
            collect_from_directory(path, path, &mut paths)?;
        }
    }

    Ok(paths)
}

fn collect_from_directory(base: &Path, dir: &Path, paths: &mut Vec<ImagePath>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();

        if path.is_file() && is_supported_image(&path) {
            paths.push(ImagePath {
                path,
                base: Some(base.to_path_buf()),
                priority: 0,
            });
        } else if path.is_dir() {
            collect_from_directory(base, &path, paths)?;
        }
    }

    Ok(())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Key for an image: relative path without extension, `/`-separated
fn image_key(path: &Path, base: Option<&Path>) -> String {
    let relative = base
        .and_then(|base_dir| path.strip_prefix(base_dir).ok())
        .unwrap_or_else(|| Path::new(path.file_name().unwrap_or(path.as_os_str())));
    let stem = relative.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn load_single_image(img_path: &ImagePath) -> Result<ImageDescriptor> {
    let path = &img_path.path;
    let image = ImageReader::open(path)
        .map_err(|e| MosaicError::ImageLoad {
            path: path.clone(),
            source: e.into(),
        })?
        .decode()
        .map_err(|e| MosaicError::ImageLoad {
            path: path.clone(),
            source: e,
        })?
        .into_rgba8();

    let key = image_key(path, img_path.base.as_deref());
    if image.width() == 0 || image.height() == 0 {
        return Err(MosaicError::EmptyImage(key).into());
    }

    Ok(ImageDescriptor::new(key, img_path.priority, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn write_png(path: &Path, width: u32, height: u32) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        RgbaImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn test_image_key_strips_extension() {
        let base = Path::new("/assets");
        assert_eq!(
            image_key(Path::new("/assets/ui/button.png"), Some(base)),
            "ui/button"
        );
        assert_eq!(image_key(Path::new("/elsewhere/hero.png"), None), "hero");
    }

    #[test]
    fn test_group_priorities_are_consecutive() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("ui/b.png"), 2, 2);
        write_png(&dir.path().join("ui/a.png"), 3, 1);
        write_png(&dir.path().join("world/tree.png"), 4, 4);
        std::fs::write(dir.path().join("ui/notes.txt"), "skip me").unwrap();

        let groups = [
            InputGroup {
                paths: vec![dir.path().join("ui")],
                priority: 10,
            },
            InputGroup {
                paths: vec![dir.path().join("world")],
                priority: 100,
            },
        ];
        let mut images = load_images(&groups, None).unwrap();
        images.sort_by_key(|d| d.priority);

        let summary: Vec<_> = images
            .iter()
            .map(|d| (d.key.as_str(), d.priority))
            .collect();
        assert_eq!(summary, vec![("a", 10), ("b", 11), ("tree", 100)]);
        assert_eq!(images[0].width(), 3);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let groups = [InputGroup {
            paths: vec![PathBuf::from("/definitely/not/here")],
            priority: 0,
        }];
        let err = load_images(&groups, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::InputNotFound(_))
        ));
    }
}
