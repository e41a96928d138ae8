use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MosaicError>;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Image '{key}' ({width}x{height}) does not fit in an atlas of at most {max_size}x{max_size}")]
    UnpackableImage {
        key: String,
        width: u32,
        height: u32,
        max_size: u32,
    },

    #[error(
        "Images with uniform priority steps ({first_key}..{last_key}, {count} images) do not fit in one atlas and cannot be split"
    )]
    IndivisibleGroup {
        first_key: String,
        last_key: String,
        count: usize,
    },

    #[error("No images to pack")]
    NoImages,

    #[error("Image '{0}' has zero width or height")]
    EmptyImage(String),

    #[error("Key '{0}' is used by more than one image")]
    DuplicateKey(String),

    #[error("No drawable with key '{0}'")]
    UnknownKey(String),

    #[error("Atlas cache '{path}' is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Failed to write atlas cache '{path}': {reason}")]
    CacheWrite { path: PathBuf, reason: String },

    #[error("Failed to create {resource}: {message}")]
    GraphicsResource {
        resource: &'static str,
        message: String,
    },

    #[error("Invalid draw context: {0}")]
    InvalidDrawContext(&'static str),

    #[error("Transform {0} does not belong to this tree")]
    UnknownTransform(usize),

    #[error("Parenting transform {child} to {parent} would create a cycle")]
    TransformCycle { child: usize, parent: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to save image '{path}': {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to compress PNG '{path}': {message}")]
    PngCompress { path: PathBuf, message: String },

    #[error("Input path does not exist: {0}")]
    InputNotFound(PathBuf),
}
