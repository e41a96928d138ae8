pub mod atlas;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod packing;
pub mod render;
pub mod resources;
pub mod sprite;

pub use atlas::{Atlas, AtlasBuilder, Region};
pub use cache::{AtlasCache, cache_compatible};
pub use config::MosaicConfig;
pub use engine::{Engine, Screen};
pub use error::{MosaicError, Result};
pub use gpu::{GraphicsDevice, HeadlessDevice};
pub use render::{
    BatchRenderer, Camera, Color, DrawParams, Drawer, MaskCallback, Sprite, TransformTree, Viewport,
};
pub use resources::{Drawable, ResourceTable};
pub use sprite::{ImageDescriptor, ResourceSet};
