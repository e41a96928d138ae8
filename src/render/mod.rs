//! Sprite drawing: batching, masking, cameras, transforms and viewports.

mod batch;
mod camera;
mod color;
mod drawer;
mod mask;
pub mod shader;
mod sprite;
mod transform;
mod units;
mod viewport;

pub use batch::{BatchRenderer, BatchStats, DEFAULT_MAX_SPRITES, MAX_SPRITES_PER_BATCH};
pub use camera::Camera;
pub use color::Color;
pub(crate) use drawer::MaskAccess;
pub use drawer::Drawer;
pub use mask::{MaskCallback, MaskCompositor};
pub use sprite::{DrawParams, Origin, Sizing, Sprite};
pub use transform::{Transform, TransformId, TransformTree};
pub use units::TextureUnitTable;
pub use viewport::Viewport;
