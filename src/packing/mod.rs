mod grid;
mod packer;
mod rect;

pub use grid::Placement;
pub use packer::{PackedLayout, pack};
pub use rect::Rect;
