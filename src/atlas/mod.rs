mod builder;
mod types;

pub use builder::{AtlasBuilder, DEFAULT_BORDER, compose, quantize_low_bit};
pub use types::{Atlas, Region};
