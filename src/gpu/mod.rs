//! The boundary between the renderer and a graphics API.
//!
//! Everything the batch renderer, resource table and mask compositor need
//! from the GPU goes through [`GraphicsDevice`]. Handles are plain ids owned
//! by whoever created them; releasing a handle twice is a caller bug.

mod headless;
mod vertex;

pub use headless::{DrawCall, GpuCommand, HeadlessDevice};
pub use vertex::SpriteVertex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

/// An offscreen color target and the texture it renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: RenderTargetId,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Sampling interpolation for one filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
}

/// Texture sampling configuration applied to every atlas texture.
///
/// `mipmap` is `None` when no mip chain is generated; otherwise it selects
/// how levels are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureFilter {
    pub min: Interpolation,
    pub mag: Interpolation,
    pub mipmap: Option<Interpolation>,
}

impl TextureFilter {
    pub const NEAREST: Self = Self {
        min: Interpolation::Nearest,
        mag: Interpolation::Nearest,
        mipmap: None,
    };

    pub const LINEAR: Self = Self {
        min: Interpolation::Linear,
        mag: Interpolation::Linear,
        mipmap: None,
    };

    pub fn with_mipmaps(mut self, interpolation: Interpolation) -> Self {
        self.mipmap = Some(interpolation);
        self
    }
}

/// Bit depth used for atlas textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPrecision {
    /// 8 bits per channel
    #[default]
    Normal,
    /// 4 bits per channel
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8888,
    Rgba4444,
}

impl From<ColorPrecision> for PixelFormat {
    fn from(precision: ColorPrecision) -> Self {
        match precision {
            ColorPrecision::Normal => PixelFormat::Rgba8888,
            ColorPrecision::Low => PixelFormat::Rgba4444,
        }
    }
}

/// Parameters for a new texture. `pixels` holds tightly packed RGBA8 rows
/// (top row first); `None` allocates uninitialized storage.
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: TextureFilter,
    pub pixels: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Separate color/alpha blend factors, combined with additive blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFunc {
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendFunc {
    /// `(SrcAlpha, OneMinusSrcAlpha)` for both color and alpha.
    pub const ALPHA: Self = Self {
        src_color: BlendFactor::SrcAlpha,
        dst_color: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::SrcAlpha,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };

    /// Keeps the destination color and scales the destination alpha by the
    /// source alpha (or its complement when `inverted`).
    pub fn mask(inverted: bool) -> Self {
        Self {
            src_color: BlendFactor::Zero,
            dst_color: BlendFactor::One,
            src_alpha: BlendFactor::Zero,
            dst_alpha: if inverted {
                BlendFactor::OneMinusSrcAlpha
            } else {
                BlendFactor::SrcAlpha
            },
        }
    }
}

/// A graphics API as seen by the sprite renderer.
///
/// The renderer is single threaded and frame driven: implementations may
/// assume calls arrive from one thread and never re-enter.
pub trait GraphicsDevice {
    /// Largest supported texture side in pixels.
    fn max_texture_size(&self) -> u32;

    /// Number of texture units a fragment shader can sample from.
    fn max_texture_units(&self) -> usize;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId>;

    fn delete_texture(&mut self, texture: TextureId);

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget>;

    fn delete_render_target(&mut self, target: RenderTarget);

    /// Redirects drawing to `target`, or to the surface when `None`.
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);

    /// Clears the bound target's color buffer.
    fn clear(&mut self, rgba: [f32; 4]);

    /// Compiles and links a program, failing with the driver's log.
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str)
    -> Result<ProgramId>;

    fn delete_program(&mut self, program: ProgramId);

    fn use_program(&mut self, program: Option<ProgramId>);

    fn create_index_buffer(&mut self, indices: &[u16]) -> Result<BufferId>;

    fn delete_buffer(&mut self, buffer: BufferId);

    fn bind_texture(&mut self, unit: usize, texture: Option<TextureId>);

    fn set_blend(&mut self, blend: BlendFunc);

    /// Uploads `vertices` and draws `index_count` indices from `indices`,
    /// sampling the texture bound to `texture_unit`.
    fn draw_indexed(
        &mut self,
        vertices: &[SpriteVertex],
        indices: BufferId,
        index_count: u32,
        texture_unit: usize,
    );
}
