#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    /// Normalized device coordinates.
    pub position: [f32; 2],
    /// Straight (non-premultiplied) RGBA, normalized by the vertex fetch.
    pub color: [u8; 4],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    pub const STRIDE: usize = std::mem::size_of::<SpriteVertex>();
    pub const POSITION_OFFSET: usize = 0;
    pub const COLOR_OFFSET: usize = 8;
    pub const UV_OFFSET: usize = 12;
}
