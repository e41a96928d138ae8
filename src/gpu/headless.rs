use std::collections::BTreeMap;

use log::debug;

use super::{
    BlendFunc, BufferId, GraphicsDevice, PixelFormat, ProgramId, RenderTarget, RenderTargetId,
    SpriteVertex, TextureDesc, TextureId,
};
use crate::error::{MosaicError, Result};

/// One recorded indexed draw, with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub vertices: Vec<SpriteVertex>,
    pub index_count: u32,
    pub texture_unit: usize,
    pub texture: Option<TextureId>,
    pub target: Option<RenderTargetId>,
    pub blend: BlendFunc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    DeleteTexture(TextureId),
    CreateRenderTarget(RenderTarget),
    DeleteRenderTarget(RenderTargetId),
    BindRenderTarget(Option<RenderTargetId>),
    Clear([f32; 4]),
    CompileProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    CreateIndexBuffer { id: BufferId, len: usize },
    DeleteBuffer(BufferId),
    BindTexture {
        unit: usize,
        texture: Option<TextureId>,
    },
    SetBlend(BlendFunc),
    Draw(DrawCall),
}

/// A [`GraphicsDevice`] with no GPU behind it.
///
/// Records every command and tracks live handles, so it can run the renderer
/// on machines without a display and check resource lifetimes.
#[derive(Debug)]
pub struct HeadlessDevice {
    max_texture_size: u32,
    max_texture_units: usize,
    next_id: u32,
    fail_programs: bool,
    textures: BTreeMap<TextureId, (u32, u32)>,
    programs: Vec<ProgramId>,
    buffers: BTreeMap<BufferId, usize>,
    targets: Vec<RenderTargetId>,
    units: Vec<Option<TextureId>>,
    bound_target: Option<RenderTargetId>,
    blend: BlendFunc,
    commands: Vec<GpuCommand>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(2048, 8)
    }
}

impl HeadlessDevice {
    pub fn new(max_texture_size: u32, max_texture_units: usize) -> Self {
        Self {
            max_texture_size,
            max_texture_units,
            next_id: 1,
            fail_programs: false,
            textures: BTreeMap::new(),
            programs: Vec::new(),
            buffers: BTreeMap::new(),
            targets: Vec::new(),
            units: vec![None; max_texture_units],
            bound_target: None,
            blend: BlendFunc::ALPHA,
            commands: Vec::new(),
        }
    }

    /// Makes every subsequent program compilation fail.
    pub fn with_failing_programs(mut self) -> Self {
        self.fail_programs = true;
        self
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|c| match c {
            GpuCommand::Draw(call) => Some(call),
            _ => None,
        })
    }

    pub fn draw_call_count(&self) -> usize {
        self.draw_calls().count()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Total handles of any kind that have not been released.
    pub fn live_handles(&self) -> usize {
        self.textures.len() + self.programs.len() + self.buffers.len() + self.targets.len()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).copied()
    }

    pub fn bound_texture(&self, unit: usize) -> Option<TextureId> {
        self.units.get(unit).copied().flatten()
    }

    pub fn bound_target(&self) -> Option<RenderTargetId> {
        self.bound_target
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn max_texture_units(&self) -> usize {
        self.max_texture_units
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        if desc.width == 0
            || desc.height == 0
            || desc.width > self.max_texture_size
            || desc.height > self.max_texture_size
        {
            return Err(MosaicError::GraphicsResource {
                resource: "texture",
                message: format!(
                    "'{}' is {}x{}, device limit is {}",
                    desc.label, desc.width, desc.height, self.max_texture_size
                ),
            });
        }
        if let Some(pixels) = desc.pixels {
            let expected = desc.width as usize * desc.height as usize * 4;
            if pixels.len() != expected {
                return Err(MosaicError::GraphicsResource {
                    resource: "texture",
                    message: format!(
                        "'{}' has {} bytes of pixel data, expected {}",
                        desc.label,
                        pixels.len(),
                        expected
                    ),
                });
            }
        }
        let id = TextureId(self.next_id());
        self.textures.insert(id, (desc.width, desc.height));
        self.commands.push(GpuCommand::CreateTexture {
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        debug!("headless: created texture {:?} '{}'", id, desc.label);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        for unit in self.units.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
        self.commands.push(GpuCommand::DeleteTexture(texture));
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        let texture = self.create_texture(&TextureDesc {
            label: "render_target",
            width,
            height,
            format: PixelFormat::Rgba8888,
            filter: super::TextureFilter::NEAREST,
            pixels: None,
        })?;
        let target = RenderTarget {
            id: RenderTargetId(self.next_id()),
            texture,
            width,
            height,
        };
        self.targets.push(target.id);
        self.commands.push(GpuCommand::CreateRenderTarget(target));
        Ok(target)
    }

    fn delete_render_target(&mut self, target: RenderTarget) {
        self.targets.retain(|&t| t != target.id);
        if self.bound_target == Some(target.id) {
            self.bound_target = None;
        }
        self.commands.push(GpuCommand::DeleteRenderTarget(target.id));
        self.delete_texture(target.texture);
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.bound_target = target;
        self.commands.push(GpuCommand::BindRenderTarget(target));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.commands.push(GpuCommand::Clear(rgba));
    }

    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId> {
        if self.fail_programs || vertex_source.is_empty() || fragment_source.is_empty() {
            return Err(MosaicError::GraphicsResource {
                resource: "shader program",
                message: "compilation failed".to_string(),
            });
        }
        let id = ProgramId(self.next_id());
        self.programs.push(id);
        self.commands.push(GpuCommand::CompileProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.retain(|&p| p != program);
        self.commands.push(GpuCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn create_index_buffer(&mut self, indices: &[u16]) -> Result<BufferId> {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, indices.len());
        self.commands.push(GpuCommand::CreateIndexBuffer {
            id,
            len: indices.len(),
        });
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.commands.push(GpuCommand::DeleteBuffer(buffer));
    }

    fn bind_texture(&mut self, unit: usize, texture: Option<TextureId>) {
        if let Some(slot) = self.units.get_mut(unit) {
            *slot = texture;
        }
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn set_blend(&mut self, blend: BlendFunc) {
        self.blend = blend;
        self.commands.push(GpuCommand::SetBlend(blend));
    }

    fn draw_indexed(
        &mut self,
        vertices: &[SpriteVertex],
        indices: BufferId,
        index_count: u32,
        texture_unit: usize,
    ) {
        debug_assert!(
            self.buffers
                .get(&indices)
                .is_some_and(|&len| index_count as usize <= len),
            "draw past the end of the index buffer"
        );
        let call = DrawCall {
            vertices: vertices.to_vec(),
            index_count,
            texture_unit,
            texture: self.bound_texture(texture_unit),
            target: self.bound_target,
            blend: self.blend,
        };
        self.commands.push(GpuCommand::Draw(call));
    }
}
