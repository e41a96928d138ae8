use glam::{Affine2, Vec2};
use log::{debug, trace};

use super::shader::{FRAGMENT_SHADER, VERTEX_SHADER};
use super::units::TextureUnitTable;
use super::{DrawParams, Sizing, Viewport};
use crate::error::{MosaicError, Result};
use crate::gpu::{BlendFunc, BufferId, GraphicsDevice, ProgramId, SpriteVertex, TextureId};
use crate::resources::Drawable;

pub const DEFAULT_MAX_SPRITES: usize = 128;
/// Largest batch whose quad indices still fit in `u16`
pub const MAX_SPRITES_PER_BATCH: usize = 16384;

const VERTICES_PER_QUAD: usize = 4;
const INDICES_PER_QUAD: usize = 6;

/// Unit quad corners in the order texture coordinates are stored
const QUAD: [Vec2; 4] = [
    Vec2::new(-0.5, 0.5),
    Vec2::new(0.5, 0.5),
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
];

const FULLSCREEN: [SpriteVertex; 4] = [
    SpriteVertex {
        position: [-1.0, 1.0],
        color: [255; 4],
        uv: [0.0, 1.0],
    },
    SpriteVertex {
        position: [1.0, 1.0],
        color: [255; 4],
        uv: [1.0, 1.0],
    },
    SpriteVertex {
        position: [-1.0, -1.0],
        color: [255; 4],
        uv: [0.0, 0.0],
    },
    SpriteVertex {
        position: [1.0, -1.0],
        color: [255; 4],
        uv: [1.0, 0.0],
    },
];

/// Counters since the last [`BatchRenderer::reset_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub draw_calls: usize,
    pub sprites: usize,
    pub culled: usize,
    pub texture_switches: usize,
}

#[derive(Debug, Clone, Copy)]
struct BatchGpu {
    program: ProgramId,
    indices: BufferId,
}

/// Collects sprite quads and submits them in as few draws as possible.
///
/// Quads accumulate until the texture changes or the batch is full. Vertices
/// are transformed on the CPU so a whole batch shares one program state.
#[derive(Debug)]
pub struct BatchRenderer {
    max_sprites: u16,
    vertices: Vec<SpriteVertex>,
    units: TextureUnitTable,
    gpu: Option<BatchGpu>,
    stats: BatchStats,
}

/// Index pattern `qn, qn+1, qn+2, qn+2, qn+1, qn+3` for every quad
fn quad_indices(quads: u16) -> Vec<u16> {
    (0..quads)
        .flat_map(|q| {
            let qn = q * 4;
            [qn, qn + 1, qn + 2, qn + 2, qn + 1, qn + 3]
        })
        .collect()
}

/// Places the unit quad according to sizing and origin
fn sizing_transform(params: &DrawParams, aspect_ratio: f32) -> Affine2 {
    let h = params.h_origin.offset();
    let v = params.v_origin.offset();
    let (scale, offset) = match params.sizing {
        Sizing::FixedWidthHeight => (Vec2::ONE, Vec2::new(h, v)),
        Sizing::FixedHeight => (
            Vec2::new(aspect_ratio, 1.0),
            Vec2::new(h * aspect_ratio, v),
        ),
        Sizing::FixedWidth => (
            Vec2::new(1.0, 1.0 / aspect_ratio),
            Vec2::new(h, v / aspect_ratio),
        ),
    };
    Affine2::from_scale_angle_translation(scale, 0.0, offset)
}

fn on_screen(corners: &[Vec2; 4]) -> bool {
    corners
        .iter()
        .any(|c| c.x > -1.0 && c.x < 1.0 && c.y > -1.0 && c.y < 1.0)
}

impl BatchRenderer {
    pub fn new(max_sprites: usize) -> Result<Self> {
        if !(1..=MAX_SPRITES_PER_BATCH).contains(&max_sprites) {
            return Err(MosaicError::InvalidConfig(format!(
                "max sprites per batch must be between 1 and {MAX_SPRITES_PER_BATCH}, got {max_sprites}"
            )));
        }
        let max_sprites = u16::try_from(max_sprites)
            .map_err(|e| MosaicError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            max_sprites,
            vertices: Vec::with_capacity(usize::from(max_sprites) * VERTICES_PER_QUAD),
            units: TextureUnitTable::new(1),
            gpu: None,
            stats: BatchStats::default(),
        })
    }

    pub fn max_sprites(&self) -> usize {
        usize::from(self.max_sprites)
    }

    pub fn is_created(&self) -> bool {
        self.gpu.is_some()
    }

    /// Quads waiting for the next flush
    pub fn pending(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BatchStats::default();
    }

    /// Compile the program and upload the index buffer.
    ///
    /// Called again after the context is lost; handles from a previous call
    /// are released first.
    pub fn create<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        self.destroy(device);

        let program = device.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let indices = match device.create_index_buffer(&quad_indices(self.max_sprites)) {
            Ok(indices) => indices,
            Err(e) => {
                device.delete_program(program);
                return Err(e);
            }
        };
        device.use_program(Some(program));
        device.set_blend(BlendFunc::ALPHA);

        self.units = TextureUnitTable::new(device.max_texture_units());
        self.gpu = Some(BatchGpu { program, indices });
        debug!(
            "Batch renderer created: {} sprites per batch, {} texture units",
            self.max_sprites,
            self.units.len()
        );
        Ok(())
    }

    pub fn destroy<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        self.vertices.clear();
        self.units.clear();
        if let Some(gpu) = self.gpu.take() {
            device.use_program(None);
            device.delete_buffer(gpu.indices);
            device.delete_program(gpu.program);
        }
    }

    /// Forget which textures are bound, e.g. before the resources holding
    /// them are destroyed.
    pub fn release_textures<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        self.flush(device);
        for unit in 0..self.units.len() {
            if self.units.texture(unit).is_some() {
                device.bind_texture(unit, None);
            }
        }
        self.units.clear();
    }

    pub fn draw<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        drawable: &Drawable,
        viewport: &Viewport,
        params: &DrawParams,
    ) -> Result<()> {
        if self.gpu.is_none() {
            return Err(MosaicError::InvalidDrawContext("batch renderer not created"));
        }
        if params.color.a <= 0.0 {
            return Ok(());
        }

        let to_ndc = viewport.transform()
            * params.transform
            * sizing_transform(params, drawable.aspect_ratio);
        let corners = QUAD.map(|p| to_ndc.transform_point2(p));
        if !on_screen(&corners) {
            self.stats.culled += 1;
            return Ok(());
        }

        if self.units.current_texture() != Some(drawable.texture) {
            self.flush(device);
            self.bind(device, drawable.texture);
        }

        let color = params.color.packed();
        self.vertices
            .extend(corners.iter().zip(drawable.tex_coords).map(|(p, uv)| {
                SpriteVertex {
                    position: p.to_array(),
                    color,
                    uv,
                }
            }));

        if self.pending() >= self.max_sprites() {
            self.flush(device);
        }
        Ok(())
    }

    /// Submit the pending quads, if any.
    pub fn flush<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        let Some(gpu) = self.gpu else {
            self.vertices.clear();
            return;
        };
        if self.vertices.is_empty() {
            return;
        }
        let quads = self.pending();
        // at most MAX_SPRITES_PER_BATCH quads
        let index_count = u32::try_from(quads * INDICES_PER_QUAD).unwrap_or(u32::MAX);
        device.draw_indexed(&self.vertices, gpu.indices, index_count, self.units.current());
        trace!("Flushed {quads} sprites on unit {}", self.units.current());

        self.stats.draw_calls += 1;
        self.stats.sprites += quads;
        self.vertices.clear();
    }

    /// Draw `texture` over the whole bound target, then unbind it.
    pub fn draw_fullscreen<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        texture: TextureId,
    ) -> Result<()> {
        if self.gpu.is_none() {
            return Err(MosaicError::InvalidDrawContext("batch renderer not created"));
        }
        self.flush(device);
        let unit = self.bind(device, texture);
        self.vertices.extend_from_slice(&FULLSCREEN);
        self.flush(device);
        self.units.unbind(unit);
        device.bind_texture(unit, None);
        Ok(())
    }

    fn bind<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, texture: TextureId) -> usize {
        let (unit, needs_bind) = self.units.bind(texture);
        if needs_bind {
            device.bind_texture(unit, Some(texture));
        }
        self.stats.texture_switches += 1;
        unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{Atlas, Region};
    use crate::gpu::{ColorPrecision, GpuCommand, HeadlessDevice, TextureFilter};
    use crate::render::{Color, Origin};
    use crate::resources::ResourceTable;

    fn region(key: &str) -> Region {
        Region {
            key: key.to_string(),
            top_left: (0, 0),
            bottom_right: (4, 4),
            rotated: false,
        }
    }

    /// Two atlases, "a" on the first and "b" on the second
    fn setup(max_sprites: usize) -> (HeadlessDevice, BatchRenderer, ResourceTable) {
        let mut device = HeadlessDevice::new(64, 4);
        let mut first = Atlas::new(8);
        first.regions = vec![region("a"), region("a2")];
        let mut second = Atlas::new(8);
        second.regions = vec![region("b")];
        let table = ResourceTable::build(
            &mut device,
            &[first, second],
            TextureFilter::NEAREST,
            ColorPrecision::Normal,
        )
        .unwrap();
        let mut batch = BatchRenderer::new(max_sprites).unwrap();
        batch.create(&mut device).unwrap();
        device.clear_commands();
        (device, batch, table)
    }

    /// World units equal device coordinates
    fn identity_viewport() -> Viewport {
        Viewport::new(Sizing::FixedWidthHeight, Origin::Center, Origin::Center, 2.0)
    }

    #[test]
    fn test_rejects_out_of_range_capacity() {
        assert!(matches!(
            BatchRenderer::new(0),
            Err(MosaicError::InvalidConfig(_))
        ));
        assert!(BatchRenderer::new(MAX_SPRITES_PER_BATCH + 1).is_err());
        assert!(BatchRenderer::new(MAX_SPRITES_PER_BATCH).is_ok());
    }

    #[test]
    fn test_index_pattern() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7]);
        let all = quad_indices(MAX_SPRITES_PER_BATCH as u16);
        assert_eq!(all.last(), Some(&u16::MAX));
    }

    #[test]
    fn test_draw_before_create_fails() {
        let mut device = HeadlessDevice::default();
        let (_, _, table) = setup(4);
        let mut batch = BatchRenderer::new(4).unwrap();
        let result = batch.draw(
            &mut device,
            table.get("a").unwrap(),
            &identity_viewport(),
            &DrawParams::default(),
        );
        assert!(matches!(result, Err(MosaicError::InvalidDrawContext(_))));
    }

    #[test]
    fn test_alternating_textures_flush_on_every_switch() {
        let (mut device, mut batch, table) = setup(128);
        let viewport = identity_viewport();
        for key in ["a", "b", "a", "b"] {
            batch
                .draw(&mut device, table.get(key).unwrap(), &viewport, &DrawParams::default())
                .unwrap();
        }
        assert_eq!(device.draw_call_count(), 3);
        batch.flush(&mut device);
        assert_eq!(device.draw_call_count(), 4);

        let textures: Vec<_> = device.draw_calls().map(|c| c.texture).collect();
        let a = table.get("a").unwrap().texture;
        let b = table.get("b").unwrap().texture;
        assert_eq!(textures, vec![Some(a), Some(b), Some(a), Some(b)]);

        // both atlases stay resident, so returning to one needs no rebind
        let binds = device
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::BindTexture { .. }))
            .count();
        assert_eq!(binds, 2);
    }

    #[test]
    fn test_same_texture_shares_a_draw() {
        let (mut device, mut batch, table) = setup(128);
        let viewport = identity_viewport();
        for key in ["a", "a2", "a"] {
            batch
                .draw(&mut device, table.get(key).unwrap(), &viewport, &DrawParams::default())
                .unwrap();
        }
        batch.flush(&mut device);
        let calls: Vec<_> = device.draw_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].vertices.len(), 12);
        assert_eq!(calls[0].index_count, 18);
        assert_eq!(batch.stats().sprites, 3);
    }

    #[test]
    fn test_full_batch_flushes() {
        let (mut device, mut batch, table) = setup(2);
        let viewport = identity_viewport();
        let drawable = table.get("a").unwrap();
        for _ in 0..5 {
            batch
                .draw(&mut device, drawable, &viewport, &DrawParams::default())
                .unwrap();
        }
        assert_eq!(device.draw_call_count(), 2);
        assert_eq!(batch.pending(), 1);
        batch.flush(&mut device);
        assert_eq!(device.draw_call_count(), 3);
        // flushing an empty batch draws nothing
        batch.flush(&mut device);
        assert_eq!(device.draw_call_count(), 3);
    }

    #[test]
    fn test_offscreen_and_transparent_sprites_are_skipped() {
        let (mut device, mut batch, table) = setup(128);
        let viewport = identity_viewport();
        let drawable = table.get("a").unwrap();

        let far = DrawParams::default().with_transform(Affine2::from_translation(Vec2::new(5.0, 5.0)));
        batch.draw(&mut device, drawable, &viewport, &far).unwrap();
        let clear = DrawParams::default().with_color(Color::WHITE.with_alpha(0.0));
        batch.draw(&mut device, drawable, &viewport, &clear).unwrap();
        batch.flush(&mut device);

        assert_eq!(device.draw_call_count(), 0);
        assert_eq!(batch.stats().culled, 1);
    }

    #[test]
    fn test_vertex_positions_follow_sizing_and_origin() {
        let (mut device, mut batch, table) = setup(128);
        let viewport = identity_viewport();
        let params = DrawParams::default()
            .with_origin(Origin::Start, Origin::Start)
            .with_color(Color::RED);
        batch
            .draw(&mut device, table.get("a").unwrap(), &viewport, &params)
            .unwrap();
        batch.flush(&mut device);

        let call = device.draw_calls().next().unwrap();
        let positions: Vec<_> = call.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]]
        );
        assert_eq!(call.vertices[0].color, [255, 0, 0, 255]);
        assert_eq!(call.vertices[3].uv, [0.5, 0.5]);
    }

    #[test]
    fn test_fullscreen_quad_unbinds_its_texture() {
        let (mut device, mut batch, table) = setup(128);
        let texture = table.get("b").unwrap().texture;
        batch.draw_fullscreen(&mut device, texture).unwrap();

        let call = device.draw_calls().next().unwrap();
        assert_eq!(call.texture, Some(texture));
        assert_eq!(call.vertices, FULLSCREEN.to_vec());
        assert_eq!(device.bound_texture(call.texture_unit), None);
    }

    #[test]
    fn test_recreate_releases_previous_handles() {
        let mut device = HeadlessDevice::default();
        let mut batch = BatchRenderer::new(16).unwrap();
        batch.create(&mut device).unwrap();
        batch.create(&mut device).unwrap();
        assert_eq!(device.live_handles(), 2);
        batch.destroy(&mut device);
        assert_eq!(device.live_handles(), 0);
        assert!(!batch.is_created());
    }

    #[test]
    fn test_failed_compile_leaves_renderer_uncreated() {
        let mut device = HeadlessDevice::default().with_failing_programs();
        let mut batch = BatchRenderer::new(16).unwrap();
        assert!(matches!(
            batch.create(&mut device),
            Err(MosaicError::GraphicsResource { .. })
        ));
        assert!(!batch.is_created());
        assert_eq!(device.live_handles(), 0);
    }
}
