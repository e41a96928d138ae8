//! Frame-driven lifecycle tying resources, batching and masking together.
//!
//! The host calls [`Engine::surface_created`] whenever a graphics context
//! becomes available, [`Engine::surface_changed`] on resize and
//! [`Engine::render_frame`] once per frame.

use glam::Affine2;
use log::{debug, warn};

use crate::atlas::{Atlas, AtlasBuilder};
use crate::cache::{AtlasCache, CacheMeta};
use crate::cli::CompressionLevel;
use crate::config::MosaicConfig;
use crate::error::{MosaicError, Result};
use crate::gpu::{GraphicsDevice, TextureFilter};
use crate::render::{
    BatchRenderer, BatchStats, Camera, Color, Drawer, MaskAccess, MaskCompositor, Viewport,
};
use crate::resources::ResourceTable;
use crate::sprite::ResourceSet;

/// One page of an application, rendered every frame while current.
pub trait Screen {
    fn render(&mut self, drawer: &mut Drawer<'_>, delta_seconds: f32) -> Result<()>;

    fn viewport(&self) -> &Viewport;

    fn viewport_mut(&mut self) -> &mut Viewport;

    fn clear_color(&self) -> Color {
        Color::WHITE
    }

    /// Camera the frame starts with; draws can switch it with
    /// [`Drawer::set_camera`]
    fn camera(&self) -> Option<&Camera> {
        None
    }

    /// Called when the screen becomes current, after its viewport is sized
    fn show(&mut self) {}

    /// Called when another screen replaces this one
    fn hide(&mut self) {}

    /// Called after the viewport was resized to the new surface
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Shown until the application sets its own screen
#[derive(Debug, Default)]
pub struct DefaultScreen {
    viewport: Viewport,
}

impl Screen for DefaultScreen {
    fn render(&mut self, _drawer: &mut Drawer<'_>, _delta_seconds: f32) -> Result<()> {
        Ok(())
    }

    fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    fn clear_color(&self) -> Color {
        Color::BLUE
    }
}

pub struct Engine<D: GraphicsDevice> {
    config: MosaicConfig,
    compress: Option<CompressionLevel>,
    device: D,
    batch: BatchRenderer,
    masker: Option<MaskCompositor>,
    resources: Option<ResourceTable>,
    screen: Box<dyn Screen>,
    next_screen: Option<Box<dyn Screen>>,
    surface: (u32, u32),
    destroyed: bool,
}

impl<D: GraphicsDevice> Engine<D> {
    pub fn new(config: MosaicConfig, device: D) -> Result<Self> {
        config.validate()?;
        let compress = config.compress_level()?;
        let batch = BatchRenderer::new(config.max_sprites_per_batch)?;
        let masker = config.masking.then(MaskCompositor::new);
        Ok(Self {
            config,
            compress,
            device,
            batch,
            masker,
            resources: None,
            screen: Box::new(DefaultScreen::default()),
            next_screen: None,
            surface: (0, 0),
            destroyed: false,
        })
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// `None` until resources were loaded
    pub fn resources(&self) -> Option<&ResourceTable> {
        self.resources.as_ref()
    }

    pub fn screen(&self) -> &dyn Screen {
        self.screen.as_ref()
    }

    pub fn batch_stats(&self) -> BatchStats {
        self.batch.stats()
    }

    pub fn reset_batch_stats(&mut self) {
        self.batch.reset_stats();
    }

    /// Largest atlas side for this device and configuration
    pub fn max_atlas_size(&self) -> u32 {
        self.config
            .effective_max_atlas_size(self.device.max_texture_size())
    }

    /// Make `screen` current at the start of the next frame.
    pub fn set_screen(&mut self, screen: Box<dyn Screen>) {
        self.next_screen = Some(screen);
    }

    /// (Re)load resources and create the renderer for a new context.
    ///
    /// `load` is only called when the atlas cache cannot be used.
    pub fn surface_created<F>(&mut self, load: F) -> Result<()>
    where
        F: FnOnce() -> Result<ResourceSet>,
    {
        self.reload_resources(load)?;
        self.batch.create(&mut self.device)?;
        self.destroyed = false;
        Ok(())
    }

    pub fn surface_changed(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface = (width, height);
        if let Some(masker) = &mut self.masker {
            masker.create(&mut self.device, width, height)?;
        }
        self.screen.viewport_mut().resize(width, height);
        self.screen.resize(width, height);
        Ok(())
    }

    pub fn render_frame(&mut self, delta_seconds: f32) -> Result<()> {
        if let Some(next) = self.next_screen.take() {
            self.screen.hide();
            self.screen = next;
            let (width, height) = self.surface;
            self.screen.viewport_mut().resize(width, height);
            self.screen.show();
            self.screen.resize(width, height);
        }

        let resources = self
            .resources
            .as_ref()
            .ok_or(MosaicError::InvalidDrawContext("resources not loaded"))?;

        self.device.bind_render_target(None);
        self.device.clear(self.screen.clear_color().to_array());

        let viewport = *self.screen.viewport();
        let view = self.screen.camera().map_or(Affine2::IDENTITY, Camera::view);
        let masking = match &mut self.masker {
            Some(masker) => MaskAccess::Available(masker),
            None => MaskAccess::Disabled,
        };
        let mut drawer = Drawer::new(
            &mut self.device,
            &mut self.batch,
            resources,
            &viewport,
            masking,
        )
        .with_view(view);
        let result = self.screen.render(&mut drawer, delta_seconds);
        self.batch.flush(&mut self.device);
        result
    }

    /// Release every GPU handle. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(masker) = &mut self.masker {
            masker.destroy(&mut self.device);
        }
        self.batch.destroy(&mut self.device);
        if let Some(resources) = self.resources.take() {
            resources.destroy(&mut self.device);
        }
        self.destroyed = true;
    }

    fn reload_resources<F>(&mut self, load: F) -> Result<()>
    where
        F: FnOnce() -> Result<ResourceSet>,
    {
        if let Some(old) = self.resources.take() {
            self.batch.release_textures(&mut self.device);
            old.destroy(&mut self.device);
        }

        let max_size = self.max_atlas_size();
        let (atlases, filter) = match &self.config.cache_dir {
            Some(dir) => {
                let cache = AtlasCache::new(dir).compress(self.compress);
                let cached = cache
                    .load(max_size)
                    .filter(|cached| cached.meta.color_precision == self.config.color_precision);
                match cached {
                    Some(cached) => {
                        debug!("Using cached atlases from {}", dir.display());
                        (cached.atlases, cached.meta.texture_filter)
                    }
                    None => {
                        let set = load()?;
                        let atlases = self.pack(&set, max_size)?;
                        let meta = CacheMeta {
                            max_atlas_size: max_size,
                            texture_filter: set.filter(),
                            color_precision: self.config.color_precision,
                        };
                        // the atlases are in memory, so running without a cache is fine
                        if let Err(e) = cache.save(&atlases, &meta) {
                            warn!("{}; continuing without a cache", e);
                        }
                        (atlases, set.filter())
                    }
                }
            }
            None => {
                let set = load()?;
                let atlases = self.pack(&set, max_size)?;
                (atlases, set.filter())
            }
        };

        self.upload(&atlases, filter)
    }

    fn pack(&self, set: &ResourceSet, max_size: u32) -> Result<Vec<Atlas>> {
        AtlasBuilder::new(max_size)
            .border(self.config.border)
            .color_precision(self.config.color_precision)
            .build(set.images())
    }

    fn upload(&mut self, atlases: &[Atlas], filter: TextureFilter) -> Result<()> {
        let table =
            ResourceTable::build(&mut self.device, atlases, filter, self.config.color_precision)?;
        self.resources = Some(table);
        Ok(())
    }
}

impl<D: GraphicsDevice> Drop for Engine<D> {
    fn drop(&mut self) {
        self.destroy();
    }
}
