use glam::Affine2;
use log::debug;

use super::drawer::{Drawer, MaskAccess};
use super::{BatchRenderer, Color, Viewport};
use crate::error::{MosaicError, Result};
use crate::gpu::{BlendFunc, GraphicsDevice, RenderTarget};
use crate::resources::ResourceTable;

/// The two passes of a masked draw.
pub trait MaskCallback {
    /// Draw the shape whose alpha selects what stays visible.
    fn draw_mask(&mut self, drawer: &mut Drawer<'_>) -> Result<()>;

    /// Draw the content being masked.
    fn draw_masked(&mut self, drawer: &mut Drawer<'_>) -> Result<()>;
}

/// Two surface-sized offscreen targets used to combine a mask with content.
#[derive(Debug, Default)]
pub struct MaskCompositor {
    targets: Option<(RenderTarget, RenderTarget)>,
}

impl MaskCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_created(&self) -> bool {
        self.targets.is_some()
    }

    /// The mask and content targets, in that order
    pub fn targets(&self) -> Option<(RenderTarget, RenderTarget)> {
        self.targets
    }

    /// (Re)create both targets at the surface size.
    pub fn create<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.destroy(device);
        let mask = device.create_render_target(width, height)?;
        let content = match device.create_render_target(width, height) {
            Ok(target) => target,
            Err(e) => {
                device.delete_render_target(mask);
                return Err(e);
            }
        };
        self.targets = Some((mask, content));
        debug!("Mask targets created at {width}x{height}");
        Ok(())
    }

    pub fn destroy<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some((mask, content)) = self.targets.take() {
            device.delete_render_target(mask);
            device.delete_render_target(content);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw(
        &mut self,
        device: &mut dyn GraphicsDevice,
        batch: &mut BatchRenderer,
        resources: &ResourceTable,
        viewport: &Viewport,
        view: Affine2,
        callback: &mut dyn MaskCallback,
        inverted: bool,
    ) -> Result<()> {
        let (mask, content) = self
            .targets
            .ok_or(MosaicError::InvalidDrawContext("mask targets not created"))?;

        let result = Self::compose(
            device, batch, resources, viewport, view, callback, inverted, mask, content,
        );
        if result.is_err() {
            batch.flush(device);
            device.bind_render_target(None);
            device.set_blend(BlendFunc::ALPHA);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn compose(
        device: &mut dyn GraphicsDevice,
        batch: &mut BatchRenderer,
        resources: &ResourceTable,
        viewport: &Viewport,
        view: Affine2,
        callback: &mut dyn MaskCallback,
        inverted: bool,
        mask: RenderTarget,
        content: RenderTarget,
    ) -> Result<()> {
        batch.flush(device);

        device.bind_render_target(Some(mask.id));
        device.clear(Color::TRANSPARENT.to_array());
        let mut drawer = Drawer::new(
            &mut *device,
            &mut *batch,
            resources,
            viewport,
            MaskAccess::Nested,
        )
        .with_view(view);
        callback.draw_mask(&mut drawer)?;
        batch.flush(device);

        device.bind_render_target(Some(content.id));
        device.clear(Color::TRANSPARENT.to_array());
        let mut drawer = Drawer::new(
            &mut *device,
            &mut *batch,
            resources,
            viewport,
            MaskAccess::Nested,
        )
        .with_view(view);
        callback.draw_masked(&mut drawer)?;
        batch.flush(device);

        // keep the content's color, take its alpha from the mask
        device.set_blend(BlendFunc::mask(inverted));
        batch.draw_fullscreen(device, mask.texture)?;

        device.bind_render_target(None);
        device.set_blend(BlendFunc::ALPHA);
        batch.draw_fullscreen(device, content.texture)
    }
}
