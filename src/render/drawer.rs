use glam::Affine2;

use super::mask::{MaskCallback, MaskCompositor};
use super::{BatchRenderer, Camera, DrawParams, Sprite, TransformTree, Viewport};
use crate::error::{MosaicError, Result};
use crate::gpu::GraphicsDevice;
use crate::resources::ResourceTable;

/// Whether [`Drawer::draw_masked`] may be used
pub(crate) enum MaskAccess<'a> {
    Disabled,
    /// Inside a mask callback
    Nested,
    Available(&'a mut MaskCompositor),
}

/// Draw access handed to a screen for the duration of one frame.
///
/// Every draw goes through the viewport, then the camera view, then the
/// sprite's own transform.
pub struct Drawer<'a> {
    device: &'a mut dyn GraphicsDevice,
    batch: &'a mut BatchRenderer,
    resources: &'a ResourceTable,
    viewport: &'a Viewport,
    view: Affine2,
    masking: MaskAccess<'a>,
}

impl<'a> Drawer<'a> {
    pub(crate) fn new(
        device: &'a mut dyn GraphicsDevice,
        batch: &'a mut BatchRenderer,
        resources: &'a ResourceTable,
        viewport: &'a Viewport,
        masking: MaskAccess<'a>,
    ) -> Self {
        Self {
            device,
            batch,
            resources,
            viewport,
            view: Affine2::IDENTITY,
            masking,
        }
    }

    pub(crate) fn with_view(mut self, view: Affine2) -> Self {
        self.view = view;
        self
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport
    }

    pub fn resources(&self) -> &ResourceTable {
        self.resources
    }

    /// World to view transform of the current camera
    pub fn view(&self) -> Affine2 {
        self.view
    }

    /// Look through `camera` for the following draws of this frame.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.view = camera.view();
    }

    /// Draw the image stored under `key`.
    pub fn draw(&mut self, key: &str, params: &DrawParams) -> Result<()> {
        let drawable = self.resources.get(key)?;
        let params = params.with_transform(self.view * params.transform);
        self.batch.draw(self.device, drawable, self.viewport, &params)
    }

    /// Draw a sprite, reusing its cached lookup when still valid.
    ///
    /// Fails with [`MosaicError::InvalidDrawContext`] for a parented
    /// sprite; use [`Drawer::draw_sprite_in`] for those.
    pub fn draw_sprite(&mut self, sprite: &mut Sprite) -> Result<()> {
        let params = sprite.params()?;
        self.draw_resolved(sprite, params)
    }

    /// Draw a sprite whose parent chain lives in `tree`.
    pub fn draw_sprite_in(&mut self, tree: &TransformTree, sprite: &mut Sprite) -> Result<()> {
        let params = sprite.params_in(tree)?;
        self.draw_resolved(sprite, params)
    }

    fn draw_resolved(&mut self, sprite: &mut Sprite, params: DrawParams) -> Result<()> {
        let drawable = sprite.resolve(self.resources)?;
        let params = params.with_transform(self.view * params.transform);
        self.batch.draw(self.device, drawable, self.viewport, &params)
    }

    /// Draw `callback`'s content through the mask it draws first.
    ///
    /// Only the parts of the content covered by the mask stay visible, or
    /// the uncovered parts when `inverted`.
    pub fn draw_masked(&mut self, callback: &mut impl MaskCallback, inverted: bool) -> Result<()> {
        let Drawer {
            device,
            batch,
            resources,
            viewport,
            view,
            masking,
        } = self;
        match masking {
            MaskAccess::Available(masker) => masker.draw(
                &mut **device,
                batch,
                resources,
                viewport,
                *view,
                callback,
                inverted,
            ),
            MaskAccess::Nested => Err(MosaicError::InvalidDrawContext(
                "masked drawing cannot be nested",
            )),
            MaskAccess::Disabled => Err(MosaicError::InvalidDrawContext("masking is disabled")),
        }
    }
}
