use glam::Affine2;
use serde::{Deserialize, Serialize};

use super::{Color, Transform, TransformId, TransformTree};
use crate::error::{MosaicError, Result};
use crate::resources::{Drawable, ResourceTable};

/// Which dimension of a sprite stays one world unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sizing {
    /// Unit square regardless of the image's aspect ratio
    #[default]
    FixedWidthHeight,
    /// Width is one unit, height follows the aspect ratio
    FixedWidth,
    /// Height is one unit, width follows the aspect ratio
    FixedHeight,
}

/// Anchor along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Origin {
    /// Left or bottom edge
    Start,
    #[default]
    Center,
    /// Right or top edge
    End,
}

impl Origin {
    /// Offset of the unit quad, as a fraction of its size
    pub fn offset(self) -> f32 {
        match self {
            Origin::Start => 0.5,
            Origin::Center => 0.0,
            Origin::End => -0.5,
        }
    }
}

/// How to draw one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub color: Color,
    pub transform: Affine2,
    pub sizing: Sizing,
    pub h_origin: Origin,
    pub v_origin: Origin,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            transform: Affine2::IDENTITY,
            sizing: Sizing::FixedWidthHeight,
            h_origin: Origin::Center,
            v_origin: Origin::Center,
        }
    }
}

impl DrawParams {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_transform(mut self, transform: Affine2) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_origin(mut self, h_origin: Origin, v_origin: Origin) -> Self {
        self.h_origin = h_origin;
        self.v_origin = v_origin;
        self
    }
}

#[derive(Debug, Clone)]
struct CachedDrawable {
    table: u64,
    key: String,
    index: usize,
}

/// A drawable that remembers where its key was found.
///
/// The lookup is redone when the key changes or the resources are rebuilt.
/// A sprite with a `parent` is positioned relative to that node of a
/// [`TransformTree`] and must be drawn with
/// [`Drawer::draw_sprite_in`](super::Drawer::draw_sprite_in).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprite {
    pub key: String,
    pub color: Color,
    pub transform: Transform,
    #[serde(skip)]
    pub parent: Option<TransformId>,
    pub sizing: Sizing,
    pub h_origin: Origin,
    pub v_origin: Origin,
    #[serde(skip)]
    cached: Option<CachedDrawable>,
}

impl Sprite {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Draw parameters for a sprite without a parent.
    pub fn params(&self) -> Result<DrawParams> {
        if self.parent.is_some() {
            return Err(MosaicError::InvalidDrawContext(
                "parented sprite drawn without its transform tree",
            ));
        }
        Ok(self.params_with(self.transform.to_affine()))
    }

    /// Draw parameters with the parent chain resolved through `tree`.
    pub fn params_in(&self, tree: &TransformTree) -> Result<DrawParams> {
        let local = self.transform.to_affine();
        let transform = match self.parent {
            Some(parent) => tree.world(parent)? * local,
            None => local,
        };
        Ok(self.params_with(transform))
    }

    fn params_with(&self, transform: Affine2) -> DrawParams {
        DrawParams {
            color: self.color,
            transform,
            sizing: self.sizing,
            h_origin: self.h_origin,
            v_origin: self.v_origin,
        }
    }

    /// Look up this sprite's drawable, reusing the previous result when it
    /// came from the same table under the same key.
    pub fn resolve<'t>(&mut self, table: &'t ResourceTable) -> Result<&'t Drawable> {
        if let Some(cached) = &self.cached
            && cached.table == table.id()
            && cached.key == self.key
            && let Some(drawable) = table.drawable_at(cached.index)
        {
            return Ok(drawable);
        }

        let index = table
            .index_of(&self.key)
            .ok_or_else(|| MosaicError::UnknownKey(self.key.clone()))?;
        self.cached = Some(CachedDrawable {
            table: table.id(),
            key: self.key.clone(),
            index,
        });
        table
            .drawable_at(index)
            .ok_or_else(|| MosaicError::UnknownKey(self.key.clone()))
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}
