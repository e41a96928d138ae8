use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

/// A view onto the world, applied between the viewport and every sprite.
///
/// `position` is the world point shown where world `(0, 0)` would be
/// without a camera. `zoom` magnifies, `scale` shrinks each axis, and a
/// positive `angle` (degrees) turns the view clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec2,
    pub scale: Vec2,
    pub angle: f32,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// World to view: move `position` to the origin, then scale and rotate.
    pub fn view(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(
            self.zoom / self.scale,
            self.angle.to_radians(),
            Vec2::ZERO,
        ) * Affine2::from_translation(-self.position)
    }

    /// World point under `view_point`, e.g. an unprojected touch position.
    pub fn to_world(&self, view_point: Vec2) -> Vec2 {
        self.view().inverse().transform_point2(view_point)
    }
}
