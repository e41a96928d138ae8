use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use super::{Origin, Sizing};

/// Maps world units to normalized device coordinates.
///
/// `fixed_size` world units span the surface along the dimension chosen by
/// `sizing`; the other dimension follows the surface's aspect ratio. The
/// origins pick which point of the surface world `(0, 0)` lands on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub sizing: Sizing,
    pub h_origin: Origin,
    pub v_origin: Origin,
    pub fixed_size: f32,
    /// Surface height over width
    #[serde(skip, default = "default_aspect")]
    aspect: f32,
}

fn default_aspect() -> f32 {
    1.0
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            sizing: Sizing::FixedWidth,
            h_origin: Origin::Start,
            v_origin: Origin::Start,
            fixed_size: 1.0,
            aspect: default_aspect(),
        }
    }
}

impl Viewport {
    pub fn new(sizing: Sizing, h_origin: Origin, v_origin: Origin, fixed_size: f32) -> Self {
        Self {
            sizing,
            h_origin,
            v_origin,
            fixed_size,
            aspect: default_aspect(),
        }
    }

    /// Update the aspect ratio for a surface of `width`×`height` pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = height as f32 / width as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// World width of the visible area
    pub fn width(&self) -> f32 {
        match self.sizing {
            Sizing::FixedHeight => self.fixed_size / self.aspect,
            _ => self.fixed_size,
        }
    }

    /// World height of the visible area
    pub fn height(&self) -> f32 {
        match self.sizing {
            Sizing::FixedWidth => self.fixed_size * self.aspect,
            _ => self.fixed_size,
        }
    }

    pub fn left(&self) -> f32 {
        self.width() * (self.h_origin.offset() - 0.5)
    }

    pub fn right(&self) -> f32 {
        self.width() * (self.h_origin.offset() + 0.5)
    }

    pub fn bottom(&self) -> f32 {
        self.height() * (self.v_origin.offset() - 0.5)
    }

    pub fn top(&self) -> f32 {
        self.height() * (self.v_origin.offset() + 0.5)
    }

    /// World to normalized device coordinates
    pub fn transform(&self) -> Affine2 {
        let s = 2.0 / self.fixed_size;
        let scale = match self.sizing {
            Sizing::FixedWidthHeight => Vec2::splat(s),
            Sizing::FixedHeight => Vec2::new(s * self.aspect, s),
            Sizing::FixedWidth => Vec2::new(s, s / self.aspect),
        };
        let translation = Vec2::new(self.h_origin.offset(), self.v_origin.offset()) * -2.0;
        Affine2::from_scale_angle_translation(scale, 0.0, translation)
    }

    /// Convert a surface position in pixels (origin top-left) to world units.
    pub fn unproject(&self, x: f32, y: f32, surface_width: f32, surface_height: f32) -> Vec2 {
        Vec2::new(
            self.left() + x / surface_width * self.width(),
            self.bottom() + (1.0 - y / surface_height) * self.height(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_default_maps_bottom_left_origin() {
        let mut viewport = Viewport::default();
        viewport.resize(200, 100);
        let t = viewport.transform();

        assert_eq!(viewport.width(), 1.0);
        assert_eq!(viewport.height(), 0.5);
        assert_close(t.transform_point2(Vec2::ZERO), Vec2::new(-1.0, -1.0));
        assert_close(t.transform_point2(Vec2::new(1.0, 0.5)), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_centered_fixed_height() {
        let mut viewport = Viewport::new(Sizing::FixedHeight, Origin::Center, Origin::Center, 10.0);
        viewport.resize(200, 100);

        assert_eq!(viewport.height(), 10.0);
        assert_eq!(viewport.width(), 20.0);
        assert_eq!((viewport.left(), viewport.right()), (-10.0, 10.0));
        assert_eq!((viewport.bottom(), viewport.top()), (-5.0, 5.0));
        assert_close(
            viewport.transform().transform_point2(Vec2::new(10.0, 5.0)),
            Vec2::ONE,
        );
    }

    #[test]
    fn test_unproject_surface_corners() {
        let mut viewport = Viewport::new(Sizing::FixedWidthHeight, Origin::Center, Origin::Center, 2.0);
        viewport.resize(50, 50);
        assert_close(viewport.unproject(0.0, 0.0, 50.0, 50.0), Vec2::new(-1.0, 1.0));
        assert_close(viewport.unproject(50.0, 50.0, 50.0, 50.0), Vec2::new(1.0, -1.0));
    }
}
