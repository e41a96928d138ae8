use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA color with channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const DARK_GRAY: Self = Self::rgb(0.25, 0.25, 0.25);
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Opaque color from hue in degrees, saturation and value in `0.0..=1.0`
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let hue = hue.rem_euclid(360.0) / 60.0;
        let chroma = value * saturation;
        let x = chroma * (1.0 - (hue % 2.0 - 1.0).abs());
        let (r, g, b) = match hue as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = value - chroma;
        Self::rgb(r + m, g + m, b + m)
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Clamped 8-bit channels, as stored in a vertex
    pub fn packed(self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_clamps() {
        assert_eq!(Color::WHITE.packed(), [255, 255, 255, 255]);
        assert_eq!(Color::rgba(2.0, -1.0, 0.5, 0.0).packed(), [255, 0, 128, 0]);
    }

    #[test]
    fn test_from_hsv() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0).packed(), [255, 0, 0, 255]);
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0).packed(), [0, 255, 0, 255]);
        assert_eq!(Color::from_hsv(240.0, 1.0, 0.5).packed(), [0, 0, 128, 255]);
        assert_eq!(Color::from_hsv(-120.0, 0.0, 1.0), Color::WHITE);
    }
}
