//! GLSL ES 1.00 sources for the sprite program.
//!
//! Attribute locations match the [`SpriteVertex`](crate::gpu::SpriteVertex)
//! layout; colors arrive as normalized unsigned bytes.

pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;
pub const UV_LOCATION: u32 = 2;

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const COLOR_ATTRIBUTE: &str = "a_color";
pub const UV_ATTRIBUTE: &str = "a_uv";
pub const TEXTURE_UNIFORM: &str = "u_texture";

pub const VERTEX_SHADER: &str = "\
attribute vec2 a_position;
attribute lowp vec4 a_color;
attribute vec2 a_uv;
varying lowp vec4 v_color;
varying vec2 v_uv;
void main() {
    v_color = a_color;
    v_uv = a_uv;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

pub const FRAGMENT_SHADER: &str = "\
precision mediump float;
uniform sampler2D u_texture;
varying lowp vec4 v_color;
varying vec2 v_uv;
void main() {
    gl_FragColor = texture2D(u_texture, v_uv) * v_color;
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_declare_their_interface() {
        for name in [POSITION_ATTRIBUTE, COLOR_ATTRIBUTE, UV_ATTRIBUTE] {
            assert!(VERTEX_SHADER.contains(name));
        }
        assert!(FRAGMENT_SHADER.contains(TEXTURE_UNIFORM));
    }
}
