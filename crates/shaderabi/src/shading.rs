//! Host-side evaluation of the bundled shader expressions.
//!
//! These mirror `shaders/*.vert` and `shaders/*.frag` one to one, so engine
//! code and tests can predict what a draw produces without a GPU.

use glam::{Mat3, Vec2, Vec3, Vec4};

use crate::error::TextureError;
use crate::uniforms::{CameraUbo, GlobalLightUbo, MeshFlags, MeshUbo};

pub trait TextureSampler {
    fn sample(&self, uv: Vec2) -> Vec4;
}

/// Returns the same color for every coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidTexture(pub Vec4);

impl TextureSampler for SolidTexture {
    fn sample(&self, _uv: Vec2) -> Vec4 {
        self.0
    }
}

/// RGBA texture sampled with repeat addressing and bilinear filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2d {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Texture2d {
    /// `texels` are row-major, starting at the `v = 0` row.
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroSize { width, height });
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(TextureError::TexelCount {
                expected,
                found: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Builds a texture from 8-bit unorm RGBA bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TextureError> {
        if bytes.len() % 4 != 0 {
            return Err(TextureError::TexelCount {
                expected: width as usize * height as usize,
                found: bytes.len() / 4,
            });
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|px| Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0)
            .collect();
        Self::new(width, height, texels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.texels[y * self.width as usize + x]
    }
}

impl TextureSampler for Texture2d {
    fn sample(&self, uv: Vec2) -> Vec4 {
        // Texel centres sit at half-integer coordinates.
        let x = repeat(uv.x) * self.width as f32 - 0.5;
        let y = repeat(uv.y) * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}

/// Wraps a coordinate into `[0, 1]`; non-finite input reads as 0.
fn repeat(coord: f32) -> f32 {
    if coord.is_finite() {
        coord.rem_euclid(1.0)
    } else {
        0.0
    }
}

/// `proj * view * model * vec4(position, 1.0)`.
pub fn clip_position(camera: &CameraUbo, mesh: &MeshUbo, position: Vec3) -> Vec4 {
    camera.view_proj() * mesh.model() * position.extend(1.0)
}

/// Normal as passed from the lit vertex stage: `mat3(model) * normal`.
pub fn world_normal(mesh: &MeshUbo, normal: Vec3) -> Vec3 {
    Mat3::from_mat4(mesh.model()) * normal
}

/// `ambient + max(0, dot(normalize(n), -normalize(direction)))`.
pub fn diffuse_intensity(light: &GlobalLightUbo, normal: Vec3) -> f32 {
    let n = normal.normalize_or_zero();
    let d = light.direction().normalize_or_zero();
    light.ambient + n.dot(-d).max(0.0)
}

fn base_color(mesh: &MeshUbo, uv: Vec2, texture: &impl TextureSampler) -> Vec4 {
    if mesh.flags().contains(MeshFlags::TEXTURED) {
        texture.sample(uv)
    } else {
        mesh.color()
    }
}

/// Lit fragment: base color scaled by the light intensity, alpha kept.
/// `light.color` does not take part.
pub fn shade_lit(
    mesh: &MeshUbo,
    light: &GlobalLightUbo,
    normal: Vec3,
    uv: Vec2,
    texture: &impl TextureSampler,
) -> Vec4 {
    let base = base_color(mesh, uv, texture);
    let intensity = diffuse_intensity(light, normal);
    (base.truncate() * intensity).extend(base.w)
}

pub fn shade_flat(mesh: &MeshUbo, uv: Vec2, texture: &impl TextureSampler) -> Vec4 {
    base_color(mesh, uv, texture)
}

pub fn shade_textured(uv: Vec2, texture: &impl TextureSampler) -> Vec4 {
    texture.sample(uv)
}
