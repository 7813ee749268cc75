use std::fmt;
use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub const fn components(self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Float32x4 => 4,
        }
    }

    pub const fn size(self) -> u32 {
        self.components() * 4
    }

    pub const fn glsl_type(self) -> &'static str {
        match self {
            VertexFormat::Float32x2 => "vec2",
            VertexFormat::Float32x3 => "vec3",
            VertexFormat::Float32x4 => "vec4",
        }
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VertexFormat::Float32x2 => "float32x2",
            VertexFormat::Float32x3 => "float32x3",
            VertexFormat::Float32x4 => "float32x4",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset inside the interleaved vertex.
    pub offset: u32,
}

/// An interleaved vertex type with a fixed attribute layout.
pub trait VertexLayout: Pod {
    const ATTRIBUTES: &'static [VertexAttribute];

    fn stride() -> u32 {
        size_of::<Self>() as u32
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LitVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl VertexLayout for LitVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute {
            name: "position",
            location: 0,
            format: VertexFormat::Float32x3,
            offset: offset_of!(LitVertex, position) as u32,
        },
        VertexAttribute {
            name: "uv",
            location: 1,
            format: VertexFormat::Float32x2,
            offset: offset_of!(LitVertex, uv) as u32,
        },
        VertexAttribute {
            name: "normal",
            location: 2,
            format: VertexFormat::Float32x3,
            offset: offset_of!(LitVertex, normal) as u32,
        },
    ];
}

/// Vertex used by the flat and textured variants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexLayout for TexturedVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute {
            name: "position",
            location: 0,
            format: VertexFormat::Float32x3,
            offset: offset_of!(TexturedVertex, position) as u32,
        },
        VertexAttribute {
            name: "uv",
            location: 1,
            format: VertexFormat::Float32x2,
            offset: offset_of!(TexturedVertex, uv) as u32,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_vertex_is_tightly_packed() {
        assert_eq!(LitVertex::stride(), 32);
        let offsets: Vec<u32> = LitVertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        let end = LitVertex::ATTRIBUTES
            .iter()
            .map(|a| a.offset + a.format.size())
            .max();
        assert_eq!(end, Some(LitVertex::stride()));
    }

    #[test]
    fn textured_vertex_drops_normal() {
        assert_eq!(TexturedVertex::stride(), 20);
        assert_eq!(TexturedVertex::ATTRIBUTES.len(), 2);
        assert!(TexturedVertex::ATTRIBUTES.iter().all(|a| a.location < 2));
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let vertices = [
            TexturedVertex { position: [0.0, 1.0, 0.0], uv: [0.5, 0.0] },
            TexturedVertex { position: [1.0, 0.0, 0.0], uv: [1.0, 1.0] },
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 40);
    }
}
