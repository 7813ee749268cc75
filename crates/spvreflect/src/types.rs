use serde::Serialize;

use crate::consts::{dim, storage_class};

/// Resolved SPIR-V type tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeInfo {
    Void,
    Bool,
    Int {
        width: u32,
        signed: bool,
    },
    Float {
        width: u32,
    },
    Vector {
        component: Box<TypeInfo>,
        count: u32,
    },
    Matrix {
        column: Box<TypeInfo>,
        columns: u32,
    },
    Struct {
        name: String,
        members: Vec<StructMember>,
    },
    Pointer {
        storage_class: u32,
        pointee: Box<TypeInfo>,
    },
    Image {
        sampled_type: Box<TypeInfo>,
        dim: u32,
        depth: u32,
        arrayed: bool,
        multisampled: bool,
        sampled: u32,
        format: u32,
    },
    Sampler,
    SampledImage {
        image: Box<TypeInfo>,
    },
    Array {
        element: Box<TypeInfo>,
        length: u32,
        stride: Option<u32>,
    },
    RuntimeArray {
        element: Box<TypeInfo>,
        stride: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructMember {
    pub name: String,
    /// Byte offset; absent for interface blocks such as `gl_PerVertex`.
    pub offset: Option<u32>,
    pub matrix_stride: Option<u32>,
    pub ty: TypeInfo,
}

impl StructMember {
    pub fn size(&self) -> Option<u32> {
        match (&self.ty, self.matrix_stride) {
            (TypeInfo::Matrix { columns, .. }, Some(stride)) => stride.checked_mul(*columns),
            _ => self.ty.size(),
        }
    }
}

impl TypeInfo {
    /// Byte size of the type as laid out in memory, honouring explicit
    /// offsets and strides. Opaque and runtime-sized types have no size, nor
    /// do types whose size does not fit in a `u32`.
    pub fn size(&self) -> Option<u32> {
        match self {
            TypeInfo::Int { width, .. } | TypeInfo::Float { width } => Some(width / 8),
            TypeInfo::Vector { component, count } => component.size()?.checked_mul(*count),
            TypeInfo::Matrix { column, columns } => column.size()?.checked_mul(*columns),
            TypeInfo::Struct { members, .. } => {
                let mut end = 0;
                let mut cursor = 0;
                for member in members {
                    let size = member.size()?;
                    let start = member.offset.unwrap_or(cursor);
                    cursor = start.checked_add(size)?;
                    end = end.max(cursor);
                }
                Some(end)
            }
            TypeInfo::Array {
                element,
                length,
                stride,
            } => match stride {
                Some(stride) => stride.checked_mul(*length),
                None => element.size()?.checked_mul(*length),
            },
            _ => None,
        }
    }

    /// Number of scalar components of a scalar or vector type.
    pub fn component_count(&self) -> Option<u32> {
        match self {
            TypeInfo::Bool | TypeInfo::Int { .. } | TypeInfo::Float { .. } => Some(1),
            TypeInfo::Vector { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Count of descriptors a variable of this type occupies, or `None`
    /// when nested array lengths overflow a `u32`.
    pub fn descriptor_count(&self) -> Option<u32> {
        match self {
            TypeInfo::Array {
                element, length, ..
            } => length.checked_mul(element.descriptor_count()?),
            TypeInfo::Pointer { pointee, .. } => pointee.descriptor_count(),
            _ => Some(1),
        }
    }

    /// Structural equality ignoring struct and member names: two stages
    /// declaring the same block under different names still agree.
    pub fn same_layout(&self, other: &TypeInfo) -> bool {
        match (self, other) {
            (TypeInfo::Struct { members: a, .. }, TypeInfo::Struct { members: b, .. }) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| {
                        x.offset == y.offset && x.matrix_stride == y.matrix_stride && x.ty.same_layout(&y.ty)
                    })
            }
            (
                TypeInfo::Vector { component: a, count: n },
                TypeInfo::Vector { component: b, count: m },
            ) => n == m && a.same_layout(b),
            (
                TypeInfo::Matrix { column: a, columns: n },
                TypeInfo::Matrix { column: b, columns: m },
            ) => n == m && a.same_layout(b),
            (
                TypeInfo::Array { element: a, length: n, stride: s },
                TypeInfo::Array { element: b, length: m, stride: t },
            ) => n == m && s == t && a.same_layout(b),
            (
                TypeInfo::RuntimeArray { element: a, stride: s },
                TypeInfo::RuntimeArray { element: b, stride: t },
            ) => s == t && a.same_layout(b),
            (
                TypeInfo::Pointer { storage_class: c, pointee: a },
                TypeInfo::Pointer { storage_class: d, pointee: b },
            ) => c == d && a.same_layout(b),
            _ => self == other,
        }
    }

    /// Type with pointer indirection removed.
    pub fn pointee(&self) -> &TypeInfo {
        match self {
            TypeInfo::Pointer { pointee, .. } => pointee.pointee(),
            other => other,
        }
    }

    /// Innermost element type once pointers and arrays are removed.
    pub fn base_element(&self) -> &TypeInfo {
        match self {
            TypeInfo::Pointer { pointee, .. } => pointee.base_element(),
            TypeInfo::Array { element, .. } | TypeInfo::RuntimeArray { element, .. } => {
                element.base_element()
            }
            other => other,
        }
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self.base_element() {
            TypeInfo::Struct { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// GLSL spelling of the type, used for human readable reports.
    pub fn glsl_name(&self) -> String {
        match self {
            TypeInfo::Void => "void".to_string(),
            TypeInfo::Bool => "bool".to_string(),
            TypeInfo::Int { width: 32, signed } => {
                let name = if *signed { "int" } else { "uint" };
                name.to_string()
            }
            TypeInfo::Int { width, signed } => {
                format!("{}int{width}_t", if *signed { "" } else { "u" })
            }
            TypeInfo::Float { width: 32 } => "float".to_string(),
            TypeInfo::Float { width: 64 } => "double".to_string(),
            TypeInfo::Float { width } => format!("float{width}_t"),
            TypeInfo::Vector { component, count } => {
                let prefix = match component.as_ref() {
                    TypeInfo::Float { width: 64 } => "d",
                    TypeInfo::Int { signed: true, .. } => "i",
                    TypeInfo::Int { signed: false, .. } => "u",
                    TypeInfo::Bool => "b",
                    _ => "",
                };
                format!("{prefix}vec{count}")
            }
            TypeInfo::Matrix { column, columns } => {
                let rows = column.component_count().unwrap_or(0);
                if rows == *columns {
                    format!("mat{columns}")
                } else {
                    format!("mat{columns}x{rows}")
                }
            }
            TypeInfo::Struct { name, .. } => name.clone(),
            TypeInfo::Pointer { pointee, .. } => pointee.glsl_name(),
            TypeInfo::Image { dim, .. } => format!("texture{}", dim_suffix(*dim)),
            TypeInfo::Sampler => "sampler".to_string(),
            TypeInfo::SampledImage { image } => match image.as_ref() {
                TypeInfo::Image { dim, .. } => format!("sampler{}", dim_suffix(*dim)),
                _ => "sampler".to_string(),
            },
            TypeInfo::Array {
                element, length, ..
            } => format!("{}[{length}]", element.glsl_name()),
            TypeInfo::RuntimeArray { element, .. } => format!("{}[]", element.glsl_name()),
        }
    }
}

fn dim_suffix(value: u32) -> &'static str {
    match value {
        dim::DIM_1D => "1D",
        dim::DIM_2D => "2D",
        dim::DIM_3D => "3D",
        dim::CUBE => "Cube",
        dim::BUFFER => "Buffer",
        dim::SUBPASS_DATA => "SubpassInput",
        _ => "2DRect",
    }
}

/// Vulkan descriptor type a resource variable must be bound with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    InputAttachment,
}

impl DescriptorKind {
    /// Infers the descriptor kind from a resource type and the storage class
    /// of its variable. `buffer_block` marks structs decorated `BufferBlock`
    /// (pre-1.3 storage buffers).
    pub fn infer(ty: &TypeInfo, storage: u32, buffer_block: bool) -> Option<Self> {
        let kind = match (ty.base_element(), storage) {
            (TypeInfo::Sampler, storage_class::UNIFORM_CONSTANT) => Self::Sampler,
            (TypeInfo::SampledImage { .. }, storage_class::UNIFORM_CONSTANT) => {
                Self::CombinedImageSampler
            }
            (TypeInfo::Image { dim, sampled, .. }, storage_class::UNIFORM_CONSTANT) => {
                match (*dim, *sampled) {
                    (dim::BUFFER, 2) => Self::StorageTexelBuffer,
                    (dim::BUFFER, _) => Self::UniformTexelBuffer,
                    (dim::SUBPASS_DATA, _) => Self::InputAttachment,
                    (_, 2) => Self::StorageImage,
                    _ => Self::SampledImage,
                }
            }
            (TypeInfo::Struct { .. }, storage_class::UNIFORM) if buffer_block => {
                Self::StorageBuffer
            }
            (TypeInfo::Struct { .. }, storage_class::UNIFORM) => Self::UniformBuffer,
            (TypeInfo::Struct { .. }, storage_class::STORAGE_BUFFER) => Self::StorageBuffer,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sampler => "sampler",
            Self::CombinedImageSampler => "combined image sampler",
            Self::SampledImage => "sampled image",
            Self::StorageImage => "storage image",
            Self::UniformTexelBuffer => "uniform texel buffer",
            Self::StorageTexelBuffer => "storage texel buffer",
            Self::UniformBuffer => "uniform buffer",
            Self::StorageBuffer => "storage buffer",
            Self::InputAttachment => "input attachment",
        }
    }
}

impl std::fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float() -> TypeInfo {
        TypeInfo::Float { width: 32 }
    }

    fn vec(count: u32) -> TypeInfo {
        TypeInfo::Vector {
            component: Box::new(float()),
            count,
        }
    }

    #[test]
    fn struct_size_follows_offsets_and_matrix_stride() {
        let mat3 = TypeInfo::Matrix {
            column: Box::new(vec(3)),
            columns: 3,
        };
        let block = TypeInfo::Struct {
            name: "Block".into(),
            members: vec![
                StructMember {
                    name: "normal_matrix".into(),
                    offset: Some(0),
                    matrix_stride: Some(16),
                    ty: mat3,
                },
                StructMember {
                    name: "tint".into(),
                    offset: Some(48),
                    matrix_stride: None,
                    ty: vec(3),
                },
            ],
        };
        assert_eq!(block.size(), Some(60));
    }

    #[test]
    fn glsl_names_cover_common_types() {
        assert_eq!(vec(4).glsl_name(), "vec4");
        let mat4 = TypeInfo::Matrix {
            column: Box::new(vec(4)),
            columns: 4,
        };
        assert_eq!(mat4.glsl_name(), "mat4");
        let uvec2 = TypeInfo::Vector {
            component: Box::new(TypeInfo::Int {
                width: 32,
                signed: false,
            }),
            count: 2,
        };
        assert_eq!(uvec2.glsl_name(), "uvec2");
    }

    #[test]
    fn infers_descriptor_kinds() {
        let image = TypeInfo::Image {
            sampled_type: Box::new(float()),
            dim: dim::DIM_2D,
            depth: 0,
            arrayed: false,
            multisampled: false,
            sampled: 1,
            format: 0,
        };
        let combined = TypeInfo::SampledImage {
            image: Box::new(image.clone()),
        };
        let textures = TypeInfo::Array {
            element: Box::new(combined),
            length: 4,
            stride: None,
        };
        assert_eq!(
            DescriptorKind::infer(&textures, storage_class::UNIFORM_CONSTANT, false),
            Some(DescriptorKind::CombinedImageSampler)
        );
        assert_eq!(textures.descriptor_count(), Some(4));
        assert_eq!(
            DescriptorKind::infer(&image, storage_class::UNIFORM_CONSTANT, false),
            Some(DescriptorKind::SampledImage)
        );

        let block = TypeInfo::Struct {
            name: "Data".into(),
            members: vec![],
        };
        assert_eq!(
            DescriptorKind::infer(&block, storage_class::UNIFORM, false),
            Some(DescriptorKind::UniformBuffer)
        );
        assert_eq!(
            DescriptorKind::infer(&block, storage_class::UNIFORM, true),
            Some(DescriptorKind::StorageBuffer)
        );
        assert_eq!(DescriptorKind::infer(&vec(4), storage_class::UNIFORM, false), None);
    }

    #[test]
    fn oversized_arrays_have_no_size() {
        let wide = TypeInfo::Array {
            element: Box::new(TypeInfo::Int {
                width: 32,
                signed: false,
            }),
            length: 70_000,
            stride: Some(70_000),
        };
        assert_eq!(wide.size(), None);

        let block = TypeInfo::Struct {
            name: "Huge".into(),
            members: vec![StructMember {
                name: "data".into(),
                offset: Some(16),
                matrix_stride: None,
                ty: wide,
            }],
        };
        assert_eq!(block.size(), None);

        let sampler = TypeInfo::Sampler;
        let inner = TypeInfo::Array {
            element: Box::new(sampler),
            length: 70_000,
            stride: None,
        };
        let nested = TypeInfo::Array {
            element: Box::new(inner.clone()),
            length: 70_000,
            stride: None,
        };
        assert_eq!(inner.descriptor_count(), Some(70_000));
        assert_eq!(nested.descriptor_count(), None);
    }

    #[test]
    fn same_layout_ignores_names_but_not_offsets() {
        let member = |name: &str, offset| StructMember {
            name: name.into(),
            offset: Some(offset),
            matrix_stride: None,
            ty: vec(4),
        };
        let a = TypeInfo::Struct {
            name: "MeshUbo".into(),
            members: vec![member("color", 0), member("tint", 16)],
        };
        let renamed = TypeInfo::Struct {
            name: "".into(),
            members: vec![member("a", 0), member("b", 16)],
        };
        let moved = TypeInfo::Struct {
            name: "MeshUbo".into(),
            members: vec![member("color", 0), member("tint", 32)],
        };
        assert!(a.same_layout(&renamed));
        assert!(!a.same_layout(&moved));
        assert!(!a.same_layout(&vec(4)));
    }
}
