//! The fixed interface between the bundled shaders and engine code: uniform
//! block structs, vertex layouts, descriptor set layouts per shader variant,
//! checks that compiled or source shaders still honour them, and Rust
//! bindings generated from reflected modules.

pub mod codegen;
mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod glsl;
mod layout;
pub mod shading;
pub mod sources;
mod uniforms;
mod validate;
mod vertex;

pub use error::{CodegenError, LayoutError, TextureError};
pub use layout::{
    BindingDesc, PipelineLayoutDesc, ShaderVariant, StageFlags, SET_FRAME, SET_GLOBAL, SET_OBJECT,
};
pub use uniforms::{
    BlockLayout, CameraUbo, GlobalLightUbo, MeshFlags, MeshUbo, CAMERA_BLOCK, LIGHT_BLOCK,
    MESH_BLOCK,
};
pub use validate::{compare_block, lint_source, validate_pipeline, LayoutIssue, LintFinding};
pub use vertex::{LitVertex, TexturedVertex, VertexAttribute, VertexFormat, VertexLayout};

pub use spvreflect::{DescriptorKind, ShaderStage};
