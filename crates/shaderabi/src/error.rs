use spvreflect::{DescriptorKind, ShaderStage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to reflect shader module")]
    Reflect(#[from] spvreflect::Error),
    #[error("module `{0}` has no recognised entry point stage")]
    UnknownStage(String),
    #[error("set {set} binding {binding} is {first} in one stage and {second} in another")]
    KindConflict {
        set: u32,
        binding: u32,
        first: DescriptorKind,
        second: DescriptorKind,
    },
    #[error("set {set} binding {binding} has descriptor count {first} in one stage and {second} in another")]
    CountConflict {
        set: u32,
        binding: u32,
        first: u32,
        second: u32,
    },
    #[error("set {set} binding {binding} declares a different type in the {first} and {second} stages")]
    TypeConflict {
        set: u32,
        binding: u32,
        first: ShaderStage,
        second: ShaderStage,
    },
    #[error("unknown shader variant `{0}` (expected lit, flat or textured)")]
    UnknownVariant(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero (got {width}x{height})")]
    ZeroSize { width: u32, height: u32 },
    #[error("expected {expected} texels, got {found}")]
    TexelCount { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("failed to reflect shader module")]
    Reflect(#[from] spvreflect::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("module `{0}` has no entry point")]
    NoEntryPoint(String),
    #[error("struct `{name}` differs between `{first}` and `{second}`")]
    InconsistentStruct {
        name: String,
        first: String,
        second: String,
    },
    #[error("{context}: {ty} has no Rust equivalent")]
    Unsupported { context: String, ty: String },
    #[error("{context}: member `{member}` has no offset")]
    MissingOffset { context: String, member: String },
    #[error("{context}: member `{member}` at offset {offset} overlaps the previous member")]
    Overlap {
        context: String,
        member: String,
        offset: u32,
    },
    #[error("{context}: member `{member}` at offset {offset} is not {align}-byte aligned")]
    Misaligned {
        context: String,
        member: String,
        offset: u32,
        align: u32,
    },
}
