//! GLSL sources for each variant, bundled from the workspace `shaders/` dir.

use spvreflect::ShaderStage;

use crate::layout::ShaderVariant;

pub const LIT_VERT: &str = include_str!("../../../shaders/lit.vert");
pub const LIT_FRAG: &str = include_str!("../../../shaders/lit.frag");
pub const FLAT_VERT: &str = include_str!("../../../shaders/flat.vert");
pub const FLAT_FRAG: &str = include_str!("../../../shaders/flat.frag");
pub const TEXTURED_VERT: &str = include_str!("../../../shaders/textured.vert");
pub const TEXTURED_FRAG: &str = include_str!("../../../shaders/textured.frag");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundledSource {
    pub variant: ShaderVariant,
    pub stage: ShaderStage,
    pub file_name: &'static str,
    pub source: &'static str,
}

pub const BUNDLED: [BundledSource; 6] = [
    bundled(ShaderVariant::Lit, ShaderStage::Vertex, "lit.vert", LIT_VERT),
    bundled(ShaderVariant::Lit, ShaderStage::Fragment, "lit.frag", LIT_FRAG),
    bundled(ShaderVariant::Flat, ShaderStage::Vertex, "flat.vert", FLAT_VERT),
    bundled(ShaderVariant::Flat, ShaderStage::Fragment, "flat.frag", FLAT_FRAG),
    bundled(ShaderVariant::Textured, ShaderStage::Vertex, "textured.vert", TEXTURED_VERT),
    bundled(ShaderVariant::Textured, ShaderStage::Fragment, "textured.frag", TEXTURED_FRAG),
];

const fn bundled(
    variant: ShaderVariant,
    stage: ShaderStage,
    file_name: &'static str,
    source: &'static str,
) -> BundledSource {
    BundledSource {
        variant,
        stage,
        file_name,
        source,
    }
}
