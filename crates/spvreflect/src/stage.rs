use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::consts::execution_model;

/// Pipeline stage a shader source or module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// Maps the conventional glslc file extension (`vert`, `frag`, ...) to a stage.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "vert" => Some(Self::Vertex),
            "tesc" => Some(Self::TessellationControl),
            "tese" => Some(Self::TessellationEvaluation),
            "geom" => Some(Self::Geometry),
            "frag" => Some(Self::Fragment),
            "comp" => Some(Self::Compute),
            _ => None,
        }
    }

    /// Infers the stage of a source path such as `lit.frag` or a compiled
    /// `lit.frag.spv`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut path = path.to_path_buf();
        if path.extension().and_then(|ext| ext.to_str()) == Some("spv") {
            path.set_extension("");
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessellationControl => "tesc",
            Self::TessellationEvaluation => "tese",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }

    pub fn from_execution_model(model: u32) -> Option<Self> {
        match model {
            execution_model::VERTEX => Some(Self::Vertex),
            execution_model::TESSELLATION_CONTROL => Some(Self::TessellationControl),
            execution_model::TESSELLATION_EVALUATION => Some(Self::TessellationEvaluation),
            execution_model::GEOMETRY => Some(Self::Geometry),
            execution_model::FRAGMENT => Some(Self::Fragment),
            execution_model::GL_COMPUTE => Some(Self::Compute),
            _ => None,
        }
    }

    pub fn execution_model(self) -> u32 {
        match self {
            Self::Vertex => execution_model::VERTEX,
            Self::TessellationControl => execution_model::TESSELLATION_CONTROL,
            Self::TessellationEvaluation => execution_model::TESSELLATION_EVALUATION,
            Self::Geometry => execution_model::GEOMETRY,
            Self::Fragment => execution_model::FRAGMENT,
            Self::Compute => execution_model::GL_COMPUTE,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Vertex => "vertex",
            Self::TessellationControl => "tessellation control",
            Self::TessellationEvaluation => "tessellation evaluation",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        };
        f.write_str(label)
    }
}
