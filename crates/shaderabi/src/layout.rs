use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::Serialize;
use spvreflect::{DescriptorBinding, DescriptorKind, Module, ShaderStage, TypeInfo};
use tracing::debug;

use crate::error::LayoutError;
use crate::uniforms::{BlockLayout, CAMERA_BLOCK, LIGHT_BLOCK, MESH_BLOCK};
use crate::vertex::{LitVertex, TexturedVertex, VertexAttribute, VertexLayout};

/// Per-frame data.
pub const SET_FRAME: u32 = 0;
/// Per-object data.
pub const SET_OBJECT: u32 = 1;
/// Rarely updated data.
pub const SET_GLOBAL: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct StageFlags(u32);

impl StageFlags {
    pub const NONE: StageFlags = StageFlags(0);
    pub const VERTEX: StageFlags = StageFlags(1 << 0);
    pub const TESSELLATION_CONTROL: StageFlags = StageFlags(1 << 1);
    pub const TESSELLATION_EVALUATION: StageFlags = StageFlags(1 << 2);
    pub const GEOMETRY: StageFlags = StageFlags(1 << 3);
    pub const FRAGMENT: StageFlags = StageFlags(1 << 4);
    pub const COMPUTE: StageFlags = StageFlags(1 << 5);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: StageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags present in `self` but not in `other`.
    pub const fn difference(self, other: StageFlags) -> StageFlags {
        StageFlags(self.0 & !other.0)
    }

    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .filter(move |stage| self.contains(StageFlags::from(*stage)))
    }
}

impl From<ShaderStage> for StageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => StageFlags::VERTEX,
            ShaderStage::TessellationControl => StageFlags::TESSELLATION_CONTROL,
            ShaderStage::TessellationEvaluation => StageFlags::TESSELLATION_EVALUATION,
            ShaderStage::Geometry => StageFlags::GEOMETRY,
            ShaderStage::Fragment => StageFlags::FRAGMENT,
            ShaderStage::Compute => StageFlags::COMPUTE,
        }
    }
}

impl BitOr for StageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        StageFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for StageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for StageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<String> = self.stages().map(|stage| stage.to_string()).collect();
        f.write_str(&names.join("|"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingDesc {
    pub set: u32,
    pub binding: u32,
    pub name: String,
    pub kind: DescriptorKind,
    pub count: u32,
    pub stages: StageFlags,
    /// Host-side layout for uniform blocks the engine fills.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockLayout>,
}

impl BindingDesc {
    fn expected(
        set: u32,
        binding: u32,
        name: &str,
        kind: DescriptorKind,
        stages: StageFlags,
        block: Option<BlockLayout>,
    ) -> Self {
        Self {
            set,
            binding,
            name: name.to_string(),
            kind,
            count: 1,
            stages,
            block,
        }
    }

    fn reflected(binding: &DescriptorBinding, stage: ShaderStage) -> Self {
        Self {
            set: binding.set,
            binding: binding.binding,
            name: binding.name.clone(),
            kind: binding.kind,
            count: binding.count,
            stages: stage.into(),
            block: None,
        }
    }
}

impl fmt::Display for BindingDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "set {} binding {}: {} `{}`",
            self.set, self.binding, self.kind, self.name
        )?;
        if self.count != 1 {
            write!(f, "[{}]", self.count)?;
        }
        write!(f, " ({})", self.stages)
    }
}

/// Descriptor bindings of a whole pipeline, ordered by `(set, binding)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineLayoutDesc {
    bindings: Vec<BindingDesc>,
}

impl PipelineLayoutDesc {
    pub fn new(mut bindings: Vec<BindingDesc>) -> Self {
        bindings.sort_by_key(|b| (b.set, b.binding));
        Self { bindings }
    }

    /// Merges the reflected bindings of several stages, OR-ing stage
    /// visibility of bindings that appear in more than one stage.
    pub fn from_stages<'a, I>(stages: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = (ShaderStage, &'a [DescriptorBinding])>,
    {
        let mut merged: BTreeMap<(u32, u32), BindingDesc> = BTreeMap::new();
        let mut first_types: BTreeMap<(u32, u32), (ShaderStage, &'a TypeInfo)> = BTreeMap::new();
        for (stage, bindings) in stages {
            for binding in bindings {
                match merged.entry((binding.set, binding.binding)) {
                    Entry::Vacant(slot) => {
                        slot.insert(BindingDesc::reflected(binding, stage));
                        first_types.insert((binding.set, binding.binding), (stage, &binding.ty));
                    }
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        if existing.kind != binding.kind {
                            return Err(LayoutError::KindConflict {
                                set: binding.set,
                                binding: binding.binding,
                                first: existing.kind,
                                second: binding.kind,
                            });
                        }
                        if existing.count != binding.count {
                            return Err(LayoutError::CountConflict {
                                set: binding.set,
                                binding: binding.binding,
                                first: existing.count,
                                second: binding.count,
                            });
                        }
                        if let Some(&(first, ty)) = first_types.get(&(binding.set, binding.binding)) {
                            if !ty.same_layout(&binding.ty) {
                                return Err(LayoutError::TypeConflict {
                                    set: binding.set,
                                    binding: binding.binding,
                                    first,
                                    second: stage,
                                });
                            }
                        }
                        existing.stages |= stage.into();
                    }
                }
            }
        }
        Ok(Self {
            bindings: merged.into_values().collect(),
        })
    }

    /// Reflects each module and merges the results.
    pub fn from_modules(modules: &[&Module]) -> Result<Self, LayoutError> {
        let mut reflected = Vec::with_capacity(modules.len());
        for module in modules {
            let stage = module
                .stage()
                .ok_or_else(|| LayoutError::UnknownStage(module.name().to_string()))?;
            let bindings = module.descriptor_bindings()?;
            debug!(module = module.name(), %stage, count = bindings.len(), "reflected bindings");
            reflected.push((stage, bindings));
        }
        Self::from_stages(
            reflected
                .iter()
                .map(|(stage, bindings)| (*stage, bindings.as_slice())),
        )
    }

    pub fn bindings(&self) -> &[BindingDesc] {
        &self.bindings
    }

    pub fn get(&self, set: u32, binding: u32) -> Option<&BindingDesc> {
        self.bindings
            .binary_search_by_key(&(set, binding), |b| (b.set, b.binding))
            .ok()
            .map(|index| &self.bindings[index])
    }

    /// Highest descriptor set index in use, plus one.
    pub fn set_count(&self) -> u32 {
        self.bindings.last().map_or(0, |b| b.set + 1)
    }

    pub fn set(&self, set: u32) -> impl Iterator<Item = &BindingDesc> {
        self.bindings.iter().filter(move |b| b.set == set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderVariant {
    Lit,
    Flat,
    Textured,
}

impl ShaderVariant {
    pub const ALL: [ShaderVariant; 3] = [ShaderVariant::Lit, ShaderVariant::Flat, ShaderVariant::Textured];

    pub const fn name(self) -> &'static str {
        match self {
            ShaderVariant::Lit => "lit",
            ShaderVariant::Flat => "flat",
            ShaderVariant::Textured => "textured",
        }
    }

    /// Matches a source or output file name such as `lit.frag.spv`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.split('.').next()?;
        stem.parse().ok()
    }

    pub fn expected_layout(self) -> PipelineLayoutDesc {
        use DescriptorKind::{CombinedImageSampler, UniformBuffer};

        let vertex = StageFlags::VERTEX;
        let fragment = StageFlags::FRAGMENT;
        let camera = BindingDesc::expected(SET_FRAME, 0, "camera", UniformBuffer, vertex, Some(CAMERA_BLOCK));
        let bindings = match self {
            ShaderVariant::Lit => vec![
                camera,
                BindingDesc::expected(SET_OBJECT, 0, "mesh", UniformBuffer, vertex | fragment, Some(MESH_BLOCK)),
                BindingDesc::expected(SET_OBJECT, 1, "tex", CombinedImageSampler, fragment, None),
                BindingDesc::expected(SET_GLOBAL, 0, "light", UniformBuffer, fragment, Some(LIGHT_BLOCK)),
            ],
            ShaderVariant::Flat => vec![
                camera,
                BindingDesc::expected(SET_OBJECT, 0, "mesh", UniformBuffer, vertex | fragment, Some(MESH_BLOCK)),
                BindingDesc::expected(SET_OBJECT, 1, "tex", CombinedImageSampler, fragment, None),
            ],
            ShaderVariant::Textured => vec![
                camera,
                BindingDesc::expected(SET_OBJECT, 0, "mesh", UniformBuffer, vertex, Some(MESH_BLOCK)),
                BindingDesc::expected(SET_GLOBAL, 0, "tex", CombinedImageSampler, fragment, None),
            ],
        };
        PipelineLayoutDesc::new(bindings)
    }

    pub fn vertex_attributes(self) -> &'static [VertexAttribute] {
        match self {
            ShaderVariant::Lit => LitVertex::ATTRIBUTES,
            ShaderVariant::Flat | ShaderVariant::Textured => TexturedVertex::ATTRIBUTES,
        }
    }

    pub fn vertex_stride(self) -> u32 {
        match self {
            ShaderVariant::Lit => LitVertex::stride(),
            ShaderVariant::Flat | ShaderVariant::Textured => TexturedVertex::stride(),
        }
    }
}

impl fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderVariant {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lit" => Ok(ShaderVariant::Lit),
            "flat" => Ok(ShaderVariant::Flat),
            "textured" => Ok(ShaderVariant::Textured),
            other => Err(LayoutError::UnknownVariant(other.to_string())),
        }
    }
}
