//! Rust bindings rendered from reflected modules: `#[repr(C)]` structs for
//! uniform blocks and vertex inputs, plus constants for module paths, entry
//! points and descriptor bindings.
//!
//! Every struct carries explicit `_padN` byte arrays, so the rendered types
//! have no implicit padding and can implement `bytemuck::Pod`.

use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use spvreflect::{DescriptorKind, Module, ShaderStage, StructMember, TypeInfo};
use tracing::debug;

use crate::error::CodegenError;
use crate::layout::PipelineLayoutDesc;

/// std140 structs start and end on a vec4 boundary.
const BLOCK_ALIGN: u32 = 16;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "self", "Self",
    "static", "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustField {
    pub name: String,
    pub ty: String,
    pub offset: u32,
    pub size: u32,
    pub padding: bool,
}

/// One rendered struct with every byte accounted for by a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructPlan {
    pub name: String,
    pub fields: Vec<RustField>,
    pub size: u32,
    /// `repr(align)` of the struct, for uniform blocks.
    pub align: Option<u32>,
}

impl StructPlan {
    pub fn field(&self, name: &str) -> Option<&RustField> {
        self.fields.iter().find(|field| !field.padding && field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    Str(String),
    U32(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub value: ConstValue,
}

impl Constant {
    fn text(name: String, value: String) -> Self {
        Self {
            name,
            value: ConstValue::Str(value),
        }
    }

    fn number(name: String, value: u32) -> Self {
        Self {
            name,
            value: ConstValue::U32(value),
        }
    }
}

/// Items generated for a set of modules; `Display` renders them as Rust.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub constants: Vec<Constant>,
    /// Uniform blocks and the structs nested in them, ordered by name.
    pub blocks: Vec<StructPlan>,
    /// One vertex struct per vertex-stage module.
    pub vertices: Vec<StructPlan>,
}

impl Bindings {
    pub fn block(&self, name: &str) -> Option<&StructPlan> {
        self.blocks.iter().find(|plan| plan.name == name)
    }

    pub fn vertex(&self, name: &str) -> Option<&StructPlan> {
        self.vertices.iter().find(|plan| plan.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstValue> {
        self.constants
            .iter()
            .find(|constant| constant.name == name)
            .map(|constant| &constant.value)
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// @generated by shaderbake codegen. Do not edit.")?;
        if !self.constants.is_empty() {
            writeln!(f)?;
        }
        for constant in &self.constants {
            match &constant.value {
                ConstValue::Str(text) => writeln!(f, "pub const {}: &str = {text:?};", constant.name)?,
                ConstValue::U32(value) => writeln!(f, "pub const {}: u32 = {value};", constant.name)?,
            }
        }
        for plan in self.blocks.iter().chain(&self.vertices) {
            writeln!(f)?;
            write!(f, "{plan}")?;
        }
        Ok(())
    }
}

impl fmt::Display for StructPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.align {
            Some(align) => writeln!(f, "#[repr(C, align({align}))]")?,
            None => writeln!(f, "#[repr(C)]")?,
        }
        writeln!(f, "#[derive(Clone, Copy, Debug)]")?;
        writeln!(f, "pub struct {} {{", self.name)?;
        for field in &self.fields {
            writeln!(f, "    pub {}: {},", field.name, field.ty)?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "unsafe impl bytemuck::Zeroable for {} {{}}", self.name)?;
        writeln!(f, "unsafe impl bytemuck::Pod for {} {{}}", self.name)
    }
}

/// Reflects `modules` and plans the bindings for them. Each module is
/// paired with the path its constant should point at.
pub fn generate(modules: &[(&Path, &Module)]) -> Result<Bindings, CodegenError> {
    let mut planner = Planner::default();
    let mut blocks: BTreeMap<String, (String, TypeInfo)> = BTreeMap::new();
    let mut constants = Vec::new();
    let mut vertices = Vec::new();

    for &(path, module) in modules {
        let stem = const_ident(module.name());
        constants.push(Constant::text(format!("{stem}_PATH"), path.display().to_string()));
        constants.push(Constant::text(format!("{stem}_ENTRY"), entry_point(module)?));

        for binding in module.descriptor_bindings()? {
            if binding.kind != DescriptorKind::UniformBuffer {
                continue;
            }
            let ty = binding.ty.base_element();
            let TypeInfo::Struct { name, .. } = ty else {
                continue;
            };
            let name = if name.is_empty() {
                format!("Set{}Binding{}", binding.set, binding.binding)
            } else {
                type_ident(name)
            };
            match blocks.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert((module.name().to_string(), ty.clone()));
                }
                Entry::Occupied(slot) => {
                    let (first, existing) = slot.get();
                    if !existing.same_layout(ty) {
                        return Err(CodegenError::InconsistentStruct {
                            name: slot.key().clone(),
                            first: first.clone(),
                            second: module.name().to_string(),
                        });
                    }
                }
            }
        }

        if module.stage() == Some(ShaderStage::Vertex) {
            vertices.push(planner.vertex(module)?);
        }
    }

    for (name, (_, ty)) in &blocks {
        let TypeInfo::Struct { members, .. } = ty else {
            continue;
        };
        if planner.structs.contains_key(name) {
            continue;
        }
        let plan = planner.plan(name, &block_members(members), false, Some(BLOCK_ALIGN))?;
        planner.structs.insert(name.clone(), plan);
    }

    let module_refs: Vec<&Module> = modules.iter().map(|&(_, module)| module).collect();
    let layout = PipelineLayoutDesc::from_modules(&module_refs)?;
    let mut taken = HashSet::new();
    for binding in layout.bindings() {
        let mut stem = const_ident(&binding.name);
        if !taken.insert(stem.clone()) {
            stem = format!("{stem}_{}_{}", binding.set, binding.binding);
        }
        constants.push(Constant::number(format!("{stem}_SET"), binding.set));
        constants.push(Constant::number(format!("{stem}_BINDING"), binding.binding));
    }
    constants.push(Constant::number("DESCRIPTOR_SET_COUNT".to_string(), layout.set_count()));

    let bindings = Bindings {
        constants,
        blocks: planner.structs.into_values().collect(),
        vertices,
    };
    debug!(
        modules = modules.len(),
        blocks = bindings.blocks.len(),
        vertices = bindings.vertices.len(),
        "planned bindings"
    );
    Ok(bindings)
}

fn entry_point(module: &Module) -> Result<String, CodegenError> {
    let entries = module.entry_points()?;
    entries
        .iter()
        .find(|entry| entry.name == "main")
        .or_else(|| entries.first())
        .map(|entry| entry.name.clone())
        .ok_or_else(|| CodegenError::NoEntryPoint(module.name().to_string()))
}

struct PlanMember<'a> {
    name: &'a str,
    ty: &'a TypeInfo,
    offset: Option<u32>,
    matrix_stride: Option<u32>,
}

fn block_members(members: &[StructMember]) -> Vec<PlanMember<'_>> {
    members
        .iter()
        .map(|member| PlanMember {
            name: &member.name,
            ty: &member.ty,
            offset: member.offset,
            matrix_stride: member.matrix_stride,
        })
        .collect()
}

struct RustType {
    text: String,
    size: u32,
    align: u32,
    /// Set for scalars and vectors, which can be widened to an array stride.
    scalar: Option<&'static str>,
}

#[derive(Default)]
struct Planner {
    structs: BTreeMap<String, StructPlan>,
}

impl Planner {
    /// Lays out `members` at their offsets, or packed in order when
    /// `packed` and no offset is given, filling gaps with byte arrays.
    fn plan(
        &mut self,
        name: &str,
        members: &[PlanMember<'_>],
        packed: bool,
        repr_align: Option<u32>,
    ) -> Result<StructPlan, CodegenError> {
        let mut fields = Vec::with_capacity(members.len());
        let mut cursor = 0u32;
        let mut align = 1u32;
        let mut pads = 0;

        for (index, member) in members.iter().enumerate() {
            let context = format!("{name}.{}", member.name);
            let ty = self.rust_type(member.ty, member.matrix_stride, &context)?;
            let offset = match member.offset {
                Some(offset) => offset,
                None if packed => {
                    cursor
                        .checked_next_multiple_of(ty.align)
                        .ok_or_else(|| CodegenError::Unsupported {
                            context: context.clone(),
                            ty: member.ty.glsl_name(),
                        })?
                }
                None => {
                    return Err(CodegenError::MissingOffset {
                        context: name.to_string(),
                        member: member.name.to_string(),
                    })
                }
            };
            if offset < cursor {
                return Err(CodegenError::Overlap {
                    context: name.to_string(),
                    member: member.name.to_string(),
                    offset,
                });
            }
            if offset % ty.align != 0 {
                return Err(CodegenError::Misaligned {
                    context: name.to_string(),
                    member: member.name.to_string(),
                    offset,
                    align: ty.align,
                });
            }
            if offset > cursor {
                fields.push(padding(&mut pads, cursor, offset - cursor));
            }
            cursor = offset.checked_add(ty.size).ok_or_else(|| CodegenError::Unsupported {
                context: context.clone(),
                ty: member.ty.glsl_name(),
            })?;
            align = align.max(ty.align);
            fields.push(RustField {
                name: field_ident(member.name, index),
                ty: ty.text,
                offset,
                size: ty.size,
                padding: false,
            });
        }

        let align = repr_align.map_or(align, |repr| repr.max(align));
        let size = cursor
            .checked_next_multiple_of(align)
            .ok_or_else(|| CodegenError::Unsupported {
                context: name.to_string(),
                ty: "struct".to_string(),
            })?;
        if size > cursor {
            fields.push(padding(&mut pads, cursor, size - cursor));
        }
        Ok(StructPlan {
            name: name.to_string(),
            fields,
            size,
            align: repr_align,
        })
    }

    fn vertex(&mut self, module: &Module) -> Result<StructPlan, CodegenError> {
        let inputs = module.inputs()?;
        let members: Vec<PlanMember<'_>> = inputs
            .iter()
            .map(|input| PlanMember {
                name: input.name.strip_prefix("in_").unwrap_or(&input.name),
                ty: &input.ty,
                offset: None,
                matrix_stride: None,
            })
            .collect();
        let stem = module.name().strip_suffix("Vert").unwrap_or(module.name());
        let name = format!("{}Vertex", type_ident(stem));
        self.plan(&name, &members, true, None)
    }

    fn rust_type(
        &mut self,
        ty: &TypeInfo,
        matrix_stride: Option<u32>,
        context: &str,
    ) -> Result<RustType, CodegenError> {
        let unsupported = || CodegenError::Unsupported {
            context: context.to_string(),
            ty: ty.glsl_name(),
        };
        match ty {
            TypeInfo::Bool | TypeInfo::Int { .. } | TypeInfo::Float { .. } => {
                let (scalar, width) = scalar_type(ty).ok_or_else(unsupported)?;
                Ok(RustType {
                    text: scalar.to_string(),
                    size: width,
                    align: width,
                    scalar: Some(scalar),
                })
            }
            TypeInfo::Vector { component, count } => {
                let (scalar, width) = scalar_type(component).ok_or_else(unsupported)?;
                Ok(RustType {
                    text: format!("[{scalar}; {count}]"),
                    size: width.checked_mul(*count).ok_or_else(unsupported)?,
                    align: width,
                    scalar: Some(scalar),
                })
            }
            TypeInfo::Matrix { column, columns } => {
                let column = self.rust_type(column, None, context)?;
                let stride = matrix_stride.unwrap_or(column.size);
                let column = widen(column, stride).ok_or_else(unsupported)?;
                Ok(RustType {
                    text: format!("[{}; {columns}]", column.text),
                    size: stride.checked_mul(*columns).ok_or_else(unsupported)?,
                    align: column.align,
                    scalar: None,
                })
            }
            TypeInfo::Array {
                element,
                length,
                stride,
            } => {
                let element = self.rust_type(element, matrix_stride, context)?;
                let stride = stride.unwrap_or(element.size);
                let element = widen(element, stride).ok_or_else(unsupported)?;
                Ok(RustType {
                    text: format!("[{}; {length}]", element.text),
                    size: stride.checked_mul(*length).ok_or_else(unsupported)?,
                    align: element.align,
                    scalar: None,
                })
            }
            TypeInfo::Struct { name, members } if !name.is_empty() => {
                let name = type_ident(name);
                let size = match self.structs.get(&name) {
                    Some(plan) => plan.size,
                    None => {
                        let plan = self.plan(&name, &block_members(members), false, Some(BLOCK_ALIGN))?;
                        let size = plan.size;
                        self.structs.insert(name.clone(), plan);
                        size
                    }
                };
                Ok(RustType {
                    text: name,
                    size,
                    align: BLOCK_ALIGN,
                    scalar: None,
                })
            }
            _ => Err(unsupported()),
        }
    }
}

/// Widens a scalar or vector element to occupy `stride` bytes, as std140
/// array elements and matrix columns do.
fn widen(ty: RustType, stride: u32) -> Option<RustType> {
    if stride == ty.size {
        return Some(ty);
    }
    let scalar = ty.scalar?;
    if stride < ty.size || stride % ty.align != 0 {
        return None;
    }
    Some(RustType {
        text: format!("[{scalar}; {}]", stride / ty.align),
        size: stride,
        align: ty.align,
        scalar: None,
    })
}

fn scalar_type(ty: &TypeInfo) -> Option<(&'static str, u32)> {
    let scalar = match ty {
        // Booleans occupy a 32-bit word in uniform blocks.
        TypeInfo::Bool => ("u32", 4),
        TypeInfo::Int { width: 8, signed } => (if *signed { "i8" } else { "u8" }, 1),
        TypeInfo::Int { width: 16, signed } => (if *signed { "i16" } else { "u16" }, 2),
        TypeInfo::Int { width: 32, signed } => (if *signed { "i32" } else { "u32" }, 4),
        TypeInfo::Int { width: 64, signed } => (if *signed { "i64" } else { "u64" }, 8),
        TypeInfo::Float { width: 32 } => ("f32", 4),
        TypeInfo::Float { width: 64 } => ("f64", 8),
        _ => return None,
    };
    Some(scalar)
}

fn padding(pads: &mut usize, offset: u32, size: u32) -> RustField {
    let field = RustField {
        name: format!("_pad{pads}"),
        ty: format!("[u8; {size}]"),
        offset,
        size,
        padding: true,
    };
    *pads += 1;
    field
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn field_ident(name: &str, index: usize) -> String {
    let mut ident = sanitize(name);
    if ident.is_empty() || ident == "_" {
        return format!("field{index}");
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

fn type_ident(name: &str) -> String {
    let mut ident = sanitize(name);
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// `LitVert` -> `LIT_VERT`, `camera` -> `CAMERA`.
fn const_ident(name: &str) -> String {
    let mut ident = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for c in name.chars() {
        if previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) && c.is_ascii_uppercase() {
            ident.push('_');
        }
        ident.push(if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' });
        previous = Some(c);
    }
    if ident.is_empty() {
        return "UNNAMED".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}
