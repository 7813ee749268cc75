//! Parses a SPIR-V binary into an instruction list plus id-indexed tables
//! (names, decorations, type definitions, constants, variables) so the
//! reflection queries below are simple lookups instead of repeated scans.
//!
//! Reflection covers what a host engine needs to bind a module: entry
//! points, location-decorated stage inputs and outputs, and descriptor
//! bindings with their resolved types and struct layouts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::consts::{decoration, op, storage_class, HEADER_WORDS, MAGIC_NUMBER, SPIRV_VERSION};
use crate::error::{Error, Result};
use crate::stage::ShaderStage;
use crate::types::{DescriptorKind, StructMember, TypeInfo};

const MAX_TYPE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub major: u32,
    pub minor: u32,
    pub generator: u32,
    pub bound: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u32,
    pub operands: Box<[u32]>,
}

impl Instruction {
    fn operand(&self, index: usize) -> Result<u32> {
        self.operands
            .get(index)
            .copied()
            .ok_or(Error::MalformedInstruction {
                opcode: self.opcode,
                index,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub name: String,
    pub stage: Option<ShaderStage>,
    pub execution_model: u32,
    #[serde(skip)]
    pub function: u32,
    #[serde(skip)]
    pub interface: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceVariable {
    pub location: u32,
    pub name: String,
    pub ty: TypeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorBinding {
    pub set: u32,
    pub binding: u32,
    pub name: String,
    pub kind: DescriptorKind,
    pub count: u32,
    pub storage_class: u32,
    /// Resource type with the variable's pointer removed.
    pub ty: TypeInfo,
}

#[derive(Debug, Clone, Copy)]
struct Variable {
    id: u32,
    type_id: u32,
    storage_class: u32,
}

type Decorations = Vec<(u32, Box<[u32]>)>;

#[derive(Debug, Default)]
struct Tables {
    names: HashMap<u32, String>,
    member_names: HashMap<(u32, u32), String>,
    decorations: HashMap<u32, Decorations>,
    member_decorations: HashMap<(u32, u32), Decorations>,
    type_defs: HashMap<u32, usize>,
    constants: HashMap<u32, u64>,
    variables: Vec<Variable>,
}

#[derive(Debug)]
pub struct Module {
    name: String,
    header: Header,
    instructions: Vec<Instruction>,
    tables: Tables,
}

impl Module {
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_WORDS * 4 || bytes.len() % 4 != 0 {
            return Err(Error::InvalidLength(bytes.len()));
        }

        let words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::from_words(name, words)
    }

    pub fn from_words(name: impl Into<String>, mut words: Vec<u32>) -> Result<Self> {
        let name = name.into();
        if words.len() < HEADER_WORDS {
            return Err(Error::InvalidLength(words.len() * 4));
        }

        if words[0] == MAGIC_NUMBER.swap_bytes() {
            for word in words.iter_mut() {
                *word = word.swap_bytes();
            }
        } else if words[0] != MAGIC_NUMBER {
            return Err(Error::IncorrectMagic(words[0]));
        }

        let version = words[1];
        let major = (version >> 16) & 0xFF;
        let minor = (version >> 8) & 0xFF;
        if version > SPIRV_VERSION {
            return Err(Error::UnsupportedVersion { major, minor });
        }

        let header = Header {
            major,
            minor,
            generator: words[2],
            bound: words[3],
        };
        let instructions = split_instructions(&words[HEADER_WORDS..])?;
        let tables = build_tables(&instructions)?;

        debug!(
            module = %name,
            version = %format!("{major}.{minor}"),
            instructions = instructions.len(),
            "parsed SPIR-V module"
        );

        Ok(Self {
            name,
            header,
            instructions,
            tables,
        })
    }

    /// Reads a compiled module. The module name is derived from the file
    /// name, e.g. `lit.vert.spv` becomes `LitVert`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(module_name_from_path(path), &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        self.instructions
            .iter()
            .filter(|ins| ins.opcode == op::ENTRY_POINT)
            .map(|ins| {
                let execution_model = ins.operand(0)?;
                let function = ins.operand(1)?;
                let (name, consumed) = decode_string(&ins.operands[2..]);
                Ok(EntryPoint {
                    name,
                    stage: ShaderStage::from_execution_model(execution_model),
                    execution_model,
                    function,
                    interface: ins.operands[2 + consumed..].to_vec(),
                })
            })
            .collect()
    }

    /// Stage of the first entry point with a graphics or compute model.
    pub fn stage(&self) -> Option<ShaderStage> {
        self.entry_points()
            .ok()?
            .into_iter()
            .find_map(|entry| entry.stage)
    }

    pub fn inputs(&self) -> Result<Vec<InterfaceVariable>> {
        self.interface_variables(storage_class::INPUT)
    }

    pub fn outputs(&self) -> Result<Vec<InterfaceVariable>> {
        self.interface_variables(storage_class::OUTPUT)
    }

    fn interface_variables(&self, storage: u32) -> Result<Vec<InterfaceVariable>> {
        let mut found = Vec::new();
        for variable in self
            .tables
            .variables
            .iter()
            .filter(|variable| variable.storage_class == storage)
        {
            if self.has_decoration(variable.id, decoration::BUILT_IN) {
                continue;
            }
            let Some(location) = self.decoration_literal(variable.id, decoration::LOCATION) else {
                continue;
            };
            let ty = self.resolve_type(variable.type_id)?.pointee().clone();
            found.push(InterfaceVariable {
                location,
                name: self.name_of(variable.id).unwrap_or_default().to_string(),
                ty,
            });
        }
        found.sort_by_key(|variable| variable.location);
        Ok(found)
    }

    /// Every resource variable bound through a descriptor set, ordered by
    /// `(set, binding)`.
    pub fn descriptor_bindings(&self) -> Result<Vec<DescriptorBinding>> {
        let mut bindings = Vec::new();
        for variable in &self.tables.variables {
            if !matches!(
                variable.storage_class,
                storage_class::UNIFORM | storage_class::UNIFORM_CONSTANT | storage_class::STORAGE_BUFFER
            ) {
                continue;
            }

            let set = self
                .decoration_literal(variable.id, decoration::DESCRIPTOR_SET)
                .ok_or(Error::MissingDecoration {
                    id: variable.id,
                    decoration: "DescriptorSet",
                })?;
            let binding = self
                .decoration_literal(variable.id, decoration::BINDING)
                .ok_or(Error::MissingDecoration {
                    id: variable.id,
                    decoration: "Binding",
                })?;

            let resource = self.resolve_type(variable.type_id)?.pointee().clone();
            let buffer_block =
                self.has_decoration(self.base_type_id(variable.type_id), decoration::BUFFER_BLOCK);
            let kind = DescriptorKind::infer(&resource, variable.storage_class, buffer_block)
                .ok_or(Error::UnsupportedDescriptor(variable.id))?;
            let name = self
                .name_of(variable.id)
                .map(str::to_string)
                .or_else(|| resource.struct_name().map(str::to_string))
                .unwrap_or_default();

            bindings.push(DescriptorBinding {
                set,
                binding,
                name,
                kind,
                count: resource
                    .descriptor_count()
                    .ok_or(Error::DescriptorCountOverflow(variable.id))?,
                storage_class: variable.storage_class,
                ty: resource,
            });
        }
        bindings.sort_by_key(|binding| (binding.set, binding.binding));
        Ok(bindings)
    }

    /// All struct types declared by the module, in declaration order.
    pub fn struct_types(&self) -> Result<Vec<TypeInfo>> {
        let mut ids: Vec<(usize, u32)> = self
            .tables
            .type_defs
            .iter()
            .filter(|(_, index)| self.instructions[**index].opcode == op::TYPE_STRUCT)
            .map(|(id, index)| (*index, *id))
            .collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|(_, id)| self.resolve_type(id))
            .collect()
    }

    pub fn resolve_type(&self, id: u32) -> Result<TypeInfo> {
        self.resolve_type_at(id, 0)
    }

    fn resolve_type_at(&self, id: u32, depth: usize) -> Result<TypeInfo> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::TypeNestingTooDeep(id));
        }
        let index = *self.tables.type_defs.get(&id).ok_or(Error::UnknownType(id))?;
        let ins = &self.instructions[index];
        let next = depth + 1;
        let nested = |operand: usize| -> Result<Box<TypeInfo>> {
            Ok(Box::new(self.resolve_type_at(ins.operand(operand)?, next)?))
        };

        let ty = match ins.opcode {
            op::TYPE_VOID => TypeInfo::Void,
            op::TYPE_BOOL => TypeInfo::Bool,
            op::TYPE_INT => TypeInfo::Int {
                width: ins.operand(1)?,
                signed: ins.operand(2)? == 1,
            },
            op::TYPE_FLOAT => TypeInfo::Float {
                width: ins.operand(1)?,
            },
            op::TYPE_VECTOR => TypeInfo::Vector {
                component: nested(1)?,
                count: ins.operand(2)?,
            },
            op::TYPE_MATRIX => TypeInfo::Matrix {
                column: nested(1)?,
                columns: ins.operand(2)?,
            },
            op::TYPE_IMAGE => TypeInfo::Image {
                sampled_type: nested(1)?,
                dim: ins.operand(2)?,
                depth: ins.operand(3)?,
                arrayed: ins.operand(4)? == 1,
                multisampled: ins.operand(5)? == 1,
                sampled: ins.operand(6)?,
                format: ins.operand(7)?,
            },
            op::TYPE_SAMPLER => TypeInfo::Sampler,
            op::TYPE_SAMPLED_IMAGE => TypeInfo::SampledImage { image: nested(1)? },
            op::TYPE_ARRAY => {
                let length_id = ins.operand(2)?;
                let length = self
                    .tables
                    .constants
                    .get(&length_id)
                    .copied()
                    .ok_or(Error::UnknownConstant(length_id))?;
                let length = u32::try_from(length)
                    .map_err(|_| Error::ArrayLengthOverflow { id, length })?;
                TypeInfo::Array {
                    element: nested(1)?,
                    length,
                    stride: self.decoration_literal(id, decoration::ARRAY_STRIDE),
                }
            }
            op::TYPE_RUNTIME_ARRAY => TypeInfo::RuntimeArray {
                element: nested(1)?,
                stride: self.decoration_literal(id, decoration::ARRAY_STRIDE),
            },
            op::TYPE_STRUCT => {
                let name = self
                    .name_of(id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("_struct_{id}"));
                let members = ins.operands[1..]
                    .iter()
                    .enumerate()
                    .map(|(index, member_type)| {
                        let index = index as u32;
                        Ok(StructMember {
                            name: self
                                .tables
                                .member_names
                                .get(&(id, index))
                                .cloned()
                                .unwrap_or_else(|| format!("member{index}")),
                            offset: self.member_decoration_literal(id, index, decoration::OFFSET),
                            matrix_stride: self.member_decoration_literal(
                                id,
                                index,
                                decoration::MATRIX_STRIDE,
                            ),
                            ty: self.resolve_type_at(*member_type, next)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                TypeInfo::Struct { name, members }
            }
            op::TYPE_POINTER => TypeInfo::Pointer {
                storage_class: ins.operand(1)?,
                pointee: nested(2)?,
            },
            _ => return Err(Error::UnknownType(id)),
        };
        Ok(ty)
    }

    /// Follows pointer and array indirections to the innermost type id.
    fn base_type_id(&self, mut id: u32) -> u32 {
        for _ in 0..MAX_TYPE_DEPTH {
            let Some(&index) = self.tables.type_defs.get(&id) else {
                break;
            };
            let ins = &self.instructions[index];
            let next = match ins.opcode {
                op::TYPE_POINTER => ins.operands.get(2),
                op::TYPE_ARRAY | op::TYPE_RUNTIME_ARRAY => ins.operands.get(1),
                _ => None,
            };
            match next {
                Some(&inner) => id = inner,
                None => break,
            }
        }
        id
    }

    fn name_of(&self, id: u32) -> Option<&str> {
        self.tables
            .names
            .get(&id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    fn has_decoration(&self, id: u32, kind: u32) -> bool {
        self.tables
            .decorations
            .get(&id)
            .is_some_and(|list| list.iter().any(|(decoration, _)| *decoration == kind))
    }

    fn decoration_literal(&self, id: u32, kind: u32) -> Option<u32> {
        first_literal(self.tables.decorations.get(&id)?, kind)
    }

    fn member_decoration_literal(&self, ty: u32, member: u32, kind: u32) -> Option<u32> {
        first_literal(self.tables.member_decorations.get(&(ty, member))?, kind)
    }
}

fn first_literal(list: &Decorations, kind: u32) -> Option<u32> {
    list.iter()
        .find(|(decoration, _)| *decoration == kind)
        .and_then(|(_, literals)| literals.first().copied())
}

fn split_instructions(words: &[u32]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut cursor = 0;
    while cursor < words.len() {
        let first = words[cursor];
        let word_count = (first >> 16) as usize;
        let opcode = first & 0xFFFF;
        if word_count == 0 {
            return Err(Error::ZeroWordCount {
                offset: HEADER_WORDS + cursor,
            });
        }
        let end = cursor + word_count;
        if end > words.len() {
            return Err(Error::TruncatedInstruction {
                offset: HEADER_WORDS + cursor,
                word_count,
            });
        }
        instructions.push(Instruction {
            opcode,
            operands: words[cursor + 1..end].into(),
        });
        cursor = end;
    }
    Ok(instructions)
}

fn build_tables(instructions: &[Instruction]) -> Result<Tables> {
    let mut tables = Tables::default();
    for (index, ins) in instructions.iter().enumerate() {
        match ins.opcode {
            op::NAME => {
                let target = ins.operand(0)?;
                tables
                    .names
                    .insert(target, decode_string(&ins.operands[1..]).0);
            }
            op::MEMBER_NAME => {
                let ty = ins.operand(0)?;
                let member = ins.operand(1)?;
                tables
                    .member_names
                    .insert((ty, member), decode_string(&ins.operands[2..]).0);
            }
            op::DECORATE => {
                let target = ins.operand(0)?;
                let kind = ins.operand(1)?;
                tables
                    .decorations
                    .entry(target)
                    .or_default()
                    .push((kind, ins.operands[2..].into()));
            }
            op::MEMBER_DECORATE => {
                let ty = ins.operand(0)?;
                let member = ins.operand(1)?;
                let kind = ins.operand(2)?;
                tables
                    .member_decorations
                    .entry((ty, member))
                    .or_default()
                    .push((kind, ins.operands[3..].into()));
            }
            op::TYPE_VOID..=op::TYPE_FUNCTION => {
                tables.type_defs.insert(ins.operand(0)?, index);
            }
            op::CONSTANT => {
                let low = u64::from(ins.operand(2)?);
                let high = u64::from(ins.operands.get(3).copied().unwrap_or(0));
                tables.constants.insert(ins.operand(1)?, low | (high << 32));
            }
            op::VARIABLE => tables.variables.push(Variable {
                type_id: ins.operand(0)?,
                id: ins.operand(1)?,
                storage_class: ins.operand(2)?,
            }),
            _ => {}
        }
    }
    Ok(tables)
}

/// Decodes a literal string, returning it with the number of words consumed.
fn decode_string(words: &[u32]) -> (String, usize) {
    let mut bytes = Vec::new();
    for (index, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                return (String::from_utf8_lossy(&bytes).into_owned(), index + 1);
            }
            bytes.push(byte);
        }
    }
    (String::from_utf8_lossy(&bytes).into_owned(), words.len())
}

fn module_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    file_name
        .split('.')
        .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case("spv"))
        .map(|part| {
            let lower = part.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Assembler;
    use crate::consts::{dim, execution_model};

    struct VertexFixture {
        bytes: Vec<u8>,
    }

    /// Mirrors what glslc emits for a small vertex shader: a camera block at
    /// (0, 0), a sampler at (1, 1), a sampler array at (2, 0), two inputs, one
    /// output and the built-in `gl_PerVertex` block.
    fn vertex_fixture() -> VertexFixture {
        let mut asm = Assembler::new();
        let main = asm.id();
        let void = asm.type_void();
        let fn_ty = asm.type_function(void);
        let float = asm.type_float(32);
        let uint = asm.type_int(32, false);
        let vec2 = asm.type_vector(float, 2);
        let vec3 = asm.type_vector(float, 3);
        let vec4 = asm.type_vector(float, 4);
        let mat4 = asm.type_matrix(vec4, 4);

        let camera_ty = asm.type_struct(&[mat4, mat4]);
        let camera_ptr = asm.type_pointer(storage_class::UNIFORM, camera_ty);
        let camera = asm.variable(camera_ptr, storage_class::UNIFORM);

        let image = asm.type_image(float, dim::DIM_2D, 1);
        let sampled = asm.type_sampled_image(image);
        let sampled_ptr = asm.type_pointer(storage_class::UNIFORM_CONSTANT, sampled);
        let tex = asm.variable(sampled_ptr, storage_class::UNIFORM_CONSTANT);

        let four = asm.constant(uint, 4);
        let sampler_array = asm.type_array(sampled, four);
        let array_ptr = asm.type_pointer(storage_class::UNIFORM_CONSTANT, sampler_array);
        let layers = asm.variable(array_ptr, storage_class::UNIFORM_CONSTANT);

        let vec3_in = asm.type_pointer(storage_class::INPUT, vec3);
        let vec2_in = asm.type_pointer(storage_class::INPUT, vec2);
        let vec2_out = asm.type_pointer(storage_class::OUTPUT, vec2);
        let uv_in = asm.variable(vec2_in, storage_class::INPUT);
        let position = asm.variable(vec3_in, storage_class::INPUT);
        let uv_out = asm.variable(vec2_out, storage_class::OUTPUT);

        let per_vertex = asm.type_struct(&[vec4, float]);
        let per_vertex_ptr = asm.type_pointer(storage_class::OUTPUT, per_vertex);
        let per_vertex_var = asm.variable(per_vertex_ptr, storage_class::OUTPUT);

        // Debug and annotation instructions are position independent for the
        // parser, so they are appended after the types for brevity.
        asm.entry_point(
            execution_model::VERTEX,
            main,
            "main",
            &[position, uv_in, uv_out, per_vertex_var],
        );
        asm.name(camera_ty, "CameraUbo");
        asm.member_name(camera_ty, 0, "view");
        asm.member_name(camera_ty, 1, "proj");
        asm.name(camera, "camera");
        asm.name(tex, "tex");
        asm.name(layers, "layers");
        asm.name(position, "in_position");
        asm.name(uv_in, "in_uv");
        asm.name(uv_out, "out_uv");
        asm.name(per_vertex, "gl_PerVertex");

        asm.decorate(camera_ty, decoration::BLOCK, &[]);
        asm.member_decorate(camera_ty, 0, decoration::OFFSET, &[0]);
        asm.member_decorate(camera_ty, 0, decoration::MATRIX_STRIDE, &[16]);
        asm.member_decorate(camera_ty, 1, decoration::OFFSET, &[64]);
        asm.member_decorate(camera_ty, 1, decoration::MATRIX_STRIDE, &[16]);
        asm.decorate(camera, decoration::DESCRIPTOR_SET, &[0]);
        asm.decorate(camera, decoration::BINDING, &[0]);
        asm.decorate(tex, decoration::DESCRIPTOR_SET, &[1]);
        asm.decorate(tex, decoration::BINDING, &[1]);
        asm.decorate(layers, decoration::DESCRIPTOR_SET, &[2]);
        asm.decorate(layers, decoration::BINDING, &[0]);
        asm.decorate(position, decoration::LOCATION, &[0]);
        asm.decorate(uv_in, decoration::LOCATION, &[1]);
        asm.decorate(uv_out, decoration::LOCATION, &[0]);
        asm.decorate(per_vertex, decoration::BLOCK, &[]);
        asm.member_decorate(per_vertex, 0, decoration::BUILT_IN, &[0]);
        asm.member_decorate(per_vertex, 1, decoration::BUILT_IN, &[1]);

        asm.empty_function(main, void, fn_ty);
        VertexFixture {
            bytes: asm.finish(),
        }
    }

    fn load() -> Module {
        Module::from_bytes("Fixture", &vertex_fixture().bytes).expect("fixture parses")
    }

    #[test]
    fn rejects_short_and_unaligned_streams() {
        assert!(matches!(
            Module::from_bytes("x", &[0; 12]),
            Err(Error::InvalidLength(12))
        ));
        assert!(matches!(
            Module::from_bytes("x", &[0; 22]),
            Err(Error::InvalidLength(22))
        ));
    }

    #[test]
    fn rejects_wrong_magic_and_newer_versions() {
        let mut words = vec![0xDEAD_BEEF, 0x0001_0000, 0, 1, 0];
        assert!(matches!(
            Module::from_words("x", words.clone()),
            Err(Error::IncorrectMagic(0xDEAD_BEEF))
        ));

        words[0] = MAGIC_NUMBER;
        words[1] = 0x0001_0700;
        assert!(matches!(
            Module::from_words("x", words),
            Err(Error::UnsupportedVersion { major: 1, minor: 7 })
        ));
    }

    #[test]
    fn rejects_zero_and_truncated_instructions() {
        let header = [MAGIC_NUMBER, 0x0001_0000, 0, 1, 0];

        let mut zero = header.to_vec();
        zero.push(0);
        assert!(matches!(
            Module::from_words("x", zero),
            Err(Error::ZeroWordCount { offset: 5 })
        ));

        let mut truncated = header.to_vec();
        truncated.push((4 << 16) | op::TYPE_INT);
        truncated.push(1);
        assert!(matches!(
            Module::from_words("x", truncated),
            Err(Error::TruncatedInstruction {
                offset: 5,
                word_count: 4
            })
        ));
    }

    #[test]
    fn accepts_byte_swapped_streams() {
        let swapped: Vec<u32> = Assembler::new()
            .words()
            .into_iter()
            .map(u32::swap_bytes)
            .collect();
        let module = Module::from_words("Swapped", swapped).expect("swapped stream parses");
        assert_eq!(module.header().major, 1);
        assert_eq!(module.header().minor, 0);
    }

    #[test]
    fn reports_entry_point_and_stage() {
        let module = load();
        let entries = module.entry_points().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "main");
        assert_eq!(entries[0].interface.len(), 4);
        assert_eq!(module.stage(), Some(ShaderStage::Vertex));
    }

    #[test]
    fn lists_inputs_by_location_without_builtins() {
        let module = load();
        let inputs = module.inputs().unwrap();
        let names: Vec<_> = inputs.iter().map(|input| input.name.as_str()).collect();
        assert_eq!(names, ["in_position", "in_uv"]);
        assert_eq!(inputs[0].ty.component_count(), Some(3));
        assert_eq!(inputs[1].location, 1);

        let outputs = module.outputs().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "out_uv");
    }

    #[test]
    fn reflects_descriptor_bindings() {
        let module = load();
        let bindings = module.descriptor_bindings().unwrap();
        let summary: Vec<_> = bindings
            .iter()
            .map(|binding| (binding.set, binding.binding, binding.kind, binding.count))
            .collect();
        assert_eq!(
            summary,
            [
                (0, 0, DescriptorKind::UniformBuffer, 1),
                (1, 1, DescriptorKind::CombinedImageSampler, 1),
                (2, 0, DescriptorKind::CombinedImageSampler, 4),
            ]
        );
        assert_eq!(bindings[0].name, "camera");
        assert_eq!(bindings[0].ty.struct_name(), Some("CameraUbo"));
        assert_eq!(bindings[0].ty.size(), Some(128));
    }

    #[test]
    fn resolves_struct_members_with_offsets() {
        let module = load();
        let structs = module.struct_types().unwrap();
        let TypeInfo::Struct { name, members } = &structs[0] else {
            panic!("expected struct, got {:?}", structs[0]);
        };
        assert_eq!(name, "CameraUbo");
        assert_eq!(members[1].name, "proj");
        assert_eq!(members[1].offset, Some(64));
        assert_eq!(members[1].matrix_stride, Some(16));
        assert_eq!(members[1].ty.glsl_name(), "mat4");

        let TypeInfo::Struct { members, .. } = &structs[1] else {
            panic!("expected gl_PerVertex struct");
        };
        assert!(members.iter().all(|member| member.offset.is_none()));
    }

    #[test]
    fn missing_binding_decoration_is_an_error() {
        let mut asm = Assembler::new();
        let float = asm.type_float(32);
        let block = asm.type_struct(&[float]);
        let ptr = asm.type_pointer(storage_class::UNIFORM, block);
        let var = asm.variable(ptr, storage_class::UNIFORM);
        asm.decorate(var, decoration::DESCRIPTOR_SET, &[0]);
        asm.member_decorate(block, 0, decoration::OFFSET, &[0]);

        let module = Module::from_bytes("Broken", &asm.finish()).unwrap();
        assert!(matches!(
            module.descriptor_bindings(),
            Err(Error::MissingDecoration {
                decoration: "Binding",
                ..
            })
        ));
    }

    #[test]
    fn oversized_block_reflects_without_a_size() {
        let mut asm = Assembler::new();
        let uint = asm.type_int(32, false);
        let length = asm.constant(uint, 70_000);
        let data = asm.type_array(uint, length);
        let block = asm.type_struct(&[data]);
        let ptr = asm.type_pointer(storage_class::UNIFORM, block);
        let var = asm.variable(ptr, storage_class::UNIFORM);
        asm.decorate(data, decoration::ARRAY_STRIDE, &[70_000]);
        asm.decorate(block, decoration::BLOCK, &[]);
        asm.member_decorate(block, 0, decoration::OFFSET, &[0]);
        asm.decorate(var, decoration::DESCRIPTOR_SET, &[0]);
        asm.decorate(var, decoration::BINDING, &[0]);

        let module = Module::from_bytes("Huge", &asm.finish()).unwrap();
        let bindings = module.descriptor_bindings().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].count, 1);
        assert_eq!(bindings[0].ty.size(), None);
    }

    #[test]
    fn array_length_beyond_u32_is_an_error() {
        let mut asm = Assembler::new();
        let float = asm.type_float(32);
        let ulong = asm.type_int(64, false);
        let length = asm.id();
        asm.instruction(op::CONSTANT, &[ulong, length, 0, 1]);
        let data = asm.type_array(float, length);
        let block = asm.type_struct(&[data]);
        let ptr = asm.type_pointer(storage_class::UNIFORM, block);
        let var = asm.variable(ptr, storage_class::UNIFORM);
        asm.member_decorate(block, 0, decoration::OFFSET, &[0]);
        asm.decorate(var, decoration::DESCRIPTOR_SET, &[0]);
        asm.decorate(var, decoration::BINDING, &[0]);

        let module = Module::from_bytes("Long", &asm.finish()).unwrap();
        assert!(matches!(
            module.descriptor_bindings(),
            Err(Error::ArrayLengthOverflow {
                length: 0x1_0000_0000,
                ..
            })
        ));
    }

    #[test]
    fn reads_modules_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lit.vert.spv");
        fs::write(&path, vertex_fixture().bytes).unwrap();

        let module = Module::from_file(&path).unwrap();
        assert_eq!(module.name(), "LitVert");

        let missing = Module::from_file(&dir.path().join("missing.spv")).unwrap_err();
        assert!(matches!(missing, Error::Io { .. }));
    }
}
