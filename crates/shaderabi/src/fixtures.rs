//! SPIR-V modules that follow the engine ABI, assembled without a compiler.
//!
//! [`StageFixture::for_variant`] yields the interface `glslc` reflects for the
//! bundled sources; tests mutate the description to produce broken modules.

use spvreflect::consts::{decoration, dim, storage_class};
use spvreflect::{Assembler, ShaderStage};

use crate::layout::{ShaderVariant, SET_FRAME, SET_GLOBAL, SET_OBJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureType {
    Float,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureMember {
    pub name: String,
    pub ty: FixtureType,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureResource {
    UniformBlock {
        type_name: String,
        members: Vec<FixtureMember>,
    },
    /// `sampler2D`, or an array of them when `count > 1`.
    Sampler2d { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureBinding {
    pub set: u32,
    pub binding: u32,
    pub name: String,
    pub resource: FixtureResource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureVariable {
    pub location: u32,
    pub name: String,
    pub ty: FixtureType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFixture {
    pub stage: ShaderStage,
    pub bindings: Vec<FixtureBinding>,
    pub inputs: Vec<FixtureVariable>,
    pub outputs: Vec<FixtureVariable>,
}

fn member(name: &str, ty: FixtureType, offset: u32) -> FixtureMember {
    FixtureMember {
        name: name.to_string(),
        ty,
        offset,
    }
}

fn var(location: u32, name: &str, ty: FixtureType) -> FixtureVariable {
    FixtureVariable {
        location,
        name: name.to_string(),
        ty,
    }
}

fn block(set: u32, binding: u32, name: &str, type_name: &str, members: Vec<FixtureMember>) -> FixtureBinding {
    FixtureBinding {
        set,
        binding,
        name: name.to_string(),
        resource: FixtureResource::UniformBlock {
            type_name: type_name.to_string(),
            members,
        },
    }
}

fn sampler(set: u32, binding: u32) -> FixtureBinding {
    FixtureBinding {
        set,
        binding,
        name: "tex".to_string(),
        resource: FixtureResource::Sampler2d { count: 1 },
    }
}

fn camera_block() -> FixtureBinding {
    block(
        SET_FRAME,
        0,
        "camera",
        "CameraUbo",
        vec![member("view", FixtureType::Mat4, 0), member("proj", FixtureType::Mat4, 64)],
    )
}

fn mesh_block() -> FixtureBinding {
    block(
        SET_OBJECT,
        0,
        "mesh",
        "MeshUbo",
        vec![
            member("model", FixtureType::Mat4, 0),
            member("color", FixtureType::Vec4, 64),
            member("flags", FixtureType::Uint, 80),
        ],
    )
}

fn light_block() -> FixtureBinding {
    block(
        SET_GLOBAL,
        0,
        "light",
        "GlobalLightUbo",
        vec![
            member("direction", FixtureType::Vec3, 0),
            member("color", FixtureType::Vec3, 16),
            member("ambient", FixtureType::Float, 28),
        ],
    )
}

impl StageFixture {
    /// The interface of the bundled `<variant>.vert` or `<variant>.frag`.
    pub fn for_variant(variant: ShaderVariant, stage: ShaderStage) -> Self {
        use FixtureType::{Vec2, Vec3, Vec4};

        let (bindings, inputs, outputs) = match (variant, stage) {
            (ShaderVariant::Lit, ShaderStage::Vertex) => (
                vec![camera_block(), mesh_block()],
                vec![var(0, "in_position", Vec3), var(1, "in_uv", Vec2), var(2, "in_normal", Vec3)],
                vec![var(0, "out_uv", Vec2), var(1, "out_normal", Vec3)],
            ),
            (ShaderVariant::Lit, _) => (
                vec![mesh_block(), sampler(SET_OBJECT, 1), light_block()],
                vec![var(0, "in_uv", Vec2), var(1, "in_normal", Vec3)],
                vec![var(0, "out_color", Vec4)],
            ),
            (ShaderVariant::Flat | ShaderVariant::Textured, ShaderStage::Vertex) => (
                vec![camera_block(), mesh_block()],
                vec![var(0, "in_position", Vec3), var(1, "in_uv", Vec2)],
                vec![var(0, "out_uv", Vec2)],
            ),
            (ShaderVariant::Flat, _) => (
                vec![mesh_block(), sampler(SET_OBJECT, 1)],
                vec![var(0, "in_uv", Vec2)],
                vec![var(0, "out_color", Vec4)],
            ),
            (ShaderVariant::Textured, _) => (
                vec![sampler(SET_GLOBAL, 0)],
                vec![var(0, "in_uv", Vec2)],
                vec![var(0, "out_color", Vec4)],
            ),
        };
        Self {
            stage,
            bindings,
            inputs,
            outputs,
        }
    }

    pub fn binding_mut(&mut self, set: u32, binding: u32) -> Option<&mut FixtureBinding> {
        self.bindings
            .iter_mut()
            .find(|b| b.set == set && b.binding == binding)
    }

    pub fn assemble(&self) -> Vec<u8> {
        let mut asm = Assembler::new();
        let void = asm.type_void();
        let fn_type = asm.type_function(void);
        let float = asm.type_float(32);
        let uint = asm.type_int(32, false);
        let vec2 = asm.type_vector(float, 2);
        let vec3 = asm.type_vector(float, 3);
        let vec4 = asm.type_vector(float, 4);
        let mat4 = asm.type_matrix(vec4, 4);
        let type_id = |ty: FixtureType| match ty {
            FixtureType::Float => float,
            FixtureType::Uint => uint,
            FixtureType::Vec2 => vec2,
            FixtureType::Vec3 => vec3,
            FixtureType::Vec4 => vec4,
            FixtureType::Mat4 => mat4,
        };

        let mut interface = Vec::new();
        for (storage, vars) in [
            (storage_class::INPUT, &self.inputs),
            (storage_class::OUTPUT, &self.outputs),
        ] {
            for v in vars {
                let ptr = asm.type_pointer(storage, type_id(v.ty));
                let id = asm.variable(ptr, storage);
                asm.name(id, &v.name);
                asm.decorate(id, decoration::LOCATION, &[v.location]);
                interface.push(id);
            }
        }

        for binding in &self.bindings {
            let (pointee, storage) = match &binding.resource {
                FixtureResource::UniformBlock { type_name, members } => {
                    let ids: Vec<u32> = members.iter().map(|m| type_id(m.ty)).collect();
                    let st = asm.type_struct(&ids);
                    asm.name(st, type_name);
                    asm.decorate(st, decoration::BLOCK, &[]);
                    for (index, m) in members.iter().enumerate() {
                        let index = index as u32;
                        asm.member_name(st, index, &m.name);
                        asm.member_decorate(st, index, decoration::OFFSET, &[m.offset]);
                        if m.ty == FixtureType::Mat4 {
                            asm.member_decorate(st, index, decoration::MATRIX_STRIDE, &[16]);
                        }
                    }
                    (st, storage_class::UNIFORM)
                }
                FixtureResource::Sampler2d { count } => {
                    let image = asm.type_image(float, dim::DIM_2D, 1);
                    let sampled = asm.type_sampled_image(image);
                    let pointee = if *count > 1 {
                        let length = asm.constant(uint, *count);
                        asm.type_array(sampled, length)
                    } else {
                        sampled
                    };
                    (pointee, storage_class::UNIFORM_CONSTANT)
                }
            };
            let ptr = asm.type_pointer(storage, pointee);
            let id = asm.variable(ptr, storage);
            asm.name(id, &binding.name);
            asm.decorate(id, decoration::DESCRIPTOR_SET, &[binding.set]);
            asm.decorate(id, decoration::BINDING, &[binding.binding]);
        }

        let main = asm.id();
        asm.entry_point(self.stage.execution_model(), main, "main", &interface);
        asm.empty_function(main, void, fn_type);
        asm.finish()
    }
}

/// Vertex and fragment module bytes for `variant`.
pub fn variant_modules(variant: ShaderVariant) -> (Vec<u8>, Vec<u8>) {
    (
        StageFixture::for_variant(variant, ShaderStage::Vertex).assemble(),
        StageFixture::for_variant(variant, ShaderStage::Fragment).assemble(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvreflect::{DescriptorKind, Module};

    #[test]
    fn lit_fragment_reflects_three_bindings() {
        let bytes = StageFixture::for_variant(ShaderVariant::Lit, ShaderStage::Fragment).assemble();
        let module = Module::from_bytes("LitFrag", &bytes).unwrap();
        assert_eq!(module.stage(), Some(ShaderStage::Fragment));

        let bindings = module.descriptor_bindings().unwrap();
        let keys: Vec<(u32, u32, DescriptorKind)> =
            bindings.iter().map(|b| (b.set, b.binding, b.kind)).collect();
        assert_eq!(
            keys,
            vec![
                (1, 0, DescriptorKind::UniformBuffer),
                (1, 1, DescriptorKind::CombinedImageSampler),
                (2, 0, DescriptorKind::UniformBuffer),
            ]
        );
        assert_eq!(bindings[2].ty.size(), Some(32));
    }

    #[test]
    fn sampler_arrays_report_count() {
        let mut fixture = StageFixture::for_variant(ShaderVariant::Textured, ShaderStage::Fragment);
        if let Some(binding) = fixture.binding_mut(2, 0) {
            binding.resource = FixtureResource::Sampler2d { count: 4 };
        }
        let module = Module::from_bytes("TexturedFrag", &fixture.assemble()).unwrap();
        assert_eq!(module.descriptor_bindings().unwrap()[0].count, 4);
    }
}
