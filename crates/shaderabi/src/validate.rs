use std::fmt;

use serde::Serialize;
use spvreflect::{DescriptorBinding, DescriptorKind, InterfaceVariable, Module, ShaderStage, TypeInfo};
use tracing::debug;

use crate::glsl::{scan_layouts, LayoutDecl, Storage};
use crate::layout::{BindingDesc, PipelineLayoutDesc, ShaderVariant, StageFlags};
use crate::uniforms::BlockLayout;

/// A single disagreement between shader code and the engine ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum LayoutIssue {
    WrongStage {
        module: String,
        expected: ShaderStage,
        found: Option<ShaderStage>,
    },
    Reflection {
        module: String,
        message: String,
    },
    Conflict {
        message: String,
    },
    MissingBinding {
        set: u32,
        binding: u32,
        name: String,
        kind: DescriptorKind,
    },
    UnexpectedBinding {
        set: u32,
        binding: u32,
        name: String,
        kind: DescriptorKind,
    },
    KindMismatch {
        set: u32,
        binding: u32,
        expected: DescriptorKind,
        found: DescriptorKind,
    },
    CountMismatch {
        set: u32,
        binding: u32,
        expected: u32,
        found: u32,
    },
    MissingStage {
        set: u32,
        binding: u32,
        stages: StageFlags,
    },
    UnexpectedStage {
        set: u32,
        binding: u32,
        stages: StageFlags,
    },
    MissingVertexInput {
        location: u32,
        name: &'static str,
    },
    VertexInputFormat {
        location: u32,
        expected: u32,
        found: Option<u32>,
    },
    UnexpectedVertexInput {
        location: u32,
        name: String,
    },
    UnfedFragmentInput {
        location: u32,
        name: String,
    },
    InterfaceMismatch {
        location: u32,
        vertex: String,
        fragment: String,
    },
    BlockMemberCount {
        block: &'static str,
        expected: usize,
        found: usize,
    },
    BlockOffset {
        block: &'static str,
        member: &'static str,
        expected: u32,
        found: Option<u32>,
    },
    BlockSize {
        block: &'static str,
        host: u32,
        shader: u32,
    },
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutIssue::WrongStage { module, expected, found } => match found {
                Some(found) => write!(f, "{module}: expected a {expected} module, found {found}"),
                None => write!(f, "{module}: expected a {expected} module, found no entry point"),
            },
            LayoutIssue::Reflection { module, message } => write!(f, "{module}: {message}"),
            LayoutIssue::Conflict { message } => f.write_str(message),
            LayoutIssue::MissingBinding { set, binding, name, kind } => {
                write!(f, "set {set} binding {binding}: missing {kind} `{name}`")
            }
            LayoutIssue::UnexpectedBinding { set, binding, name, kind } => {
                write!(f, "set {set} binding {binding}: unexpected {kind} `{name}`")
            }
            LayoutIssue::KindMismatch { set, binding, expected, found } => {
                write!(f, "set {set} binding {binding}: expected {expected}, found {found}")
            }
            LayoutIssue::CountMismatch { set, binding, expected, found } => write!(
                f,
                "set {set} binding {binding}: expected {expected} descriptor(s), found {found}"
            ),
            LayoutIssue::MissingStage { set, binding, stages } => {
                write!(f, "set {set} binding {binding}: not used by {stages} stage")
            }
            LayoutIssue::UnexpectedStage { set, binding, stages } => {
                write!(f, "set {set} binding {binding}: unexpectedly used by {stages} stage")
            }
            LayoutIssue::MissingVertexInput { location, name } => {
                write!(f, "vertex input {location} (`{name}`) is not declared")
            }
            LayoutIssue::VertexInputFormat { location, expected, found } => match found {
                Some(found) => write!(
                    f,
                    "vertex input {location}: expected {expected} components, found {found}"
                ),
                None => write!(
                    f,
                    "vertex input {location}: expected {expected} components, found a non-vector type"
                ),
            },
            LayoutIssue::UnexpectedVertexInput { location, name } => {
                write!(f, "vertex input {location} (`{name}`) is not part of the vertex layout")
            }
            LayoutIssue::UnfedFragmentInput { location, name } => write!(
                f,
                "fragment input {location} (`{name}`) has no matching vertex output"
            ),
            LayoutIssue::InterfaceMismatch { location, vertex, fragment } => write!(
                f,
                "location {location}: vertex writes {vertex}, fragment reads {fragment}"
            ),
            LayoutIssue::BlockMemberCount { block, expected, found } => {
                write!(f, "{block}: expected {expected} members, found {found}")
            }
            LayoutIssue::BlockOffset { block, member, expected, found } => match found {
                Some(found) => write!(
                    f,
                    "{block}.{member}: host offset {expected}, shader offset {found}"
                ),
                None => write!(f, "{block}.{member}: host offset {expected}, shader has no offset"),
            },
            LayoutIssue::BlockSize { block, host, shader } => {
                write!(f, "{block}: host struct is {host} bytes, shader block is {shader} bytes")
            }
        }
    }
}

/// Compares a compiled vertex/fragment pair against the fixed layout of
/// `variant`. An empty result means the pair can be bound as-is.
pub fn validate_pipeline(variant: ShaderVariant, vertex: &Module, fragment: &Module) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();
    check_stage(vertex, ShaderStage::Vertex, &mut issues);
    check_stage(fragment, ShaderStage::Fragment, &mut issues);

    let vertex_bindings = reflect(vertex, Module::descriptor_bindings, &mut issues);
    let fragment_bindings = reflect(fragment, Module::descriptor_bindings, &mut issues);
    if let (Some(vb), Some(fb)) = (&vertex_bindings, &fragment_bindings) {
        let expected = variant.expected_layout();
        match PipelineLayoutDesc::from_stages([
            (ShaderStage::Vertex, vb.as_slice()),
            (ShaderStage::Fragment, fb.as_slice()),
        ]) {
            Ok(reflected) => compare_layouts(&expected, &reflected, &mut issues),
            Err(err) => issues.push(LayoutIssue::Conflict {
                message: err.to_string(),
            }),
        }
        let both: Vec<&DescriptorBinding> = vb.iter().chain(fb.iter()).collect();
        compare_blocks(&expected, &both, &mut issues);
    }

    if let Some(inputs) = reflect(vertex, Module::inputs, &mut issues) {
        compare_vertex_inputs(variant, &inputs, &mut issues);
    }
    let outputs = reflect(vertex, Module::outputs, &mut issues);
    let fragment_inputs = reflect(fragment, Module::inputs, &mut issues);
    if let (Some(outputs), Some(inputs)) = (outputs, fragment_inputs) {
        compare_interface(&outputs, &inputs, &mut issues);
    }

    debug!(%variant, issues = issues.len(), "validated pipeline");
    issues
}

fn check_stage(module: &Module, expected: ShaderStage, issues: &mut Vec<LayoutIssue>) {
    let found = module.stage();
    if found != Some(expected) {
        issues.push(LayoutIssue::WrongStage {
            module: module.name().to_string(),
            expected,
            found,
        });
    }
}

fn reflect<T>(
    module: &Module,
    query: impl Fn(&Module) -> spvreflect::Result<T>,
    issues: &mut Vec<LayoutIssue>,
) -> Option<T> {
    match query(module) {
        Ok(value) => Some(value),
        Err(err) => {
            issues.push(LayoutIssue::Reflection {
                module: module.name().to_string(),
                message: err.to_string(),
            });
            None
        }
    }
}

fn compare_layouts(expected: &PipelineLayoutDesc, reflected: &PipelineLayoutDesc, issues: &mut Vec<LayoutIssue>) {
    for want in expected.bindings() {
        let Some(got) = reflected.get(want.set, want.binding) else {
            issues.push(LayoutIssue::MissingBinding {
                set: want.set,
                binding: want.binding,
                name: want.name.clone(),
                kind: want.kind,
            });
            continue;
        };
        compare_binding(want, got, issues);
    }
    for got in reflected.bindings() {
        if expected.get(got.set, got.binding).is_none() {
            issues.push(LayoutIssue::UnexpectedBinding {
                set: got.set,
                binding: got.binding,
                name: got.name.clone(),
                kind: got.kind,
            });
        }
    }
}

fn compare_binding(want: &BindingDesc, got: &BindingDesc, issues: &mut Vec<LayoutIssue>) {
    let (set, binding) = (want.set, want.binding);
    if want.kind != got.kind {
        issues.push(LayoutIssue::KindMismatch {
            set,
            binding,
            expected: want.kind,
            found: got.kind,
        });
        return;
    }
    if want.count != got.count {
        issues.push(LayoutIssue::CountMismatch {
            set,
            binding,
            expected: want.count,
            found: got.count,
        });
    }
    let missing = want.stages.difference(got.stages);
    if !missing.is_empty() {
        issues.push(LayoutIssue::MissingStage {
            set,
            binding,
            stages: missing,
        });
    }
    let extra = got.stages.difference(want.stages);
    if !extra.is_empty() {
        issues.push(LayoutIssue::UnexpectedStage {
            set,
            binding,
            stages: extra,
        });
    }
}

fn compare_blocks(expected: &PipelineLayoutDesc, reflected: &[&DescriptorBinding], issues: &mut Vec<LayoutIssue>) {
    for want in expected.bindings() {
        let Some(layout) = want.block else {
            continue;
        };
        let copies = reflected
            .iter()
            .filter(|b| b.set == want.set && b.binding == want.binding && b.kind == DescriptorKind::UniformBuffer);
        for copy in copies {
            let mut found = Vec::new();
            compare_block(&layout, &copy.ty, &mut found);
            for issue in found {
                if !issues.contains(&issue) {
                    issues.push(issue);
                }
            }
        }
    }
}

/// Checks a reflected uniform block against the host struct layout.
pub fn compare_block(layout: &BlockLayout, ty: &TypeInfo, issues: &mut Vec<LayoutIssue>) {
    let TypeInfo::Struct { members, .. } = ty else {
        return;
    };
    if members.len() != layout.members.len() {
        issues.push(LayoutIssue::BlockMemberCount {
            block: layout.name,
            expected: layout.members.len(),
            found: members.len(),
        });
    }
    for (&(member, expected), reflected) in layout.members.iter().zip(members) {
        if reflected.offset != Some(expected) {
            issues.push(LayoutIssue::BlockOffset {
                block: layout.name,
                member,
                expected,
                found: reflected.offset,
            });
        }
    }
    if let Some(shader) = ty.size() {
        let padded = shader.div_ceil(16) * 16;
        if layout.size < shader || layout.size > padded {
            issues.push(LayoutIssue::BlockSize {
                block: layout.name,
                host: layout.size,
                shader,
            });
        }
    }
}

fn compare_vertex_inputs(variant: ShaderVariant, inputs: &[InterfaceVariable], issues: &mut Vec<LayoutIssue>) {
    let attributes = variant.vertex_attributes();
    for attribute in attributes {
        match inputs.iter().find(|input| input.location == attribute.location) {
            None => issues.push(LayoutIssue::MissingVertexInput {
                location: attribute.location,
                name: attribute.name,
            }),
            Some(input) => {
                let found = input.ty.component_count();
                if found != Some(attribute.format.components()) {
                    issues.push(LayoutIssue::VertexInputFormat {
                        location: attribute.location,
                        expected: attribute.format.components(),
                        found,
                    });
                }
            }
        }
    }
    for input in inputs {
        if !attributes.iter().any(|a| a.location == input.location) {
            issues.push(LayoutIssue::UnexpectedVertexInput {
                location: input.location,
                name: input.name.clone(),
            });
        }
    }
}

fn compare_interface(outputs: &[InterfaceVariable], inputs: &[InterfaceVariable], issues: &mut Vec<LayoutIssue>) {
    for input in inputs {
        match outputs.iter().find(|output| output.location == input.location) {
            None => issues.push(LayoutIssue::UnfedFragmentInput {
                location: input.location,
                name: input.name.clone(),
            }),
            Some(output) if output.ty != input.ty => issues.push(LayoutIssue::InterfaceMismatch {
                location: input.location,
                vertex: output.ty.glsl_name(),
                fragment: input.ty.glsl_name(),
            }),
            Some(_) => {}
        }
    }
}

/// A [`LayoutIssue`] found in GLSL source, with the line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub line: Option<usize>,
    pub issue: LayoutIssue,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.issue),
            None => write!(f, "{}", self.issue),
        }
    }
}

/// Checks the `layout(...)` declarations of one GLSL source against the
/// part of `variant`'s layout visible to `stage`.
pub fn lint_source(variant: ShaderVariant, stage: ShaderStage, source: &str) -> Vec<LintFinding> {
    let decls = scan_layouts(source);
    let expected = variant.expected_layout();
    let stage_flag = StageFlags::from(stage);
    let mut findings = Vec::new();
    let mut push = |line: Option<usize>, issue: LayoutIssue| findings.push(LintFinding { line, issue });

    let resources: Vec<(&LayoutDecl, DescriptorKind)> = decls
        .iter()
        .filter_map(|d| d.descriptor_kind().map(|kind| (d, kind)))
        .collect();

    for (decl, kind) in &resources {
        let (set, binding) = (decl.set.unwrap_or(0), decl.binding.unwrap_or(0));
        let name = display_name(decl);
        match expected.get(set, binding) {
            None => push(
                Some(decl.line),
                LayoutIssue::UnexpectedBinding { set, binding, name, kind: *kind },
            ),
            Some(want) if want.kind != *kind => push(
                Some(decl.line),
                LayoutIssue::KindMismatch { set, binding, expected: want.kind, found: *kind },
            ),
            Some(want) => {
                let count = decl.array_len.unwrap_or(1);
                if want.count != count {
                    push(
                        Some(decl.line),
                        LayoutIssue::CountMismatch { set, binding, expected: want.count, found: count },
                    );
                }
                if !want.stages.contains(stage_flag) {
                    push(
                        Some(decl.line),
                        LayoutIssue::UnexpectedStage { set, binding, stages: stage_flag },
                    );
                }
            }
        }
    }

    for want in expected.bindings().iter().filter(|b| b.stages.contains(stage_flag)) {
        let declared = resources
            .iter()
            .any(|(d, _)| d.set.unwrap_or(0) == want.set && d.binding.unwrap_or(0) == want.binding);
        if !declared {
            push(
                None,
                LayoutIssue::MissingStage {
                    set: want.set,
                    binding: want.binding,
                    stages: stage_flag,
                },
            );
        }
    }

    if stage == ShaderStage::Vertex {
        let inputs: Vec<&LayoutDecl> = decls
            .iter()
            .filter(|d| d.storage == Storage::In && d.location.is_some() && !d.name.is_empty())
            .collect();
        for attribute in variant.vertex_attributes() {
            match inputs.iter().find(|d| d.location == Some(attribute.location)) {
                None => push(
                    None,
                    LayoutIssue::MissingVertexInput { location: attribute.location, name: attribute.name },
                ),
                Some(decl) => {
                    let found = decl.component_count();
                    if found != Some(attribute.format.components()) {
                        push(
                            Some(decl.line),
                            LayoutIssue::VertexInputFormat {
                                location: attribute.location,
                                expected: attribute.format.components(),
                                found,
                            },
                        );
                    }
                }
            }
        }
        for decl in &inputs {
            let location = decl.location.unwrap_or_default();
            if !variant.vertex_attributes().iter().any(|a| a.location == location) {
                push(
                    Some(decl.line),
                    LayoutIssue::UnexpectedVertexInput { location, name: decl.name.clone() },
                );
            }
        }
    }

    findings
}

fn display_name(decl: &LayoutDecl) -> String {
    if decl.name.is_empty() {
        decl.type_name.clone()
    } else {
        decl.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixtureMember, FixtureResource, FixtureType, FixtureVariable, StageFixture};
    use crate::sources::BUNDLED;

    fn module(fixture: &StageFixture, name: &str) -> Module {
        Module::from_bytes(name, &fixture.assemble()).unwrap()
    }

    fn pair(variant: ShaderVariant) -> (StageFixture, StageFixture) {
        (
            StageFixture::for_variant(variant, ShaderStage::Vertex),
            StageFixture::for_variant(variant, ShaderStage::Fragment),
        )
    }

    fn run(variant: ShaderVariant, vert: &StageFixture, frag: &StageFixture) -> Vec<LayoutIssue> {
        validate_pipeline(variant, &module(vert, "Vert"), &module(frag, "Frag"))
    }

    #[test]
    fn conforming_fixtures_have_no_issues() {
        for variant in ShaderVariant::ALL {
            let (vert, frag) = pair(variant);
            assert_eq!(run(variant, &vert, &frag), Vec::new(), "{variant}");
        }
    }

    #[test]
    fn swapped_modules_report_wrong_stage() {
        let (vert, frag) = pair(ShaderVariant::Flat);
        let issues = run(ShaderVariant::Flat, &frag, &vert);
        assert!(issues.contains(&LayoutIssue::WrongStage {
            module: "Vert".to_string(),
            expected: ShaderStage::Vertex,
            found: Some(ShaderStage::Fragment),
        }));
    }

    #[test]
    fn moved_texture_binding_is_reported() {
        let (vert, mut frag) = pair(ShaderVariant::Flat);
        if let Some(tex) = frag.binding_mut(1, 1) {
            tex.set = 2;
            tex.binding = 0;
        }
        let issues = run(ShaderVariant::Flat, &vert, &frag);
        assert!(issues.iter().any(|i| matches!(i, LayoutIssue::MissingBinding { set: 1, binding: 1, .. })));
        assert!(issues.iter().any(|i| matches!(i, LayoutIssue::UnexpectedBinding { set: 2, binding: 0, .. })));
    }

    #[test]
    fn lit_fragment_must_read_mesh_block() {
        let (vert, mut frag) = pair(ShaderVariant::Lit);
        frag.bindings.retain(|b| !(b.set == 1 && b.binding == 0));
        let issues = run(ShaderVariant::Lit, &vert, &frag);
        assert_eq!(
            issues,
            vec![LayoutIssue::MissingStage {
                set: 1,
                binding: 0,
                stages: StageFlags::FRAGMENT,
            }]
        );
    }

    #[test]
    fn shifted_block_member_is_reported() {
        let (vert, mut frag) = pair(ShaderVariant::Lit);
        if let Some(light) = frag.binding_mut(2, 0) {
            light.resource = FixtureResource::UniformBlock {
                type_name: "GlobalLightUbo".to_string(),
                members: vec![
                    FixtureMember { name: "direction".into(), ty: FixtureType::Vec3, offset: 0 },
                    FixtureMember { name: "ambient".into(), ty: FixtureType::Float, offset: 12 },
                    FixtureMember { name: "color".into(), ty: FixtureType::Vec3, offset: 16 },
                ],
            };
        }
        let issues = run(ShaderVariant::Lit, &vert, &frag);
        assert!(issues.contains(&LayoutIssue::BlockOffset {
            block: "GlobalLightUbo",
            member: "color",
            expected: 16,
            found: Some(12),
        }));
        assert!(issues.contains(&LayoutIssue::BlockOffset {
            block: "GlobalLightUbo",
            member: "ambient",
            expected: 28,
            found: Some(16),
        }));
    }

    #[test]
    fn fragment_copy_of_shared_block_is_checked() {
        let (vert, mut frag) = pair(ShaderVariant::Lit);
        if let Some(mesh) = frag.binding_mut(1, 0) {
            mesh.resource = FixtureResource::UniformBlock {
                type_name: "MeshUbo".to_string(),
                members: vec![
                    FixtureMember { name: "flags".into(), ty: FixtureType::Uint, offset: 0 },
                    FixtureMember { name: "color".into(), ty: FixtureType::Vec4, offset: 16 },
                    FixtureMember { name: "model".into(), ty: FixtureType::Mat4, offset: 32 },
                ],
            };
        }
        let issues = run(ShaderVariant::Lit, &vert, &frag);
        assert!(issues.iter().any(|i| matches!(
            i,
            LayoutIssue::Conflict { message } if message.starts_with("set 1 binding 0")
        )));
        assert!(issues.contains(&LayoutIssue::BlockOffset {
            block: "MeshUbo",
            member: "color",
            expected: 64,
            found: Some(16),
        }));
        assert!(issues.contains(&LayoutIssue::BlockOffset {
            block: "MeshUbo",
            member: "flags",
            expected: 80,
            found: Some(32),
        }));
    }

    #[test]
    fn identical_block_drift_in_both_stages_is_reported_once() {
        let (mut vert, mut frag) = pair(ShaderVariant::Lit);
        for fixture in [&mut vert, &mut frag] {
            if let Some(mesh) = fixture.binding_mut(1, 0) {
                if let FixtureResource::UniformBlock { members, .. } = &mut mesh.resource {
                    members[2].offset = 84;
                }
            }
        }
        let issues = run(ShaderVariant::Lit, &vert, &frag);
        let shifted = LayoutIssue::BlockOffset {
            block: "MeshUbo",
            member: "flags",
            expected: 80,
            found: Some(84),
        };
        assert_eq!(issues.iter().filter(|i| **i == shifted).count(), 1);
        assert!(!issues.iter().any(|i| matches!(i, LayoutIssue::Conflict { .. })));
    }

    #[test]
    fn missing_normal_and_mismatched_interface() {
        let (mut vert, mut frag) = pair(ShaderVariant::Lit);
        vert.inputs.retain(|v| v.location != 2);
        frag.inputs.push(FixtureVariable { location: 3, name: "in_tangent".into(), ty: FixtureType::Vec3 });
        if let Some(uv) = frag.inputs.iter_mut().find(|v| v.location == 0) {
            uv.ty = FixtureType::Vec4;
        }
        let issues = run(ShaderVariant::Lit, &vert, &frag);
        assert!(issues.contains(&LayoutIssue::MissingVertexInput { location: 2, name: "normal" }));
        assert!(issues.contains(&LayoutIssue::UnfedFragmentInput { location: 3, name: "in_tangent".into() }));
        assert!(issues.contains(&LayoutIssue::InterfaceMismatch {
            location: 0,
            vertex: "vec2".into(),
            fragment: "vec4".into(),
        }));
    }

    #[test]
    fn lit_pair_checked_as_flat_has_extra_light() {
        let (vert, frag) = pair(ShaderVariant::Lit);
        let issues = run(ShaderVariant::Flat, &vert, &frag);
        assert!(issues.iter().any(|i| matches!(i, LayoutIssue::UnexpectedBinding { set: 2, binding: 0, .. })));
        assert!(issues.iter().any(|i| matches!(i, LayoutIssue::UnexpectedVertexInput { location: 2, .. })));
    }

    #[test]
    fn texture_array_count_is_checked() {
        let (vert, mut frag) = pair(ShaderVariant::Textured);
        if let Some(tex) = frag.binding_mut(2, 0) {
            tex.resource = FixtureResource::Sampler2d { count: 2 };
        }
        let issues = run(ShaderVariant::Textured, &vert, &frag);
        assert_eq!(
            issues,
            vec![LayoutIssue::CountMismatch { set: 2, binding: 0, expected: 1, found: 2 }]
        );
    }

    #[test]
    fn bundled_sources_lint_clean() {
        for source in BUNDLED {
            let findings = lint_source(source.variant, source.stage, source.source);
            assert!(findings.is_empty(), "{}: {:?}", source.file_name, findings);
        }
    }

    #[test]
    fn lint_reports_misplaced_declarations() {
        let source = "#version 450\n\
            layout(set = 0, binding = 0) uniform CameraUbo { mat4 view; mat4 proj; } camera;\n\
            layout(set = 2, binding = 0) uniform sampler2D tex;\n\
            layout(location = 0) in vec3 in_position;\n\
            layout(location = 1) in vec3 in_uv;\n";
        let findings = lint_source(ShaderVariant::Flat, ShaderStage::Vertex, source);
        let issues: Vec<&LayoutIssue> = findings.iter().map(|f| &f.issue).collect();

        assert!(issues.iter().any(|i| matches!(i, LayoutIssue::UnexpectedBinding { set: 2, binding: 0, .. })));
        assert!(issues.contains(&&LayoutIssue::MissingStage { set: 1, binding: 0, stages: StageFlags::VERTEX }));
        assert!(issues.contains(&&LayoutIssue::VertexInputFormat { location: 1, expected: 2, found: Some(3) }));
        let unexpected = findings
            .iter()
            .find(|f| matches!(f.issue, LayoutIssue::UnexpectedBinding { .. }))
            .unwrap();
        assert_eq!(unexpected.line, Some(3));
        assert!(unexpected.to_string().starts_with("line 3: set 2 binding 0"));
    }

    #[test]
    fn lint_flags_sampler_in_vertex_stage() {
        let source = "layout(set = 1, binding = 1) uniform sampler2D tex;\n";
        let findings = lint_source(ShaderVariant::Lit, ShaderStage::Vertex, source);
        assert!(findings.iter().any(|f| f.issue
            == LayoutIssue::UnexpectedStage { set: 1, binding: 1, stages: StageFlags::VERTEX }));
    }
}
