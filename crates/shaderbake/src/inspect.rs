use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use shaderabi::{validate_pipeline, BindingDesc, LayoutIssue, ShaderVariant, VertexAttribute};
use spvreflect::{DescriptorBinding, EntryPoint, Header, InterfaceVariable, Module, TypeInfo};

use crate::cli::{CheckArgs, LayoutArgs, ReflectArgs};

#[derive(Debug, Serialize)]
struct ReflectReport<'a> {
    module: &'a str,
    header: Header,
    entry_points: Vec<EntryPoint>,
    inputs: Vec<InterfaceVariable>,
    outputs: Vec<InterfaceVariable>,
    descriptor_bindings: Vec<DescriptorBinding>,
    structs: Vec<TypeInfo>,
}

pub(crate) fn load_module(path: &Path) -> Result<Module> {
    Module::from_file(path).with_context(|| format!("failed to read SPIR-V module {}", path.display()))
}

pub fn reflect(args: ReflectArgs) -> Result<ExitCode> {
    let module = load_module(&args.path)?;
    let report = ReflectReport {
        module: module.name(),
        header: module.header(),
        entry_points: module.entry_points()?,
        inputs: module.inputs()?,
        outputs: module.outputs()?,
        descriptor_bindings: module.descriptor_bindings()?,
        structs: module.struct_types()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    let header = report.header;
    println!(
        "{} (SPIR-V {}.{}, generator {:#010x}, bound {})",
        report.module, header.major, header.minor, header.generator, header.bound
    );
    println!("Entry points:");
    for entry in &report.entry_points {
        match entry.stage {
            Some(stage) => println!("  {:<10} {}", stage.to_string(), entry.name),
            None => println!("  model {:<4} {}", entry.execution_model, entry.name),
        }
    }
    print_interface("Inputs", &report.inputs);
    print_interface("Outputs", &report.outputs);
    println!("Descriptor bindings:");
    if report.descriptor_bindings.is_empty() {
        println!("  (none)");
    }
    for binding in &report.descriptor_bindings {
        let mut line = format!(
            "  set {} binding {}: {} `{}`",
            binding.set, binding.binding, binding.kind, binding.name
        );
        if binding.count != 1 {
            line.push_str(&format!("[{}]", binding.count));
        }
        if let Some(size) = binding.ty.base_element().size() {
            line.push_str(&format!(" ({size} bytes)"));
        }
        println!("{line}");
    }
    println!("Structs:");
    for ty in &report.structs {
        print_struct(ty);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_interface(title: &str, variables: &[InterfaceVariable]) {
    println!("{title}:");
    if variables.is_empty() {
        println!("  (none)");
    }
    for variable in variables {
        println!(
            "  location {}: {} {}",
            variable.location,
            variable.ty.glsl_name(),
            variable.name
        );
    }
}

fn print_struct(ty: &TypeInfo) {
    let TypeInfo::Struct { name, members } = ty else {
        return;
    };
    match ty.size() {
        Some(size) => println!("  {name} ({size} bytes)"),
        None => println!("  {name}"),
    }
    for member in members {
        let offset = member
            .offset
            .map(|offset| format!("+{offset}"))
            .unwrap_or_else(|| "  ?".to_string());
        println!("    {offset:>5} {} {}", member.ty.glsl_name(), member.name);
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    variant: ShaderVariant,
    ok: bool,
    issues: &'a [LayoutIssue],
}

pub fn check(args: CheckArgs) -> Result<ExitCode> {
    let variant = match args.variant {
        Some(variant) => variant,
        None => args
            .vertex
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(ShaderVariant::from_file_name)
            .ok_or_else(|| {
                anyhow!(
                    "cannot infer the shader variant from {}; pass --variant lit|flat|textured",
                    args.vertex.display()
                )
            })?,
    };
    let vertex = load_module(&args.vertex)?;
    let fragment = load_module(&args.fragment)?;
    let issues = validate_pipeline(variant, &vertex, &fragment);

    if args.json {
        let report = CheckReport {
            variant,
            ok: issues.is_empty(),
            issues: &issues,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if issues.is_empty() {
        println!(
            "ok: {} and {} match the {variant} layout",
            args.vertex.display(),
            args.fragment.display()
        );
    } else {
        for issue in &issues {
            println!("{issue}");
        }
        println!("{} issue(s) against the {variant} layout", issues.len());
    }

    Ok(if issues.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Debug, Serialize)]
struct VariantLayout {
    variant: ShaderVariant,
    bindings: Vec<BindingDesc>,
    vertex_stride: u32,
    vertex_attributes: &'static [VertexAttribute],
}

impl VariantLayout {
    fn new(variant: ShaderVariant) -> Self {
        Self {
            variant,
            bindings: variant.expected_layout().bindings().to_vec(),
            vertex_stride: variant.vertex_stride(),
            vertex_attributes: variant.vertex_attributes(),
        }
    }
}

pub fn layout(args: LayoutArgs) -> Result<ExitCode> {
    let layouts: Vec<VariantLayout> = match args.variant {
        Some(variant) => vec![VariantLayout::new(variant)],
        None => ShaderVariant::ALL.into_iter().map(VariantLayout::new).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&layouts)?);
        return Ok(ExitCode::SUCCESS);
    }

    for (index, layout) in layouts.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{}:", layout.variant);
        println!("  Bindings:");
        for binding in &layout.bindings {
            println!("    {binding}");
            if let Some(block) = &binding.block {
                println!("      {} ({} bytes)", block.name, block.size);
                for (member, offset) in block.members {
                    println!("        +{offset:<3} {member}");
                }
            }
        }
        println!("  Vertex input (stride {}):", layout.vertex_stride);
        for attribute in layout.vertex_attributes {
            println!(
                "    location {}: {} {} at offset {} ({})",
                attribute.location,
                attribute.format.glsl_type(),
                attribute.name,
                attribute.offset,
                attribute.format
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
