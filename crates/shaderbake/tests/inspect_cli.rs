use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use shaderabi::fixtures::{variant_modules, FixtureMember, FixtureResource, FixtureType, StageFixture};
use shaderabi::{ShaderStage, ShaderVariant};
use tempfile::TempDir;

fn shaderbake(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shaderbake"))
        .env("SHADERBAKE_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "error")
        .args(args)
        .output()
        .expect("failed to run shaderbake")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn reflect_json_lists_bindings() {
    let root = TempDir::new().unwrap();
    let (vertex, _) = variant_modules(ShaderVariant::Lit);
    let path = root.path().join("lit.vert.spv");
    fs::write(&path, vertex).unwrap();

    let output = shaderbake(root.path(), &["reflect", path.to_str().unwrap(), "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["module"], "LitVert");
    assert_eq!(report["entry_points"][0]["stage"], "vertex");
    let bindings = report["descriptor_bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0]["name"], "camera");
    assert_eq!(report["inputs"].as_array().unwrap().len(), 3);

    let text = shaderbake(root.path(), &["reflect", path.to_str().unwrap()]);
    assert!(stdout(&text).contains("set 0 binding 0"));
}

#[test]
fn reflect_rejects_non_spirv() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("bogus.spv");
    fs::write(&path, b"not spir-v at all").unwrap();
    let output = shaderbake(root.path(), &["reflect", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn check_reports_fragment_only_block_drift() {
    let root = TempDir::new().unwrap();
    let (vertex, _) = variant_modules(ShaderVariant::Lit);
    let mut fragment = StageFixture::for_variant(ShaderVariant::Lit, ShaderStage::Fragment);
    if let Some(light) = fragment.binding_mut(2, 0) {
        light.resource = FixtureResource::UniformBlock {
            type_name: "GlobalLightUbo".to_string(),
            members: vec![
                FixtureMember { name: "direction".into(), ty: FixtureType::Vec3, offset: 0 },
                FixtureMember { name: "color".into(), ty: FixtureType::Vec3, offset: 12 },
                FixtureMember { name: "ambient".into(), ty: FixtureType::Float, offset: 24 },
            ],
        };
    }
    let vert = root.path().join("lit.vert.spv");
    let frag = root.path().join("lit.frag.spv");
    fs::write(&vert, vertex).unwrap();
    fs::write(&frag, fragment.assemble()).unwrap();

    let output = shaderbake(root.path(), &["check", vert.to_str().unwrap(), frag.to_str().unwrap()]);
    let text = stdout(&output);
    assert!(!output.status.success(), "{text}");
    assert!(text.contains("GlobalLightUbo.color: host offset 16, shader offset 12"), "{text}");

    let json = shaderbake(
        root.path(),
        &["check", vert.to_str().unwrap(), frag.to_str().unwrap(), "--json"],
    );
    let report: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(report["ok"], false);
    assert!(report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .any(|issue| issue["issue"] == "block_offset" && issue["member"] == "ambient"));
}

#[test]
fn codegen_writes_bindings_once() {
    let root = TempDir::new().unwrap();
    let (vertex, fragment) = variant_modules(ShaderVariant::Lit);
    let vert = root.path().join("lit.vert.spv");
    let frag = root.path().join("lit.frag.spv");
    fs::write(&vert, vertex).unwrap();
    fs::write(&frag, fragment).unwrap();
    let (vert, frag) = (vert.to_str().unwrap(), frag.to_str().unwrap());

    let printed = shaderbake(root.path(), &["codegen", vert, frag]);
    let text = stdout(&printed);
    assert!(printed.status.success(), "{text}");
    assert!(text.contains("pub struct LitVertex {"), "{text}");
    assert!(text.contains("pub const LIGHT_SET: u32 = 2;"), "{text}");

    let target = root.path().join("src/shaders.rs");
    let target_arg = target.to_str().unwrap();
    let written = shaderbake(root.path(), &["codegen", vert, frag, "-o", target_arg]);
    assert!(stdout(&written).starts_with("wrote "), "{}", stdout(&written));
    let generated = fs::read_to_string(&target).unwrap();
    assert_eq!(generated, text);
    assert!(generated.contains("pub struct MeshUbo {"));

    let again = shaderbake(root.path(), &["codegen", vert, frag, "-o", target_arg]);
    assert!(stdout(&again).contains("is up to date"), "{}", stdout(&again));
}

#[test]
fn codegen_rejects_non_spirv() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("bogus.spv");
    fs::write(&path, b"not spir-v").unwrap();
    let output = shaderbake(root.path(), &["codegen", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn layout_prints_every_variant() {
    let root = TempDir::new().unwrap();
    let output = shaderbake(root.path(), &["layout"]);
    let text = stdout(&output);
    assert!(output.status.success());
    for variant in ["lit:", "flat:", "textured:"] {
        assert!(text.contains(variant), "{text}");
    }

    let json = shaderbake(root.path(), &["layout", "--variant", "lit", "--json"]);
    let layouts: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    let lit = &layouts[0];
    assert_eq!(lit["variant"], "lit");
    assert_eq!(lit["vertex_stride"], 32);
    assert_eq!(lit["bindings"].as_array().unwrap().len(), 4);
}

#[test]
fn init_then_lint_is_clean_until_a_binding_moves() {
    let root = TempDir::new().unwrap();
    let shaders = root.path().join("shaders");
    let dir = shaders.to_str().unwrap();

    let init = shaderbake(root.path(), &["init", dir]);
    assert!(init.status.success());
    assert!(shaders.join("textured.frag").is_file());

    let again = shaderbake(root.path(), &["init", dir]);
    assert!(stdout(&again).contains("already present"));

    let clean = shaderbake(root.path(), &["lint", dir]);
    assert!(clean.status.success(), "{}", stdout(&clean));
    assert!(stdout(&clean).contains("Linted 6 file(s), 0 finding(s)"));

    let flat = shaders.join("flat.vert");
    let source = fs::read_to_string(&flat).unwrap();
    fs::write(
        &flat,
        source.replace("layout(set = 1, binding = 0) uniform MeshUbo", "layout(set = 1, binding = 2) uniform MeshUbo"),
    )
    .unwrap();
    let dirty = shaderbake(root.path(), &["lint", dir]);
    let text = stdout(&dirty);
    assert!(!dirty.status.success());
    assert!(text.contains("flat.vert:"), "{text}");
}

#[test]
fn where_lists_config_layers() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("config");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("shaderbake.toml"), "recursive = true\n").unwrap();

    let output = shaderbake(&config, &["where", root.path().to_str().unwrap()]);
    let text = stdout(&output);
    assert!(output.status.success());
    assert!(text.contains(config.to_str().unwrap()), "{text}");
    assert!(text.contains("(present)"), "{text}");
    assert!(text.contains("(missing)"), "{text}");
}
