use std::path::PathBuf;
use std::time::Duration;

use bakeconfig::{is_identifier, CompilerBackend};
use clap::{Parser, Subcommand};
use shaderabi::ShaderVariant;

#[derive(Parser, Debug)]
#[command(
    name = "shaderbake",
    author,
    version,
    about = "Compile GLSL shaders to SPIR-V and check them against the engine binding layout",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory containing GLSL sources.
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output directory (relative paths resolve against DIR; default `compiled`).
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Configuration file applied on top of `DIR/shaderbake.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the glslc executable.
    #[arg(long, value_name = "PROGRAM", env = "SHADERBAKE_GLSLC")]
    pub compiler: Option<String>,

    /// Compiler backend: `glslc` (process) or `shaderc` (in-process, needs the `shaderc` feature).
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<CompilerBackend>,

    /// Forwarded as `--target-env` (e.g. `vulkan1.2`).
    #[arg(long, value_name = "ENV")]
    pub target_env: Option<String>,

    /// Preprocessor definition, repeatable.
    #[arg(short = 'D', value_name = "NAME[=VALUE]", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Enable compiler optimisations (`-O`).
    #[arg(short = 'O', long)]
    pub optimize: bool,

    /// Kill a compiler that runs longer than this (e.g. `30s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Descend into subdirectories of DIR.
    #[arg(long)]
    pub recursive: bool,

    /// Skip sources whose output is newer than the source.
    #[arg(long)]
    pub incremental: bool,

    /// Do not parse compiled outputs with the SPIR-V reader.
    #[arg(long)]
    pub no_verify: bool,

    /// Print what would be compiled without running the compiler.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with a non-zero status when any file fails.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print entry points, interface variables, descriptor bindings and struct layouts of a SPIR-V module.
    Reflect(ReflectArgs),
    /// Validate a compiled vertex/fragment pair against a variant's binding layout.
    Check(CheckArgs),
    /// Print the expected binding layout and vertex attributes.
    Layout(LayoutArgs),
    /// Scan GLSL sources for `layout(...)` declarations that disagree with the binding layout.
    Lint(LintArgs),
    /// Generate Rust uniform block and vertex structs and binding constants from SPIR-V modules.
    Codegen(CodegenArgs),
    /// Write the bundled lit/flat/textured GLSL sources into a directory.
    Init(InitArgs),
    /// Print the configuration files that apply to a directory.
    Where(WhereArgs),
}

#[derive(Parser, Debug)]
pub struct ReflectArgs {
    #[arg(value_name = "SPV")]
    pub path: PathBuf,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "VERT_SPV")]
    pub vertex: PathBuf,

    #[arg(value_name = "FRAG_SPV")]
    pub fragment: PathBuf,

    /// Shader variant; inferred from the vertex file name when omitted.
    #[arg(long, value_name = "VARIANT", value_parser = parse_variant)]
    pub variant: Option<ShaderVariant>,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct LayoutArgs {
    /// Limit output to one variant.
    #[arg(long, value_name = "VARIANT", value_parser = parse_variant)]
    pub variant: Option<ShaderVariant>,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct LintArgs {
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Check every source as this variant instead of inferring it from the file name.
    #[arg(long, value_name = "VARIANT", value_parser = parse_variant)]
    pub variant: Option<ShaderVariant>,

    /// Descend into subdirectories of DIR.
    #[arg(long)]
    pub recursive: bool,
}

#[derive(Parser, Debug)]
pub struct CodegenArgs {
    #[arg(value_name = "SPV", required = true)]
    pub modules: Vec<PathBuf>,

    /// Write the bindings to FILE instead of stdout; left untouched when unchanged.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[arg(value_name = "DIR", default_value = "shaders")]
    pub dir: PathBuf,

    /// Replace files that already exist.
    #[arg(long)]
    pub force: bool,

    /// List the files that would be written.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct WhereArgs {
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_backend(value: &str) -> Result<CompilerBackend, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("compiler backend must not be empty".to_string());
    }
    match CompilerBackend::parse(trimmed)? {
        CompilerBackend::Shaderc if !cfg!(feature = "shaderc") => {
            Err("shaderc support is not enabled in this build".to_string())
        }
        backend => Ok(backend),
    }
}

pub fn parse_define(value: &str) -> Result<(String, String), String> {
    let (name, value) = match value.split_once('=') {
        Some((name, value)) => (name.trim(), value.to_string()),
        None => (value.trim(), "1".to_string()),
    };
    if !is_identifier(name) {
        return Err(format!("invalid define name '{name}'"));
    }
    Ok((name.to_string(), value))
}

pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    let duration = match trimmed.parse::<u64>() {
        Ok(seconds) => Duration::from_secs(seconds),
        Err(_) => humantime::parse_duration(trimmed)
            .map_err(|err| format!("invalid timeout '{trimmed}': {err}"))?,
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

pub fn parse_variant(value: &str) -> Result<ShaderVariant, String> {
    value.parse().map_err(|err: shaderabi::LayoutError| err.to_string())
}
