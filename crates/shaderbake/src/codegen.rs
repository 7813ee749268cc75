use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use shaderabi::codegen;
use spvreflect::Module;
use tracing::{debug, info};

use crate::cli::CodegenArgs;
use crate::inspect::load_module;

pub fn codegen(args: CodegenArgs) -> Result<ExitCode> {
    let modules = args
        .modules
        .iter()
        .map(|path| load_module(path))
        .collect::<Result<Vec<Module>>>()?;
    let inputs: Vec<(&Path, &Module)> = args.modules.iter().map(PathBuf::as_path).zip(&modules).collect();
    let bindings = codegen::generate(&inputs).context("failed to generate bindings")?;
    let text = bindings.to_string();

    let Some(output) = &args.output else {
        print!("{text}");
        return Ok(ExitCode::SUCCESS);
    };
    if fs::read_to_string(output).is_ok_and(|existing| existing == text) {
        debug!(output = %output.display(), "bindings unchanged");
        println!("{} is up to date", output.display());
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(output, &text).with_context(|| format!("failed to write {}", output.display()))?;
    info!(output = %output.display(), modules = modules.len(), "wrote bindings");
    println!(
        "wrote {} ({} struct(s), {} constant(s))",
        output.display(),
        bindings.blocks.len() + bindings.vertices.len(),
        bindings.constants.len()
    );
    Ok(ExitCode::SUCCESS)
}
