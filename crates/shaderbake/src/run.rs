use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use bakeconfig::BakeConfig;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::compile::{self, CompileRequest, ShaderCompiler};
use crate::discover::{find_sources, ScanOptions, ShaderSource};
use crate::paths::BakePaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<ExitCode> {
    let paths = BakePaths::discover()?;
    let config = resolve_config(&args, &paths)?;
    let out_dir = config.output_dir_for(&args.dir);
    debug!(?config, out_dir = %out_dir.display(), "resolved batch configuration");

    let sources = find_sources(
        &args.dir,
        &ScanOptions {
            extensions: &config.extensions,
            recursive: config.recursive,
            exclude: Some(&out_dir),
        },
    )?;
    if sources.is_empty() {
        println!("No shader sources found in {}", args.dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let compiler = compile::compiler_for(&config)?;
    info!(
        compiler = compiler.name(),
        count = sources.len(),
        out_dir = %out_dir.display(),
        "compiling shaders"
    );

    let options = BatchOptions {
        incremental: args.incremental,
        verify: config.verify,
        dry_run: args.dry_run,
    };
    let report = bake(&sources, &out_dir, compiler.as_ref(), options)?;
    println!("{}", report.summary());

    if args.strict && report.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Layers the config files for `args.dir`, then applies command-line flags on top.
pub fn resolve_config(args: &RunArgs, paths: &BakePaths) -> Result<BakeConfig> {
    if let Some(explicit) = &args.config {
        if !explicit.is_file() {
            bail!("configuration file {} does not exist", explicit.display());
        }
    }
    let layers = paths.config_layers(&args.dir, args.config.as_deref());
    let mut config = BakeConfig::load_layered(&layers).context("failed to load configuration")?;

    if let Some(out_dir) = &args.out_dir {
        config.output_dir = out_dir.clone();
    }
    if let Some(program) = &args.compiler {
        config.compiler.program = program.clone();
    }
    if let Some(backend) = args.backend {
        config.compiler.backend = backend;
    }
    if let Some(env) = &args.target_env {
        config.compiler.target_env = Some(env.clone());
    }
    if args.optimize {
        config.compiler.optimize = true;
    }
    if let Some(timeout) = args.timeout {
        config.compiler.timeout = Some(timeout);
    }
    if args.recursive {
        config.recursive = true;
    }
    if args.no_verify {
        config.verify = false;
    }
    config
        .defines
        .extend(args.defines.iter().map(|(name, value)| (name.clone(), value.clone())));

    config.validate().context("invalid command-line options")?;
    Ok(config)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub incremental: bool,
    pub verify: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Compiled,
    UpToDate,
    Planned,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
    pub compiled: usize,
    pub failed: usize,
    pub up_to_date: usize,
    pub planned: usize,
}

impl BatchReport {
    fn record(&mut self, file: FileOutcome) {
        match &file.outcome {
            Outcome::Compiled => {
                self.compiled += 1;
                println!("compiled {} -> {}", file.source.display(), file.output.display());
            }
            Outcome::UpToDate => {
                self.up_to_date += 1;
                println!("up-to-date {}", file.output.display());
            }
            Outcome::Planned => {
                self.planned += 1;
                println!("would compile {} -> {}", file.source.display(), file.output.display());
            }
            Outcome::Failed(reason) => {
                self.failed += 1;
                println!("failed {}: {reason}", file.source.display());
            }
        }
        self.files.push(file);
    }

    pub fn summary(&self) -> String {
        if self.planned > 0 {
            return format!(
                "Dry-run: {} would compile, {} up-to-date",
                self.planned, self.up_to_date
            );
        }
        format!(
            "{} compiled, {} failed, {} up-to-date",
            self.compiled, self.failed, self.up_to_date
        )
    }
}

/// Compiles every source in order. A file that fails is recorded and the
/// batch moves on; only an unusable output directory stops it.
pub fn bake(
    sources: &[ShaderSource],
    out_dir: &Path,
    compiler: &dyn ShaderCompiler,
    options: BatchOptions,
) -> Result<BatchReport> {
    if !options.dry_run {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    }

    let mut report = BatchReport::default();
    for source in sources {
        let output = source.output_path(out_dir);
        let outcome = if options.incremental && compile::is_up_to_date(&source.path, &output) {
            Outcome::UpToDate
        } else if options.dry_run {
            Outcome::Planned
        } else {
            match compile_one(source, &output, compiler, options.verify) {
                Ok(()) => Outcome::Compiled,
                Err(reason) => {
                    warn!(source = %source.path.display(), %reason, "shader failed to compile");
                    Outcome::Failed(reason)
                }
            }
        };
        report.record(FileOutcome {
            source: source.path.clone(),
            output,
            outcome,
        });
    }
    Ok(report)
}

fn compile_one(
    source: &ShaderSource,
    output: &Path,
    compiler: &dyn ShaderCompiler,
    verify: bool,
) -> Result<(), String> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    let request = CompileRequest {
        source: &source.path,
        output,
        stage: source.stage,
    };
    let result = compiler
        .compile(&request)
        .and_then(|()| if verify { compile::verify_output(&request) } else { Ok(()) })
        .map_err(|failure| failure.reason);
    if result.is_err() {
        discard_output(output);
    }
    result
}

/// Removes a rejected or partial output so an incremental run retries it.
fn discard_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => debug!(output = %output.display(), "removed rejected output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(output = %output.display(), %err, "failed to remove rejected output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileFailure;
    use clap::Parser;
    use shaderabi::fixtures::variant_modules;
    use shaderabi::ShaderVariant;
    use spvreflect::ShaderStage;

    /// Writes fixture SPIR-V for `lit.*` sources and fails everything else.
    struct FixtureCompiler;

    impl ShaderCompiler for FixtureCompiler {
        fn name(&self) -> &str {
            "fixture"
        }

        fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileFailure> {
            let name = request.source.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !name.starts_with("lit.") {
                return Err(CompileFailure {
                    reason: format!("{name}:1: error: syntax error"),
                });
            }
            let (vertex, fragment) = variant_modules(ShaderVariant::Lit);
            let bytes = match request.stage {
                ShaderStage::Vertex => vertex,
                _ => fragment,
            };
            fs::write(request.output, bytes).unwrap();
            Ok(())
        }
    }

    fn source(root: &Path, relative: &str, stage: ShaderStage) -> ShaderSource {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "#version 450\n").unwrap();
        ShaderSource {
            path,
            relative: PathBuf::from(relative),
            stage,
        }
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            source(dir.path(), "broken.frag", ShaderStage::Fragment),
            source(dir.path(), "lit.frag", ShaderStage::Fragment),
            source(dir.path(), "lit.vert", ShaderStage::Vertex),
        ];
        let out = dir.path().join("compiled");
        let options = BatchOptions { verify: true, ..BatchOptions::default() };
        let report = bake(&sources, &out, &FixtureCompiler, options).unwrap();

        assert_eq!((report.compiled, report.failed), (2, 1));
        assert!(matches!(&report.files[0].outcome, Outcome::Failed(reason) if reason.contains("syntax error")));
        assert!(out.join("lit.vert.spv").is_file());
        assert!(out.join("lit.frag.spv").is_file());
        assert_eq!(report.summary(), "2 compiled, 1 failed, 0 up-to-date");
    }

    #[test]
    fn verification_catches_stage_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        // A `.geom` source gets fragment SPIR-V from the fixture compiler.
        let sources = vec![source(dir.path(), "lit.geom", ShaderStage::Geometry)];
        let out = dir.path().join("compiled");

        let verified = bake(&sources, &out, &FixtureCompiler, BatchOptions { verify: true, ..Default::default() }).unwrap();
        assert!(matches!(&verified.files[0].outcome, Outcome::Failed(reason) if reason.contains("expected geometry")));
        assert!(!out.join("lit.geom.spv").exists());

        let options = BatchOptions { verify: true, incremental: true, ..Default::default() };
        let retried = bake(&sources, &out, &FixtureCompiler, options).unwrap();
        assert!(matches!(retried.files[0].outcome, Outcome::Failed(_)));
        assert_eq!(retried.up_to_date, 0);

        let unverified = bake(&sources, &out, &FixtureCompiler, BatchOptions::default()).unwrap();
        assert_eq!(unverified.files[0].outcome, Outcome::Compiled);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![source(dir.path(), "nested/lit.vert", ShaderStage::Vertex)];
        let out = dir.path().join("compiled");
        let report = bake(&sources, &out, &FixtureCompiler, BatchOptions { dry_run: true, ..Default::default() }).unwrap();
        assert_eq!(report.planned, 1);
        assert!(!out.exists());
        assert_eq!(report.summary(), "Dry-run: 1 would compile, 0 up-to-date");
    }

    #[test]
    fn incremental_skips_fresh_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![source(dir.path(), "nested/lit.vert", ShaderStage::Vertex)];
        let out = dir.path().join("compiled");
        let options = BatchOptions { incremental: true, ..Default::default() };

        let first = bake(&sources, &out, &FixtureCompiler, options).unwrap();
        assert_eq!(first.compiled, 1);
        assert!(out.join("nested/lit.vert.spv").is_file());

        let second = bake(&sources, &out, &FixtureCompiler, options).unwrap();
        assert_eq!(second.up_to_date, 1);
        assert_eq!(second.compiled, 0);
    }

    #[test]
    fn cli_flags_override_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("shaderbake.toml"),
            "output_dir = \"spv\"\n[compiler]\nprogram = \"dir-glslc\"\n[defines]\nA = 1\n",
        )
        .unwrap();
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let cli = crate::cli::Cli::try_parse_from([
            "shaderbake", dir_arg.as_str(), "--compiler", "cli-glslc", "-D", "B=2", "--no-verify",
        ])
        .unwrap();
        let paths = BakePaths::for_config_dir(user.path());

        let config = resolve_config(&cli.run, &paths).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("spv"));
        assert_eq!(config.compiler.program, "cli-glslc");
        assert!(!config.verify);
        assert_eq!(config.defines.len(), 2);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = crate::cli::Cli::try_parse_from(["shaderbake", "--config", "/nonexistent/shaderbake.toml"]).unwrap();
        let err = resolve_config(&cli.run, &BakePaths::for_config_dir(dir.path())).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
