use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use bakeconfig::{BakeConfig, CompilerBackend};
use spvreflect::{Module, ShaderStage};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for stderr after killing a compiler. Grandchildren it
/// forked may still hold the pipe open.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(200);
/// Diagnostic lines kept in a failure reason.
const MAX_REASON_LINES: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub stage: ShaderStage,
}

/// Why one source did not produce a usable output. Never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub reason: String,
}

impl CompileFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub trait ShaderCompiler {
    fn name(&self) -> &str;
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileFailure>;
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target_env: Option<String>,
    pub optimize: bool,
    pub defines: Vec<(String, String)>,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CompileOptions {
    pub fn from_config(config: &BakeConfig) -> Self {
        Self {
            target_env: config.compiler.target_env.clone(),
            optimize: config.compiler.optimize,
            defines: config
                .defines
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            args: config.compiler.args.clone(),
            timeout: config.compiler.timeout,
        }
    }
}

/// Builds the backend selected by `config`.
pub fn compiler_for(config: &BakeConfig) -> anyhow::Result<Box<dyn ShaderCompiler>> {
    let options = CompileOptions::from_config(config);
    match config.compiler.backend {
        CompilerBackend::Glslc => Ok(Box::new(Glslc::new(config.compiler.program.clone(), options))),
        #[cfg(feature = "shaderc")]
        CompilerBackend::Shaderc => Ok(Box::new(shaderc_backend::InProcess::new(options)?)),
        #[cfg(not(feature = "shaderc"))]
        CompilerBackend::Shaderc => anyhow::bail!("shaderc support is not enabled in this build"),
    }
}

#[derive(Debug, Clone)]
pub struct Glslc {
    program: String,
    options: CompileOptions,
}

impl Glslc {
    pub fn new(program: String, options: CompileOptions) -> Self {
        Self { program, options }
    }

    fn command(&self, request: &CompileRequest<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(request.source).arg("-o").arg(request.output);
        if let Some(env) = &self.options.target_env {
            command.arg(format!("--target-env={env}"));
        }
        if self.options.optimize {
            command.arg("-O");
        }
        for (name, value) in &self.options.defines {
            command.arg(format!("-D{name}={value}"));
        }
        command.args(&self.options.args);
        command
    }
}

impl ShaderCompiler for Glslc {
    fn name(&self) -> &str {
        &self.program
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileFailure> {
        let mut command = self.command(request);
        debug!(?command, "spawning compiler");
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| CompileFailure::new(format!("failed to run `{}`: {err}", self.program)))?;

        let stderr = child.stderr.take();
        let (sender, captured) = mpsc::channel();
        thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            let _ = sender.send(text);
        });

        let status = match self.options.timeout {
            None => child.wait().map(Some),
            Some(timeout) => wait_with_timeout(&mut child, timeout),
        };
        // The reader thread is detached if the pipe outlives the drain window.
        let diagnostics = match status {
            Ok(Some(_)) => captured.recv().unwrap_or_default(),
            _ => captured.recv_timeout(DRAIN_AFTER_KILL).unwrap_or_default(),
        };

        let status = match status {
            Ok(Some(status)) => status,
            Ok(None) => {
                let timeout = self.options.timeout.unwrap_or_default();
                return Err(CompileFailure::new(format!(
                    "compiler timed out after {}",
                    humantime::format_duration(timeout)
                )));
            }
            Err(err) => {
                return Err(CompileFailure::new(format!(
                    "failed to wait for `{}`: {err}",
                    self.program
                )))
            }
        };

        if status.success() {
            if !diagnostics.trim().is_empty() {
                warn!(source = %request.source.display(), "{}", diagnostics.trim());
            }
            Ok(())
        } else {
            Err(CompileFailure::new(failure_reason(&diagnostics, status)))
        }
    }
}

/// Polls the child until it exits or `timeout` elapses; a timed out child
/// is killed and reaped and `Ok(None)` is returned.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn failure_reason(diagnostics: &str, status: ExitStatus) -> String {
    let lines: Vec<&str> = diagnostics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return match status.code() {
            Some(code) => format!("compiler exited with status {code}"),
            None => "compiler terminated by signal".to_string(),
        };
    }
    let mut reason = lines
        .iter()
        .take(MAX_REASON_LINES)
        .copied()
        .collect::<Vec<_>>()
        .join("; ");
    if lines.len() > MAX_REASON_LINES {
        reason.push_str(&format!("; ... {} more", lines.len() - MAX_REASON_LINES));
    }
    reason
}

/// Parses a freshly written output and checks it declares the expected stage.
pub fn verify_output(request: &CompileRequest<'_>) -> Result<(), CompileFailure> {
    let module = Module::from_file(request.output)
        .map_err(|err| CompileFailure::new(format!("invalid SPIR-V output: {err}")))?;
    match module.stage() {
        Some(stage) if stage == request.stage => Ok(()),
        Some(stage) => Err(CompileFailure::new(format!(
            "output declares a {stage} entry point, expected {}",
            request.stage
        ))),
        None => Err(CompileFailure::new("output has no entry point")),
    }
}

/// `true` when `output` exists and is at least as new as `source`.
pub fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(source), Some(output)) => output >= source,
        _ => false,
    }
}

#[cfg(feature = "shaderc")]
mod shaderc_backend {
    use std::fs;

    use anyhow::Context;
    use spvreflect::ShaderStage;

    use super::{CompileFailure, CompileOptions, CompileRequest, ShaderCompiler};

    pub struct InProcess {
        compiler: shaderc::Compiler,
        options: CompileOptions,
    }

    impl InProcess {
        pub fn new(options: CompileOptions) -> anyhow::Result<Self> {
            let compiler = shaderc::Compiler::new().context("failed to initialise shaderc")?;
            Ok(Self { compiler, options })
        }

        fn compile_options(&self) -> Result<shaderc::CompileOptions<'static>, CompileFailure> {
            let mut options = shaderc::CompileOptions::new()
                .context("failed to create shaderc options")
                .map_err(|err| CompileFailure::new(err.to_string()))?;
            if let Some(env) = &self.options.target_env {
                let version = match env.as_str() {
                    "vulkan1.0" | "vulkan" => shaderc::EnvVersion::Vulkan1_0,
                    "vulkan1.1" => shaderc::EnvVersion::Vulkan1_1,
                    "vulkan1.2" => shaderc::EnvVersion::Vulkan1_2,
                    "vulkan1.3" => shaderc::EnvVersion::Vulkan1_3,
                    other => {
                        return Err(CompileFailure::new(format!(
                            "unsupported target environment '{other}' for shaderc"
                        )))
                    }
                };
                options.set_target_env(shaderc::TargetEnv::Vulkan, version as u32);
            }
            if self.options.optimize {
                options.set_optimization_level(shaderc::OptimizationLevel::Performance);
            }
            for (name, value) in &self.options.defines {
                options.add_macro_definition(name, Some(value.as_str()));
            }
            Ok(options)
        }
    }

    fn shader_kind(stage: ShaderStage) -> shaderc::ShaderKind {
        match stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::TessellationControl => shaderc::ShaderKind::TessControl,
            ShaderStage::TessellationEvaluation => shaderc::ShaderKind::TessEvaluation,
            ShaderStage::Geometry => shaderc::ShaderKind::Geometry,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Compute => shaderc::ShaderKind::Compute,
        }
    }

    impl ShaderCompiler for InProcess {
        fn name(&self) -> &str {
            "shaderc"
        }

        fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileFailure> {
            let source = fs::read_to_string(request.source).map_err(|err| {
                CompileFailure::new(format!("failed to read {}: {err}", request.source.display()))
            })?;
            let options = self.compile_options()?;
            let file_name = request.source.display().to_string();
            let artifact = self
                .compiler
                .compile_into_spirv(&source, shader_kind(request.stage), &file_name, "main", Some(&options))
                .map_err(|err| CompileFailure::new(err.to_string()))?;
            if artifact.get_num_warnings() > 0 {
                tracing::warn!(source = %file_name, "{}", artifact.get_warning_messages().trim());
            }
            fs::write(request.output, artifact.as_binary_u8()).map_err(|err| {
                CompileFailure::new(format!("failed to write {}: {err}", request.output.display()))
            })
        }
    }
}
