use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "shaderbake.toml";
pub const CURRENT_VERSION: u32 = 1;

/// Stage extensions understood by glslc's file-name stage inference.
pub const KNOWN_EXTENSIONS: &[&str] = &["vert", "frag", "comp", "geom", "tesc", "tese"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerBackend {
    /// Spawn the `glslc` executable once per source.
    #[default]
    Glslc,
    /// Compile in-process through the shaderc library.
    Shaderc,
}

impl CompilerBackend {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "glslc" => Ok(Self::Glslc),
            "shaderc" => Ok(Self::Shaderc),
            other => Err(format!("unknown compiler backend '{other}'; expected glslc or shaderc")),
        }
    }
}

impl fmt::Display for CompilerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Glslc => "glslc",
            Self::Shaderc => "shaderc",
        })
    }
}

/// Fully resolved settings for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakeConfig {
    pub version: u32,
    /// Relative paths are resolved against the source directory.
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub verify: bool,
    pub compiler: CompilerConfig,
    pub defines: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilerConfig {
    pub backend: CompilerBackend,
    pub program: String,
    pub target_env: Option<String>,
    pub optimize: bool,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            backend: CompilerBackend::Glslc,
            program: "glslc".to_string(),
            target_env: None,
            optimize: false,
            args: Vec::new(),
            timeout: None,
        }
    }
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            output_dir: PathBuf::from("compiled"),
            extensions: KNOWN_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            recursive: false,
            verify: true,
            compiler: CompilerConfig::default(),
            defines: BTreeMap::new(),
        }
    }
}

/// One configuration file as written; absent keys leave lower layers alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub version: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub recursive: Option<bool>,
    pub verify: Option<bool>,
    #[serde(default)]
    pub compiler: CompilerLayer,
    #[serde(default, deserialize_with = "deserialize_defines")]
    pub defines: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerLayer {
    pub backend: Option<CompilerBackend>,
    pub program: Option<String>,
    pub target_env: Option<String>,
    pub optimize: Option<bool>,
    pub args: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub timeout: Option<Duration>,
}

impl ConfigLayer {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Accepts define values as strings, integers, floats or booleans.
fn deserialize_defines<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Str(s) => s,
                Value::Int(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Bool(b) => u8::from(b).to_string(),
            };
            (name, value)
        })
        .collect())
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl BakeConfig {
    /// Parses a single file on top of the built-in defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(ConfigLayer::from_toml_str(input)?);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(ConfigLayer::load(path)?);
        config.validate()?;
        Ok(config)
    }

    /// Applies each existing file in `paths` in order, later files winning.
    /// Missing files are skipped.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            debug!(path = %path.display(), "applying config layer");
            config.apply(ConfigLayer::load(path)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(version) = layer.version {
            self.version = version;
        }
        if let Some(output_dir) = layer.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(extensions) = layer.extensions {
            self.extensions = extensions;
        }
        if let Some(recursive) = layer.recursive {
            self.recursive = recursive;
        }
        if let Some(verify) = layer.verify {
            self.verify = verify;
        }
        let compiler = layer.compiler;
        if let Some(backend) = compiler.backend {
            self.compiler.backend = backend;
        }
        if let Some(program) = compiler.program {
            self.compiler.program = program;
        }
        if compiler.target_env.is_some() {
            self.compiler.target_env = compiler.target_env;
        }
        if let Some(optimize) = compiler.optimize {
            self.compiler.optimize = optimize;
        }
        if let Some(args) = compiler.args {
            self.compiler.args = args;
        }
        if compiler.timeout.is_some() {
            self.compiler.timeout = compiler.timeout;
        }
        self.defines.extend(layer.defines);
    }

    /// Output directory resolved against `source_dir`.
    pub fn output_dir_for(&self, source_dir: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            source_dir.join(&self.output_dir)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CURRENT_VERSION}",
                self.version
            )));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions must list at least one shader extension".into(),
            ));
        }
        for ext in &self.extensions {
            if ext.starts_with('.') {
                return Err(ConfigError::Invalid(format!(
                    "extension '{ext}' must not start with a dot"
                )));
            }
            if !KNOWN_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)) {
                return Err(ConfigError::Invalid(format!(
                    "extension '{ext}' is not a shader stage; expected one of {}",
                    KNOWN_EXTENSIONS.join(", ")
                )));
            }
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_dir may not be empty".into()));
        }

        if self.compiler.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "compiler.program may not be empty".into(),
            ));
        }

        if let Some(timeout) = self.compiler.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::Invalid(
                    "compiler.timeout must be greater than zero".into(),
                ));
            }
        }

        if let Some(env) = &self.compiler.target_env {
            if env.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "compiler.target_env may not be empty".into(),
                ));
            }
        }

        for name in self.defines.keys() {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "define '{name}' is not a valid preprocessor identifier"
                )));
            }
        }

        Ok(())
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
