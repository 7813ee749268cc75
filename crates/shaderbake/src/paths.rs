use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use bakeconfig::CONFIG_FILE_NAME;
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SHADERBAKE_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shaderbake";
const APPLICATION: &str = "shaderbake";

#[derive(Debug, Clone)]
pub struct BakePaths {
    config_dir: PathBuf,
}

impl BakePaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn for_config_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn user_config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Config files in increasing precedence: user level, the source
    /// directory's own file, then an explicit `--config`.
    pub fn config_layers(&self, source_dir: &Path, explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut layers = vec![self.user_config_file(), source_dir.join(CONFIG_FILE_NAME)];
        if let Some(explicit) = explicit {
            layers.push(explicit.to_path_buf());
        }
        layers
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
