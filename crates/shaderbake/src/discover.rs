use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use spvreflect::ShaderStage;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub path: PathBuf,
    /// Path below the scanned root; mirrored under the output directory.
    pub relative: PathBuf,
    pub stage: ShaderStage,
}

impl ShaderSource {
    /// `<out_dir>/<relative>.spv`, e.g. `compiled/lit.vert.spv`.
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        let mut name = OsString::from(self.relative.as_os_str());
        name.push(".spv");
        out_dir.join(name)
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions<'a> {
    pub extensions: &'a [String],
    pub recursive: bool,
    /// Directory never descended into, normally the output directory.
    pub exclude: Option<&'a Path>,
}

/// Lists shader sources under `root` sorted by relative path.
pub fn find_sources(root: &Path, options: &ScanOptions<'_>) -> Result<Vec<ShaderSource>> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    scan_dir(root, root, options, &mut visited, &mut found)?;
    found.sort_by(|a, b| a.relative.cmp(&b.relative));
    debug!(root = %root.display(), count = found.len(), "discovered shader sources");
    Ok(found)
}

fn scan_dir(
    root: &Path,
    dir: &Path,
    options: &ScanOptions<'_>,
    visited: &mut HashSet<PathBuf>,
    found: &mut Vec<ShaderSource>,
) -> Result<()> {
    // Symlinked directories can lead back to an ancestor.
    let canonical = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    if !visited.insert(canonical) {
        debug!(dir = %dir.display(), "skipping directory already scanned");
        return Ok(());
    }
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read shader directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", path.display()))?;

        if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
            if !options.recursive || is_hidden(&path) || options.exclude.is_some_and(|ex| same_dir(ex, &path)) {
                continue;
            }
            scan_dir(root, &path, options, visited, found)?;
            continue;
        }

        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if !options.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)) {
            continue;
        }
        let Some(stage) = ShaderStage::from_extension(ext) else {
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(path.as_path()).to_path_buf();
        found.push(ShaderSource {
            path,
            relative,
            stage,
        });
    }
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
