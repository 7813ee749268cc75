use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shaderabi::sources::{BundledSource, BUNDLED};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct InstalledSource {
    pub source: BundledSource,
    pub target: PathBuf,
    pub replaced: bool,
}

#[derive(Debug, Default)]
pub struct InitReport {
    pub installed: Vec<InstalledSource>,
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    pub force: bool,
    pub dry_run: bool,
}

/// Writes the bundled GLSL sources into `dir`. Existing files are left alone
/// unless `force` is set.
pub fn install_sources(dir: &Path, options: InitOptions) -> Result<InitReport> {
    if !options.dry_run {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create shader directory {}", dir.display()))?;
    }

    let mut report = InitReport::default();
    for source in BUNDLED {
        let target = dir.join(source.file_name);
        let exists = target.exists();
        if exists && !options.force {
            debug!(target = %target.display(), "skipping bundled source; already present");
            report.skipped.push(target);
            continue;
        }

        if !options.dry_run {
            fs::write(&target, source.source)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(
                variant = %source.variant,
                stage = %source.stage,
                target = %target.display(),
                "installed bundled source"
            );
        }
        report.installed.push(InstalledSource {
            source,
            target,
            replaced: exists,
        });
    }
    Ok(report)
}
