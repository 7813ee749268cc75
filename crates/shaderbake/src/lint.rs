use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bakeconfig::KNOWN_EXTENSIONS;
use shaderabi::{lint_source, ShaderVariant};
use tracing::debug;

use crate::cli::LintArgs;
use crate::discover::{find_sources, ScanOptions};

pub fn lint(args: LintArgs) -> Result<ExitCode> {
    let extensions: Vec<String> = KNOWN_EXTENSIONS.iter().map(|ext| ext.to_string()).collect();
    let sources = find_sources(
        &args.dir,
        &ScanOptions {
            extensions: &extensions,
            recursive: args.recursive,
            exclude: None,
        },
    )?;

    let mut linted = 0usize;
    let mut findings = 0usize;
    for source in &sources {
        let variant = args.variant.or_else(|| {
            source
                .path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(ShaderVariant::from_file_name)
        });
        let Some(variant) = variant else {
            debug!(path = %source.path.display(), "no shader variant for source; skipping lint");
            continue;
        };

        let text = fs::read_to_string(&source.path)
            .with_context(|| format!("failed to read {}", source.path.display()))?;
        linted += 1;
        for finding in lint_source(variant, source.stage, &text) {
            findings += 1;
            match finding.line {
                Some(line) => println!("{}:{line}: {}", source.path.display(), finding.issue),
                None => println!("{}: {}", source.path.display(), finding.issue),
            }
        }
    }

    println!("Linted {linted} file(s), {findings} finding(s)");
    Ok(if findings == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
