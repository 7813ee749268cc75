mod cli;
mod codegen;
mod compile;
mod defaults;
mod discover;
mod inspect;
mod lint;
mod paths;
mod run;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use cli::{Command, InitArgs, WhereArgs};
use defaults::{install_sources, InitOptions};
use paths::BakePaths;

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Reflect(args)) => inspect::reflect(args),
        Some(Command::Check(args)) => inspect::check(args),
        Some(Command::Layout(args)) => inspect::layout(args),
        Some(Command::Lint(args)) => lint::lint(args),
        Some(Command::Codegen(args)) => codegen::codegen(args),
        Some(Command::Init(args)) => run_init(args),
        Some(Command::Where(args)) => run_where(args),
        None => run::run(cli.run),
    }
}

fn run_init(args: InitArgs) -> Result<ExitCode> {
    let report = install_sources(
        &args.dir,
        InitOptions {
            force: args.force,
            dry_run: args.dry_run,
        },
    )?;

    if report.installed.is_empty() {
        println!("All bundled shaders already present in {}.", args.dir.display());
    } else {
        if args.dry_run {
            println!("Dry-run: the following shaders would be written:");
        } else {
            println!("Installed bundled shaders:");
        }
        for entry in &report.installed {
            let action = if entry.replaced { "replaced" } else { "new" };
            println!(
                "  {:<9} {:<9} {action:<8} {}",
                entry.source.variant.name(),
                entry.source.stage.to_string(),
                entry.target.display()
            );
        }
    }
    for skipped in &report.skipped {
        println!("  skipped {} (exists; use --force to replace)", skipped.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_where(args: WhereArgs) -> Result<ExitCode> {
    let paths = BakePaths::discover()?;
    println!("Configuration directory:");
    println!("  {}", paths.config_dir().display());
    println!("Config layers (lowest precedence first):");
    let layers = paths.config_layers(&args.dir, None);
    for (label, layer) in ["user", "directory"].iter().zip(&layers) {
        println!("  {label:<10} {} ({})", layer.display(), presence(layer));
    }
    Ok(ExitCode::SUCCESS)
}

fn presence(path: &Path) -> &'static str {
    if path.is_file() {
        "present"
    } else {
        "missing"
    }
}
