//! rvmesh CLI - converts binary RVM plant models to glTF binaries.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use rvmesh::{convert_file, ConvertOptions};

#[derive(Parser)]
#[command(name = "rvmesh")]
#[command(about = "Convert binary RVM plant models to per-color merged glTF", long_about = None)]
struct Cli {
    /// Input .rvm file
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the .glb files and the status file
    #[arg(short, long, default_value = "./exports/")]
    output: PathBuf,

    /// Group nesting depth at which each group becomes its own output file;
    /// 0 exports every top-level group
    #[arg(short, long, default_value_t = 0)]
    level: u32,

    /// Remove childless groups without geometry (1 = on, 0 = off)
    #[arg(short, long = "remove-empty", default_value_t = 1)]
    remove_empty: u8,

    /// Weld coincident vertices per group (1 = on, 0 = off)
    #[arg(short = 'd', long = "cleanup-position", default_value_t = 1)]
    cleanup_position: u8,

    /// Weld precision, decimal digits
    #[arg(short = 'p', long = "cleanup-precision", default_value_t = 3)]
    cleanup_precision: u8,

    /// Tessellation tolerance in world units
    #[arg(short, long, default_value_t = 0.01)]
    tolerance: f32,

    /// Target triangle ratio for mesh simplification; 0 disables it
    #[arg(long = "simplify-threshold", default_value_t = 0.0)]
    simplify_threshold: f32,

    /// Simplification error bound in world units; 0 means unbounded
    #[arg(long = "simplify-target-error", default_value_t = 0.0)]
    simplify_target_error: f32,

    /// Run the whole pipeline but write nothing
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let opts = ConvertOptions {
        output_dir: cli.output.clone(),
        export_level: cli.level,
        remove_empty: cli.remove_empty != 0,
        weld: cli.cleanup_position != 0,
        weld_precision: cli.cleanup_precision,
        tolerance: cli.tolerance,
        simplify_ratio: cli.simplify_threshold,
        simplify_target_error: cli.simplify_target_error,
        dry_run: cli.dry_run,
    };

    let report = convert_file(&cli.input, &opts)?;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if cli.dry_run {
        println!("Dry run: {} model(s) in {}", report.models.len(), cli.input.display());
    } else {
        println!(
            "Exported {} model(s) to {}",
            report.models.len(),
            cli.output.display()
        );
    }
    Ok(())
}
