//! CLI entry point: parse arguments, load configuration, drive the
//! pipeline engine for one run.

use clap::Parser;
use colored::Colorize;
use runqc_core::config::loader::{load_config, resolve_tools};
use runqc_core::engine::PipelineEngine;
use runqc_core::run::{Run, SequencerKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Generate a PDF report with quality-check analysis for a sequencing run.
#[derive(Parser, Debug)]
#[command(name = "runqc", version, about)]
struct Args {
    /// Path of the run directory
    #[arg(short = 'p', long)]
    run_path: PathBuf,

    /// Sequencer name
    #[arg(short = 's', long, value_parser = parse_sequencer)]
    sequencer: SequencerKind,

    /// Name of the run (defaults to the run directory name)
    #[arg(short = 'r', long)]
    run_name: Option<String>,

    /// Configuration file
    #[arg(short = 'c', long, default_value = "config.toml")]
    config: PathBuf,
}

fn parse_sequencer(raw: &str) -> Result<SequencerKind, String> {
    raw.parse().map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    resolve_tools(&mut config)?;

    let run = Run::new(args.run_path, args.sequencer, args.run_name);
    tracing::info!(run = run.name(), sequencer = %run.sequencer(), "processing run");
    let engine = PipelineEngine::new(config);

    match engine.run(&run).await {
        Ok(()) => {
            println!(
                "{} reports generated for run {}",
                "done:".green().bold(),
                run.name()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
