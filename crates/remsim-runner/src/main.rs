//! # remsim
//!
//! CLI frontend for radio environment map generation.

use clap::{Parser, Subcommand};
use remsim_channel::PropagationKind;
use remsim_runner::{load_scenario, run_scenario, RunnerError};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// CLI Configuration
// ============================================================================

/// remsim - Radio Environment Map Generator
#[derive(Parser, Debug)]
#[command(name = "remsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a map from a YAML scenario file
    Run(RunConfig),
    /// List all available propagation models with descriptions
    Models,
}

/// Configuration for a map build
#[derive(Parser, Debug)]
pub struct RunConfig {
    /// Path to the YAML scenario file
    pub scenario: PathBuf,

    /// Master seed for all random draws (same seed, same map)
    #[arg(short, long, default_value = "1")]
    pub seed: u64,

    /// Directory the output files are written into
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Verbose output (overrides RUST_LOG with debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();

    // RUST_LOG env filter, defaulting to "warn"; -v forces debug.
    let default_level = match &cli.command {
        Commands::Run(config) if config.verbose => "debug",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run(config) => {
            let scenario = load_scenario(&config.scenario)?;
            let stats = run_scenario(scenario, config.seed, &config.output_dir)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Models => {
            print_models_info();
        }
    }

    Ok(())
}

/// Print information about all available propagation models
fn print_models_info() {
    println!("remsim Available Propagation Models");
    println!("===================================\n");
    for kind in PropagationKind::ALL {
        println!("  {:16} {}", kind.name(), kind.description());
    }
    println!();
    println!("Select a model via the scenario file:");
    println!("  channel:");
    println!("    propagation: three-gpp-uma");
}
