//! Fluentgen command-line tool
//!
//! Builds fluent wrapper artifacts from a descriptor manifest and inspects
//! or verifies existing artifacts.

mod commands;
mod manifest;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fluentgen")]
#[command(about = "Synthesize fluent wrapper types from type descriptors", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Color output: auto, always, never
    #[arg(long, global = true, value_name = "WHEN")]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an artifact from a descriptor manifest
    Build(commands::build::BuildArgs),

    /// Print the declarations and disassembled bodies of an artifact
    Inspect {
        /// Artifact file
        artifact: PathBuf,
    },

    /// Decode and verify an artifact
    Verify {
        /// Artifact file
        artifact: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FLUENTGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let color = output::resolve_color_choice(cli.color.as_deref());

    let result = match cli.command {
        Commands::Build(args) => commands::build::execute(args, color),
        Commands::Inspect { artifact } => commands::inspect::execute(&artifact),
        Commands::Verify { artifact } => commands::verify::execute(&artifact, color),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::StyledOutput::new(color).stderr_error(&format!("error: {:#}\n", err));
            ExitCode::FAILURE
        }
    }
}
