// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use quadcam::pipelines::SelectionStrategy;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

#[derive(Parser)]
#[command(name = "quadcam")]
#[command(about = "Find a square target in a live camera feed and rectify it to 28x28")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: cli::RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live detector (default)
    Run(cli::RunArgs),

    /// List available cameras
    List,

    /// Detect a target in a still image and print a JSON report
    Detect {
        /// Image file to process
        image: PathBuf,

        /// Which quadrilateral to keep when several qualify
        #[arg(long, value_enum, default_value_t = SelectionStrategy::FirstMatch)]
        selection: SelectionStrategy,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=quadcam=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run(args)) => cli::run(&args),
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Detect { image, selection }) => cli::detect_image(&image, selection),
        None => cli::run(&cli.run),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
