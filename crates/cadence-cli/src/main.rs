//! Cadence CLI - Command-line interface for the Cadence game loop

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, demo};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Fixed-timestep game loop with scenes and scheduled callbacks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the headless two-scene demo
    Demo {
        /// Loop configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// How long to run, in seconds
        #[arg(long, default_value_t = 8)]
        seconds: u64,

        /// Log filter (e.g. "debug", "cadence_runtime=debug")
        #[arg(long)]
        log: Option<String>,
    },

    /// Print or write the default loop configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            config,
            seconds,
            log,
        } => demo::run(demo::DemoArgs {
            config,
            seconds,
            log,
        }),
        Commands::Config { output } => config::run(output.as_deref()),
    }
}
