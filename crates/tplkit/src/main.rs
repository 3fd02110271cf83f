//! tplkit CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::TplkitConfig;

#[derive(Parser)]
#[command(name = "tplkit")]
#[command(version)]
#[command(about = "Template dependency analysis and content conversion", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the partial dependency graph of a layouts directory
    Deps {
        /// Layouts directory; template names are paths relative to it
        dir: PathBuf,

        /// Print the graph as JSON
        #[arg(long)]
        json: bool,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Convert a content file to HTML with pandoc
    Convert {
        /// Input file
        input: PathBuf,

        /// Path to the pandoc binary (defaults to $TPLKIT_PANDOC, then PATH)
        #[arg(long)]
        pandoc: Option<PathBuf>,

        /// Write output to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "tplkit=debug,tplkit_transform=debug,tplkit_pandoc=debug"
    } else {
        "tplkit=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Deps { dir, json, config } => {
            let config = TplkitConfig::load(config.as_deref())?;
            commands::deps::execute(&dir, json, config.transform)
        }
        Commands::Convert {
            input,
            pandoc,
            output,
            config,
        } => {
            let mut config = TplkitConfig::load(config.as_deref())?;
            if pandoc.is_some() {
                config.pandoc.binary = pandoc;
            }
            commands::convert::execute(&input, output.as_deref(), config.pandoc)
        }
    }
}
