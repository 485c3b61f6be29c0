//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Continuum: autonomous continuation engine for iterative AI result
/// refinement.
#[derive(Debug, Parser)]
#[command(name = "continuum", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a default configuration to .continuum/config.yaml.
    Init(commands::init::InitArgs),
    /// Run a continuation session over an initial result.
    Run(commands::run::RunArgs),
}

/// Report a fatal error and exit non-zero.
pub fn handle_error(error: &anyhow::Error, json: bool) -> ! {
    if json {
        let payload = serde_json::json!({ "error": format!("{error:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("{} {error:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
