//! Continuum CLI entry point.

use clap::Parser;

use continuum::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => continuum::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => continuum::cli::commands::run::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
