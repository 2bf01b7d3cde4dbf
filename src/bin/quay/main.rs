//! Quay CLI - infers TypeScript build targets and their dependencies

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use quay::core::DirectiveError;

fn main() {
    if let Err(e) = run() {
        match e.downcast::<DirectiveError>() {
            Ok(directive) => eprintln!("{:?}", miette::Report::new(directive)),
            Err(e) => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &cli.global),
        Commands::Normalize(args) => commands::normalize::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
