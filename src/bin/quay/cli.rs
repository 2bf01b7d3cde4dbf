//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Quay - infers TypeScript build targets and their dependencies
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Explain how every import resolving to this dependency was resolved,
    /// or why an unresolved import with this path was dropped
    #[arg(
        long,
        global = true,
        env = quay::resolver::EXPLAIN_DEPENDENCY_ENV,
        value_name = "LABEL"
    )]
    pub explain_dependency: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate targets and resolve their dependencies
    Generate(GenerateArgs),

    /// Print the logical import path of an import
    Normalize(NormalizeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Directory to generate (defaults to the whole workspace)
    pub path: Option<PathBuf>,

    /// Print the generated targets as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Package of the importing file (`""` for the workspace root)
    pub package: String,

    /// Importing file, relative to the package
    pub source: String,

    /// Import path as written
    pub import: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
