//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notesync")]
#[command(author, version, about = "Maintenance tools for a synced meeting-notes vault", long_about = None)]
pub struct Cli {
    /// Path to the vault (defaults to the current directory)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Sync configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with = "yaml")]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with = "json")]
    pub yaml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else {
            OutputFormat::Json
        }
    }

    /// Default log filter for the verbosity flags. `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize legacy metadata blocks in place
    Migrate(MigrateArgs),

    /// Print the identity index of synced files
    Index,

    /// Validate a filename pattern and show a sample resolution
    #[command(name = "check-pattern")]
    CheckPattern(CheckPatternArgs),
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct CheckPatternArgs {
    /// Pattern to validate, e.g. "{date} {title}" (defaults to the configured filename pattern)
    pub pattern: Option<String>,

    /// Title used for the sample resolution
    #[arg(long, default_value = "Weekly Sync")]
    pub title: String,

    /// Validate against date variables only (subfolder templates)
    #[arg(long)]
    pub subfolder: bool,
}
