//! notesync CLI entry point.

use clap::Parser;
use notesync::cli::args::{Cli, Commands};
use notesync::cli::output::Output;
use notesync::cli::{index, migrate, pattern};
use notesync::config::SyncConfig;
use notesync::error::{ExitCode as SyncExitCode, SyncError};
use notesync::vault::Vault;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<SyncExitCode, SyncError> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };

    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Migrate(args) => {
            let mut vault = open_vault(cli)?;
            migrate::run(&mut vault, args.dry_run, &output)
        }
        Commands::Index => {
            let vault = open_vault(cli)?;
            index::run(&vault, &output)
        }
        Commands::CheckPattern(args) => {
            let pattern = args.pattern.as_deref().unwrap_or(&config.filename_pattern);
            pattern::run(pattern, &args.title, args.subfolder, &output)
        }
    }
}

fn open_vault(cli: &Cli) -> Result<Vault, SyncError> {
    let root = match &cli.vault {
        Some(path) => path.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    Vault::new(root)
}
