//! DeltaSync CLI - Command-line interface for the DeltaSync client
//!
//! Provides commands for:
//! - Inspecting persisted folder and message caches
//! - Resetting sync state so the next sync starts from scratch
//! - Viewing and managing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deltasync_core::config::{Config, LoggingConfig};

mod commands;
mod output;

use commands::{cache::CacheCommand, config::ConfigCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "deltasync", version, about = "DeltaSync mailbox sync client")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and reset the persisted sync cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Installs the global subscriber; logs go to stderr so `--json` output
/// on stdout stays parseable
fn init_tracing(verbose: u8, logging: &LoggingConfig) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    init_tracing(cli.verbose, &config.logging);

    let format = OutputFormat::from_flag(cli.json);

    match &cli.command {
        Commands::Cache(cmd) => cmd.execute(&config, format),
        Commands::Config(cmd) => cmd.execute(&config_path, format),
    }
}
