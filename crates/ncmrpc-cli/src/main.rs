mod commands;
mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ncmrpc::{Config, default_config_path};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ncmrpc")]
#[command(about = "NetEase Cloud Music to Discord Rich Presence")]
#[command(version)]
struct Args {
    /// Config file (defaults to <config dir>/ncmrpc/config.toml)
    #[arg(short, long, env = "NCMRPC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synchronize playback to Discord until stopped (default)
    Run,
    /// Locate the client and sample it once
    Status {
        /// Also resolve the current track's metadata
        #[arg(long)]
        metadata: bool,
    },
    /// List supported client versions
    Versions,
    /// Manage code signatures for scanned releases
    Signatures {
        #[command(subcommand)]
        action: SignaturesAction,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum SignaturesAction {
    /// Write the built-in signatures as JSON
    Export {
        /// Output file
        path: PathBuf,
    },
    /// Print the signatures in use
    Show,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose {
        "ncmrpc=debug"
    } else {
        "ncmrpc=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => commands::run::run(config),
        Command::Status { metadata } => commands::status::run(&config, metadata),
        Command::Versions => commands::versions::run(&config),
        Command::Signatures { action } => match action {
            SignaturesAction::Export { path } => commands::signatures::export(&path),
            SignaturesAction::Show => commands::signatures::show(&config),
        },
        Command::Config { default } => commands::config::run(&config, default),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };

    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}
