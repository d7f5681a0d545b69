//! bluelist - headless Bluetooth device list
//!
//! Loads configuration, drives the synchronization engine from a replay
//! script and prints the resulting list.

mod replay;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use bluelist_core::{Config, logging};

use crate::replay::{Replay, parse_script};

/// bluelist - mirror a Bluetooth device registry into an ordered list
#[derive(Parser, Debug)]
#[command(name = "bluelist", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (uses XDG lookup if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print example configuration and exit
    #[arg(long)]
    print_example_config: bool,

    /// Validate configuration and exit (returns non-zero on errors)
    #[arg(long)]
    check_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON Lines event script and print the final device list
    Replay {
        /// Script file, or `-` for stdin
        script: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(args.verbose);

    if args.print_example_config {
        print!("{}", bluelist_core::config::DEFAULT_CONFIG_TOML);
        return ExitCode::SUCCESS;
    }

    // If --config is specified, it must exist and be valid (no fallback)
    let load_result = match Config::find_and_load(args.config.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref source) = load_result.source {
        info!("Loaded configuration from {:?}", source);
    } else if load_result.used_defaults {
        warn!("Using default configuration (no config file found)");
    }

    let config = load_result.config;

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    debug!("Configuration validated successfully");

    if args.check_config {
        if let Some(ref source) = load_result.source {
            println!("Configuration valid: {}", source.display());
        } else {
            println!("Configuration valid (using defaults)");
        }
        return ExitCode::SUCCESS;
    }

    match args.command {
        Some(Command::Replay { script }) => match run_replay(config, &script) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        None => {
            println!("{}", config.summary());
            ExitCode::SUCCESS
        }
    }
}

fn run_replay(config: Config, script: &Path) -> Result<()> {
    let text = read_script(script)?;
    let steps = parse_script(&text)?;
    info!("Replaying {} step(s) from {}", steps.len(), script.display());

    let mut replay = Replay::new(config);
    replay.run(steps)?;
    let model = replay.finish()?;

    print!("{}", model.render());
    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read script from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))
}
