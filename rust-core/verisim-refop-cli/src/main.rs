// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! refop: command-line front end for the VeriSim redundant file store.
//!
//! Stores, reads and removes one value kept as a primary and a backup
//! generation. The process exit code is the numeric `RefopStatus`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use verisim_refop::{Refop, RefopConfig, RefopError, RefopStatus};

/// Version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// refop: redundant two-generation file store.
#[derive(Parser, Debug)]
#[command(name = "refop", version = VERSION, about = "Crash-safe redundant file store")]
struct Cli {
    /// Directory holding the generation files.
    #[arg(long, global = true, default_value = "/tmp/refop-test/")]
    dir: PathBuf,

    /// Base file name of the stored value.
    #[arg(long, global = true, default_value = "refop-example.bin")]
    name: String,

    /// Maximum payload size in bytes. Overrides `--config`.
    #[arg(long, global = true)]
    size_limit: Option<u64>,

    /// JSON file with a store configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a new value.
    Set(SetArgs),
    /// Print the latest valid value.
    Get {
        /// Write the value to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete every generation of the value.
    Remove,
    /// Show which generation files exist.
    Status,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Read the value from this file.
    #[arg(long, conflicts_with = "data", required_unless_present = "data")]
    file: Option<PathBuf>,

    /// Use this string as the value.
    #[arg(long)]
    data: Option<String>,

    /// Create the store directory if it does not exist.
    #[arg(long)]
    create_dir: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("refop: {e:#}");
            status_of(&e)
        }
    };

    // Exit codes are a single byte, so negative codes wrap.
    ExitCode::from(status.code() as u8)
}

fn run(cli: Cli) -> anyhow::Result<RefopStatus> {
    let config = load_config(cli.config.as_deref(), cli.size_limit)?;

    if let Command::Set(SetArgs { create_dir: true, .. }) = &cli.command {
        fs::create_dir_all(&cli.dir)
            .with_context(|| format!("failed to create '{}'", cli.dir.display()))?;
    }

    let store = Refop::open(&cli.dir, &cli.name, config)?;

    match cli.command {
        Command::Set(args) => {
            let payload = read_payload(&args)?;
            store.set(&payload)?;
            info!(bytes = payload.len(), "Stored value");
            Ok(RefopStatus::Success)
        }
        Command::Get { out } => {
            let (value, recovered) = store.get_vec()?;
            match out {
                Some(path) => fs::write(&path, &value)
                    .with_context(|| format!("failed to write '{}'", path.display()))?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&value)?;
                    stdout.flush()?;
                }
            }
            if recovered {
                info!("Value recovered from backup generation");
                Ok(RefopStatus::Recovered)
            } else {
                Ok(RefopStatus::Success)
            }
        }
        Command::Remove => {
            store.remove()?;
            Ok(RefopStatus::Success)
        }
        Command::Status => {
            let state = store.inspect();
            let handle = store.handle();
            println!("primary  {:?}  {}", state.primary, handle.primary().display());
            println!("backup   {:?}  {}", state.backup, handle.backup().display());
            println!("staging  {:?}  {}", state.staging, handle.staging().display());
            Ok(RefopStatus::Success)
        }
    }
}

/// Build the store configuration from an optional JSON file and an optional
/// size limit override.
fn load_config(path: Option<&Path>, size_limit: Option<u64>) -> anyhow::Result<RefopConfig> {
    let mut config = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("invalid config '{}'", path.display()))?
        }
        None => RefopConfig::default(),
    };

    if let Some(limit) = size_limit {
        config = config.with_size_limit(limit);
    }
    if config.size_limit == 0 {
        bail!("size limit must be greater than zero");
    }

    Ok(config)
}

fn read_payload(args: &SetArgs) -> anyhow::Result<Vec<u8>> {
    match (&args.file, &args.data) {
        (Some(path), _) => {
            fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
        }
        (None, Some(data)) => Ok(data.as_bytes().to_vec()),
        (None, None) => bail!("either --file or --data is required"),
    }
}

/// Map an error back to the store status it carries.
fn status_of(error: &anyhow::Error) -> RefopStatus {
    match error.downcast_ref::<RefopError>() {
        Some(e) => e.status(),
        None => RefopStatus::SystemError,
    }
}
