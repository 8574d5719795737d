//! ontobridge
//!
//! Converts nested JSON records into statements with a mapping document and
//! keeps a remote triple-store in sync with them.
//!
//! Usage:
//!   ontobridge convert --mapping mapping.json --source data.json
//!   ontobridge sync --mapping mapping.json --source data.json --config ontobridge.toml
//!   ontobridge clear --config ontobridge.toml
//!
//! During a sync, Ctrl-C pauses at the next batch boundary and records a
//! checkpoint; a second Ctrl-C stops without one.

use std::{fs, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ontobridge_cli::{pipeline, AppConfig, SyncOptions};
use ontobridge_convert::UnmappedKeyPolicy;
use ontobridge_sync::{HttpStoreClient, SyncMode, SyncOutcome, SyncSignal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ontobridge")]
#[command(about = "Convert JSON records to statements and synchronize them with a triple-store")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the statements of every entity
    Convert {
        #[command(flatten)]
        input: InputArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert and synchronize with the remote store
    Sync {
        #[command(flatten)]
        input: InputArgs,

        /// Checkpoint file written on pause or abort
        #[arg(long, default_value = "checkpoint.txt")]
        checkpoint: PathBuf,

        /// Number of top-level entities already synchronized
        #[arg(long, default_value = "0")]
        begin_index: u64,

        /// Take the begin index from the checkpoint file
        #[arg(long, conflicts_with = "begin_index")]
        resume: bool,

        /// per-entity or batched
        #[arg(long)]
        mode: Option<SyncMode>,

        /// Store endpoint, overrides the config file
        #[arg(long)]
        endpoint: Option<String>,

        /// Store namespace, overrides the config file
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Delete every record of the configured namespace
    Clear {
        /// Path to the TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Store namespace, overrides the config file
        #[arg(long)]
        namespace: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Mapping document (JSON)
    #[arg(short, long)]
    mapping: PathBuf,

    /// Source records (JSON)
    #[arg(short, long)]
    source: PathBuf,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail on data keys without a mapping rule
    #[arg(long)]
    strict: bool,
}

impl InputArgs {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if self.strict {
            config.convert.unmapped_keys = UnmappedKeyPolicy::Fail;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = if args.verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match args.command {
        Command::Convert { input, output } => {
            let config = input.load_config()?;
            let spec = pipeline::load_mapping(&input.mapping)?;
            let source = pipeline::load_source(&input.source)?;
            let converter = pipeline::convert(&config, spec, &source)?;
            let text = pipeline::render(converter.cache());
            match output {
                Some(path) => fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{text}"),
            }
        }
        Command::Sync {
            input,
            checkpoint,
            begin_index,
            resume,
            mode,
            endpoint,
            namespace,
        } => {
            let mut config = input.load_config()?;
            if let Some(endpoint) = endpoint {
                config.store.endpoint = endpoint;
            }
            if let Some(namespace) = namespace {
                config.store.namespace = namespace;
            }

            let spec = pipeline::load_mapping(&input.mapping)?;
            let source = pipeline::load_source(&input.source)?;
            let converter = pipeline::convert(&config, spec, &source)?;
            let store = HttpStoreClient::new(config.store.clone()).context("invalid store configuration")?;

            let signal = SyncSignal::new();
            spawn_interrupt_handler(signal.clone());

            let options = SyncOptions {
                mode: mode.unwrap_or_default(),
                begin_index,
                resume,
                checkpoint,
            };
            let report =
                pipeline::sync_cache(&config, Arc::new(store), converter.cache(), &options, &signal).await?;
            match report.outcome {
                SyncOutcome::Completed => info!("Sync completed"),
                SyncOutcome::Paused { checkpoint } => {
                    info!("Sync paused, resume with --begin-index {} or --resume", checkpoint)
                }
                SyncOutcome::Stopped => warn!("Sync stopped"),
            }
        }
        Command::Clear { config, namespace } => {
            let mut config = AppConfig::load(config.as_deref())?;
            if let Some(namespace) = namespace {
                config.store.namespace = namespace;
            }
            let store = HttpStoreClient::new(config.store.clone()).context("invalid store configuration")?;
            let deleted = pipeline::clear(&config, Arc::new(store)).await?;
            info!("Deleted {} records", deleted);
        }
    }

    Ok(())
}

/// First Ctrl-C pauses at the next batch boundary, the second stops.
fn spawn_interrupt_handler(signal: SyncSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Pause requested, finishing the current batch (Ctrl-C again to stop)");
        signal.pause();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Stop requested");
        signal.stop();
    });
}
