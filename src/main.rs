//! Mini File Cache - command line maintenance tool
//!
//! Inspects and maintains a cache directory: read and write string entries,
//! purge expired or all entries, or run the periodic TTL sweeper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_filecache::{spawn_cleanup_task, Config, FileCache};

/// Mini File Cache - disk-backed key/value cache with TTL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache directory (overrides CACHE_DIR)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a string value
    Set {
        key: String,
        value: String,
        /// Time to live in seconds
        #[arg(long, default_value = "3600")]
        ttl_secs: u64,
    },
    /// Print the string value stored under a key
    Get { key: String },
    /// Delete a key
    Remove { key: String },
    /// Print the number of live entries
    Size,
    /// Delete all expired entries
    Clean,
    /// Delete every entry
    Clear,
    /// Periodically delete expired entries until interrupted
    Sweep {
        /// Seconds between sweeps (overrides CLEANUP_INTERVAL)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_filecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(dir) = args.dir {
        config.cache_dir = dir;
    }

    let cache = FileCache::open(&config.cache_dir, config.cache_options())
        .with_context(|| format!("failed to open cache at {}", config.cache_dir.display()))?;

    match args.command {
        Command::Set {
            key,
            value,
            ttl_secs,
        } => {
            cache
                .set(&key, &value, Duration::from_secs(ttl_secs))
                .with_context(|| format!("failed to set {key:?}"))?;
        }
        Command::Get { key } => {
            match cache
                .get::<String>(&key)
                .with_context(|| format!("failed to read {key:?}"))?
            {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("key {key:?} not found"),
            }
        }
        Command::Remove { key } => cache.remove(&key)?,
        Command::Size => println!("{}", cache.size()),
        Command::Clean => {
            let removed = cache.clean_expired()?;
            println!("{removed}");
        }
        Command::Clear => cache.clear()?,
        Command::Sweep { interval } => {
            let interval = interval.unwrap_or(config.cleanup_interval);
            let cache = Arc::new(cache);
            let handle = spawn_cleanup_task(cache.clone(), interval);

            shutdown_signal().await;
            handle.abort();
            warn!("Cleanup task aborted");

            let stats = cache.stats();
            info!(
                "Sweeper stopped: entries={}, expired={}",
                stats.total_entries, stats.expired
            );
        }
    }

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
