//! ChainWatch daemon. Watches Ethereum addresses and serves their
//! transactions over HTTP.
//!
//! # Commands
//! ```text
//! chainwatch [run]  --rpc-url <url> --listen <addr> --poll-interval-ms <ms>
//! chainwatch info
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chainwatch_core::{ChainWatch, LedgerSource, WatchConfig, WatchConfigBuilder};
use chainwatch_rpc::{EthLedgerSource, HttpClientConfig, HttpRpcClient};

mod logging;

use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "chainwatch",
    about = "Watch Ethereum addresses and query their transactions over HTTP",
    long_about = "
ChainWatch polls an Ethereum JSON-RPC node for new blocks, records every
transaction that touches a subscribed address and serves them over HTTP.

ENVIRONMENT VARIABLES:
  CHAINWATCH_CONFIG              Path to a JSON config file
  CHAINWATCH_RPC_URL             JSON-RPC endpoint
  CHAINWATCH_LISTEN              HTTP listen address
  CHAINWATCH_POLL_INTERVAL_MS    Chain head polling interval
  CHAINWATCH_REQUEST_TIMEOUT_MS  Per-request RPC timeout
  CHAINWATCH_MAX_RETRIES         Retries for transient RPC failures
  CHAINWATCH_LOG_LEVEL           Log level (RUST_LOG overrides)
",
    version
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling and serve the HTTP API (default)
    Run,
    /// Print the effective configuration and exit
    Info,
}

/// Flags and environment values. Each one overrides the config file.
#[derive(Args, Default)]
struct Overrides {
    /// JSON config file
    #[arg(short, long, global = true, env = "CHAINWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "CHAINWATCH_RPC_URL")]
    rpc_url: Option<String>,

    /// HTTP listen address, e.g. 0.0.0.0:8080
    #[arg(long, global = true, env = "CHAINWATCH_LISTEN")]
    listen: Option<String>,

    #[arg(long, global = true, env = "CHAINWATCH_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    #[arg(long, global = true, env = "CHAINWATCH_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    #[arg(long, global = true, env = "CHAINWATCH_MAX_RETRIES")]
    max_retries: Option<u32>,

    #[arg(long, global = true, env = "CHAINWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    log_json: bool,
}

/// On-disk configuration: watch settings at the top level plus a `log`
/// section.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    watch: WatchConfig,
    #[serde(default)]
    log: LogConfig,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }
}

/// Merge the config file (if any) with flag/env overrides.
fn resolve(overrides: &Overrides) -> Result<FileConfig> {
    let file = match &overrides.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    Ok(apply(file, overrides))
}

fn apply(file: FileConfig, overrides: &Overrides) -> FileConfig {
    let mut builder = WatchConfigBuilder::from_config(file.watch);
    if let Some(url) = &overrides.rpc_url {
        builder = builder.rpc_url(url);
    }
    if let Some(addr) = &overrides.listen {
        builder = builder.listen_addr(addr);
    }
    if let Some(ms) = overrides.poll_interval_ms {
        builder = builder.poll_interval_ms(ms);
    }
    if let Some(ms) = overrides.request_timeout_ms {
        builder = builder.request_timeout_ms(ms);
    }
    if let Some(n) = overrides.max_retries {
        builder = builder.max_retries(n);
    }

    let mut log = file.log;
    if let Some(level) = &overrides.log_level {
        log.level = level.clone();
    }
    log.json |= overrides.log_json;

    FileConfig {
        watch: builder.build(),
        log,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve(&cli.overrides)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing(&config.log);
            cmd_run(config.watch).await
        }
        Commands::Info => cmd_info(&config),
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_run(config: WatchConfig) -> Result<()> {
    let client = HttpRpcClient::new(config.rpc_url.clone(), HttpClientConfig::from(&config))
        .context("failed to build RPC client")?;
    let source: Arc<dyn LedgerSource> = Arc::new(EthLedgerSource::new(client));

    tracing::info!(
        rpc_url = %config.rpc_url,
        poll_interval_ms = config.poll_interval_ms,
        "Starting ChainWatch"
    );
    let watch = ChainWatch::start(source, &config)
        .await
        .context("failed to fetch the initial block height")?;

    let served = chainwatch_http::serve(&config.listen_addr, watch.facade(), shutdown_signal())
        .await
        .with_context(|| format!("HTTP server on {} failed", config.listen_addr));

    watch.shutdown().await;
    served
}

fn cmd_info(config: &FileConfig) -> Result<()> {
    println!("ChainWatch v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Effective configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
