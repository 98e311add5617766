mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memory_mcp::{config, server};

#[derive(Parser)]
#[command(name = "memory-mcp", version, about = "Shared namespaced memory server for AI agents")]
struct Cli {
    /// Path to config.toml (defaults to ~/.memory-mcp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server on stdio
    Serve,
    /// Show store counts, recent requests and recent memories
    Stats {
        /// Number of recent requests and memories to list
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Delete expired short-term memories once and exit
    Sweep,
}

/// Grace period for blocking-pool work once the command has returned.
///
/// The stdin reader parks a blocking thread that only wakes on input or EOF, so
/// the runtime is shut down with a timeout instead of being dropped.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::MemoryConfig::load_from(path)?,
        None => config::MemoryConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let result = runtime.block_on(async {
        match cli.command {
            Command::Serve => server::serve_stdio(config).await,
            Command::Stats { limit } => cli::stats(&config, limit),
            Command::Sweep => cli::sweep(&config),
        }
    });

    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}
