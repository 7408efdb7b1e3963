//! Library entrypoint for guestbook-server so other binaries (the guestbook
//! CLI) can reuse the server without shelling out.

pub mod cli;
pub mod config;
pub mod error;
pub mod server;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

pub use crate::server::{router, AppState};

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))?;
    Ok(())
}

/// Run the guestbook service using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: cli::Cli) -> Result<()> {
    init_tracing(cli.verbose)?;

    let cfg = ServerConfig::from_cli(&cli)?;
    server::serve(cfg).await
}

/// Run the service with an already-resolved configuration. The caller owns
/// tracing setup.
pub async fn run(cfg: ServerConfig) -> Result<()> {
    server::serve(cfg).await
}
