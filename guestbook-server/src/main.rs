//! guestbook-server: per-site moderated guestbook over HTTP.

use anyhow::Result;
use clap::Parser;
use guestbook_server::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    guestbook_server::run_with_cli(cli).await
}
