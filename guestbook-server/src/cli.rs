use std::path::PathBuf;

use clap::{Args, Parser};

/// CLI for the guestbook HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "guestbook-server", about = "Per-site moderated guestbook HTTP service")]
pub struct Cli {
    /// Path to guestbook.yml (optional; defaults apply when missing)
    #[arg(long, env = "GUESTBOOK_CONFIG", default_value = "guestbook.yml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Settings that override the config file. Shared with `guestbook serve`.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Listen address for HTTP endpoints
    #[arg(long, env = "GUESTBOOK_ADDR")]
    pub listen_addr: Option<String>,

    /// Directory holding sites.yaml and one database file per site
    #[arg(long, env = "GUESTBOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Entries per page
    #[arg(long, env = "GUESTBOOK_PAGE_SIZE")]
    pub page_size: Option<u64>,

    /// Minutes a sender (user agent + IP) must wait between posts
    #[arg(long, env = "GUESTBOOK_COOLDOWN_MINUTES")]
    pub cooldown_minutes: Option<u64>,

    /// Messages this long or longer are rejected
    #[arg(long, env = "GUESTBOOK_MAX_MESSAGE_LENGTH")]
    pub max_message_length: Option<usize>,
}
