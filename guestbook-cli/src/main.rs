//! # guestbook CLI
//!
//! Command-line interface for the guestbook service: run the HTTP server and
//! manage sites and entries directly on disk.

mod commands;

use clap::{Parser, Subcommand};
use guestbook_server::cli::ServeArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guestbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "GUESTBOOK_CONFIG", default_value = "guestbook.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    overrides: ServeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,

    /// Manage the site registry
    Sites {
        #[command(subcommand)]
        command: SitesCommands,
    },

    /// Import a JSON array of entries into a site, bypassing moderation
    Import {
        /// Registered site name
        site: String,

        /// JSON file holding an array of entries
        file: PathBuf,
    },

    /// Print one page of a site's guestbook
    Entries {
        /// Registered site name
        site: String,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SitesCommands {
    /// Register a site
    Add {
        /// Site name
        name: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List registered sites
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine readable.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = commands::load_config(&cli.config, &cli.overrides)?;

    match cli.command {
        Commands::Serve => guestbook_server::run(config).await,
        Commands::Sites { command } => match command {
            SitesCommands::Add { name, json } => commands::add_site(&config, &name, json),
            SitesCommands::List { json } => commands::list_sites(&config, json),
        },
        Commands::Import { site, file } => commands::import_entries(&config, &site, &file),
        Commands::Entries { site, page, json } => {
            commands::show_entries(&config, &site, page, json)
        }
    }
}
