use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use guestbook_core::GuestbookConfig;

use crate::cli::{Cli, ServeArgs};

/// Runtime configuration derived from the config file plus CLI/env overrides.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub data_dir: PathBuf,
    pub guestbook: GuestbookConfig,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::from_parts(&cli.config, &cli.serve)
    }

    pub fn from_parts(config_path: &Path, args: &ServeArgs) -> Result<Self> {
        let mut guestbook = GuestbookConfig::load_or_default(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;

        if let Some(addr) = &args.listen_addr {
            guestbook.listen_addr = addr.clone();
        }
        if let Some(page_size) = args.page_size {
            guestbook.page_size = page_size;
        }
        if let Some(minutes) = args.cooldown_minutes {
            guestbook.cooldown_minutes = minutes;
        }
        if let Some(max) = args.max_message_length {
            guestbook.max_message_length = max;
        }
        guestbook.validate()?;

        // CLI paths are relative to the working directory, file paths to the file.
        let data_dir = match &args.data_dir {
            Some(dir) if dir.is_relative() => std::env::current_dir()?.join(dir),
            Some(dir) => dir.clone(),
            None => guestbook.data_dir(),
        };

        Ok(Self {
            listen_addr: guestbook.listen_addr.clone(),
            data_dir,
            guestbook,
        })
    }

    /// Location of the durable site list.
    pub fn sites_path(&self) -> PathBuf {
        self.data_dir.join("sites.yaml")
    }
}
