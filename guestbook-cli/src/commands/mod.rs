//! CLI command implementations.

pub mod entries;
pub mod import;
pub mod sites;

use anyhow::{bail, Result};
use guestbook_core::{SiteRegistry, YamlSiteRegistry};
use guestbook_server::{cli::ServeArgs, config::ServerConfig};
use std::path::Path;

pub use entries::show_entries;
pub use import::import_entries;
pub use sites::{add_site, list_sites};

/// Resolve the same configuration the server would run with.
pub fn load_config(config_path: &Path, overrides: &ServeArgs) -> Result<ServerConfig> {
    ServerConfig::from_parts(config_path, overrides)
}

pub(crate) fn registry(config: &ServerConfig) -> YamlSiteRegistry {
    YamlSiteRegistry::new(config.sites_path())
}

/// Refuse to touch a partition for a site nobody registered.
pub(crate) fn require_site(config: &ServerConfig, site: &str) -> Result<()> {
    if !registry(config).exists(site) {
        bail!("{}: {}", guestbook_core::pipeline::SITE_NOT_FOUND, site);
    }
    Ok(())
}
