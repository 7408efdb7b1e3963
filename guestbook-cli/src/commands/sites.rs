//! Site registry commands.

use anyhow::{Context, Result};
use guestbook_core::{Site, SiteRegistry};
use guestbook_server::config::ServerConfig;

use super::registry;

pub fn add_site(config: &ServerConfig, name: &str, json: bool) -> Result<()> {
    let registry = registry(config);
    let site = registry
        .add(Site::new(name))
        .with_context(|| format!("failed to register site {name}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&site)?);
    } else {
        println!("Registered site {}", site.name);
    }
    Ok(())
}

pub fn list_sites(config: &ServerConfig, json: bool) -> Result<()> {
    let sites = registry(config)
        .list()
        .context("failed to read site registry")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sites)?);
    } else if sites.is_empty() {
        println!("No sites registered");
    } else {
        for site in &sites {
            println!("- {}", site.name);
        }
    }
    Ok(())
}
