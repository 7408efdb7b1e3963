//! Trusted bulk import, the offline counterpart of `/v1/fillup`.

use anyhow::{Context, Result};
use guestbook_core::{GuestbookEntry, PartitionResolver};
use guestbook_server::config::ServerConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::require_site;

/// Import every entry in `file` or none of them. Ids already stored are
/// skipped.
pub fn import_entries(config: &ServerConfig, site: &str, file: &Path) -> Result<()> {
    require_site(config, site)?;

    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let entries: Vec<GuestbookEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of entries", file.display()))?;

    let mut partition = PartitionResolver::new(config.data_dir.clone()).resolve(site)?;
    let report = partition
        .import(&entries)
        .with_context(|| format!("import aborted, nothing from {} was stored", file.display()))?;

    for id in &report.skipped {
        warn!(%site, %id, "entry already present, skipping");
    }
    info!(%site, imported = report.imported, skipped = report.skipped.len(), "import finished");
    println!(
        "Imported {} entries into {site} ({} skipped)",
        report.imported,
        report.skipped.len()
    );
    Ok(())
}
