use anyhow::{anyhow, Result};
use guestbook_core::{read_page, Pagination, PartitionResolver};
use guestbook_server::config::ServerConfig;

use super::require_site;

pub fn show_entries(config: &ServerConfig, site: &str, page: u64, json: bool) -> Result<()> {
    require_site(config, site)?;

    let pagination = Pagination::new(page, config.guestbook.page_size)
        .ok_or_else(|| anyhow!("page must be 1 or greater"))?;
    let partition = PartitionResolver::new(config.data_dir.clone()).resolve(site)?;
    let result = read_page(&partition, pagination)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{}: page {} of {} ({} entries)",
        site, result.page, result.pages, result.total
    );
    for entry in &result.messages {
        println!(
            "- [{}] {}: {}",
            entry.created.format("%Y-%m-%d %H:%M"),
            entry.nickname,
            entry.message
        );
    }
    Ok(())
}
