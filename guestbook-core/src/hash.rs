//! Deterministic content addressing for partitions and entries.
//!
//! Both partition file names and entry ids are name-based UUIDs (v5, OID
//! namespace). The same seed always yields the same identifier, across
//! processes and restarts, so no separate name-to-partition index is needed.

use chrono::{DateTime, SecondsFormat, Utc};
use guestbook_types::EntryId;
use uuid::Uuid;

/// Extension of partition files inside the data directory.
pub const PARTITION_EXTENSION: &str = "db";

/// Stable identifier for an arbitrary byte seed.
pub fn hash_seed(seed: &[u8]) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed)
}

/// File name of the partition holding `site`'s entries.
pub fn partition_file_name(site: &str) -> String {
    format!("{}.{}", hash_seed(site.as_bytes()), PARTITION_EXTENSION)
}

/// Time-salted id of an entry: resubmitting the same message from the same
/// address at another instant yields a different id.
pub fn entry_id(created: DateTime<Utc>, message: &str, origin_ip: &str) -> EntryId {
    let mut seed = created.to_rfc3339_opts(SecondsFormat::Micros, true);
    seed.push_str(message);
    seed.push_str(origin_ip);
    EntryId::new(hash_seed(seed.as_bytes()).to_string())
}
