//! Guestbook entry storage within a single partition.
//!
//! A [`Partition`] is one SQLite database holding one site's entries. It owns
//! its connection; dropping the partition closes it. No validation happens
//! here: admission is the pipeline's job, and the bulk-import path writes
//! entries verbatim.

// SQLite returns i64 for counts, but they're always non-negative.
#![allow(clippy::cast_sign_loss)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use guestbook_types::{EntryId, GuestbookEntry, GuestbookPage};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use thiserror::Error;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Per-connection settings applied on every open.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_ENTRY: &str = "SELECT id, created_ns, message, ip, user_agent, nickname FROM guestbook";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("an entry with id {0} already exists")]
    DuplicateId(String),

    #[error("timestamp {0} is outside the storable range")]
    TimestampOutOfRange(DateTime<Utc>),
}

/// Data-access contract for guestbook entries.
pub trait EntryStore {
    /// Persist an entry verbatim.
    fn insert(&self, entry: &GuestbookEntry) -> Result<(), StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    /// Entries newest first. An offset past the end yields an empty list.
    fn list(&self, offset: u64, limit: u64) -> Result<Vec<GuestbookEntry>, StoreError>;

    /// Most recent entry sent with exactly this user agent and origin IP.
    fn find_latest_by(
        &self,
        user_agent: &str,
        origin_ip: &str,
    ) -> Result<Option<GuestbookEntry>, StoreError>;

    /// Remove an entry. Returns the number of rows removed; deleting an
    /// unknown id is not an error.
    fn delete(&self, id: &EntryId) -> Result<usize, StoreError>;
}

/// Page-based pagination over a partition, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// `None` for page 0, which has no meaning in a 1-indexed scheme.
    pub fn new(page: u64, page_size: u64) -> Option<Self> {
        (page >= 1).then_some(Self { page, page_size })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Read one page of `store`. A page past the end has no messages but still
/// reports the real totals.
pub fn read_page(store: &dyn EntryStore, pagination: Pagination) -> Result<GuestbookPage, StoreError> {
    let total = store.count()?;
    let messages = store.list(pagination.offset(), pagination.limit())?;
    Ok(GuestbookPage::new(
        pagination.page,
        pagination.page_size,
        total,
        messages,
    ))
}

/// An open storage partition.
pub struct Partition {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Partition {
    /// Opens or creates the partition file at `path` and ensures its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory partition for testing.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert a batch verbatim in one transaction. Ids already present are
    /// skipped; any other failure rolls the whole batch back.
    pub fn import(&mut self, entries: &[GuestbookEntry]) -> Result<ImportReport, StoreError> {
        let tx = self.conn.transaction()?;
        let mut report = ImportReport::default();

        for entry in entries {
            match insert_entry(&tx, entry) {
                Ok(()) => report.imported += 1,
                Err(StoreError::DuplicateId(_)) => report.skipped.push(entry.id.clone()),
                Err(err) => return Err(err),
            }
        }

        tx.commit()?;
        Ok(report)
    }
}

/// Outcome of [`Partition::import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Ids that were already stored
    pub skipped: Vec<EntryId>,
}

impl EntryStore for Partition {
    fn insert(&self, entry: &GuestbookEntry) -> Result<(), StoreError> {
        insert_entry(&self.conn, entry)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM guestbook", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn list(&self, offset: u64, limit: u64) -> Result<Vec<GuestbookEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_ENTRY} ORDER BY created_ns DESC, id ASC LIMIT ?1 OFFSET ?2"
        ))?;

        let entries = stmt
            .query_map(params![clamp_i64(limit), clamp_i64(offset)], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn find_latest_by(
        &self,
        user_agent: &str,
        origin_ip: &str,
    ) -> Result<Option<GuestbookEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_ENTRY} WHERE user_agent = ?1 AND ip = ?2 ORDER BY created_ns DESC LIMIT 1"
        ))?;

        Ok(stmt
            .query_row(params![user_agent, origin_ip], entry_from_row)
            .optional()?)
    }

    fn delete(&self, id: &EntryId) -> Result<usize, StoreError> {
        Ok(self
            .conn
            .execute("DELETE FROM guestbook WHERE id = ?1", params![id.as_str()])?)
    }
}

fn insert_entry(conn: &Connection, entry: &GuestbookEntry) -> Result<(), StoreError> {
    let created_ns = entry
        .created
        .timestamp_nanos_opt()
        .ok_or(StoreError::TimestampOutOfRange(entry.created))?;

    let result = conn.execute(
        "INSERT INTO guestbook (id, created_ns, message, ip, user_agent, nickname)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id.as_str(),
            created_ns,
            entry.message,
            entry.origin_ip,
            entry.user_agent,
            entry.nickname,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::DuplicateId(entry.id.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GuestbookEntry> {
    Ok(GuestbookEntry {
        id: EntryId::new(row.get::<_, String>(0)?),
        created: DateTime::from_timestamp_nanos(row.get(1)?),
        message: row.get(2)?,
        origin_ip: row.get(3)?,
        user_agent: row.get(4)?,
        nickname: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn entry(id: &str, minutes: i64, ua: &str, ip: &str) -> GuestbookEntry {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        GuestbookEntry {
            id: EntryId::new(id),
            created: base + ChronoDuration::minutes(minutes),
            message: format!("message {id}"),
            origin_ip: ip.to_string(),
            user_agent: ua.to_string(),
            nickname: "tester".to_string(),
        }
    }

    #[test]
    fn test_insert_and_count() {
        let store = Partition::in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&entry("a", 0, "UA1", "1.1.1.1")).unwrap();
        store.insert(&entry("b", 1, "UA1", "1.1.1.1")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_entries_round_trip_verbatim() {
        let store = Partition::in_memory().unwrap();
        let original = entry("a", 3, "Mozilla/5.0", "10.0.0.1");
        store.insert(&original).unwrap();

        assert_eq!(store.list(0, 10).unwrap(), vec![original]);
    }

    #[test]
    fn test_created_keeps_nanosecond_precision() {
        let store = Partition::in_memory().unwrap();
        let mut original = entry("a", 0, "UA1", "1.1.1.1");
        original.created = "2023-01-01T00:00:00.123456789Z".parse().unwrap();
        store.insert(&original).unwrap();

        let back = store.list(0, 10).unwrap().remove(0);
        assert_eq!(back.created, original.created);
        assert_eq!(back, original);
        assert_eq!(
            store.find_latest_by("UA1", "1.1.1.1").unwrap(),
            Some(original)
        );
    }

    #[test]
    fn test_unstorable_timestamp_is_refused() {
        let store = Partition::in_memory().unwrap();
        let mut far_future = entry("a", 0, "UA1", "1.1.1.1");
        far_future.created = "2300-01-01T00:00:00Z".parse().unwrap();

        let err = store.insert(&far_future).unwrap_err();
        assert!(matches!(err, StoreError::TimestampOutOfRange(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_is_newest_first_and_paginated() {
        let store = Partition::in_memory().unwrap();
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            store.insert(&entry(id, i as i64, "UA", "ip")).unwrap();
        }

        let ids = |entries: Vec<GuestbookEntry>| -> Vec<String> {
            entries.into_iter().map(|e| e.id.0).collect()
        };

        assert_eq!(ids(store.list(0, 2).unwrap()), vec!["e", "d"]);
        assert_eq!(ids(store.list(2, 2).unwrap()), vec!["c", "b"]);
        assert_eq!(ids(store.list(4, 2).unwrap()), vec!["a"]);
        assert!(store.list(100, 2).unwrap().is_empty());
    }

    #[test]
    fn test_find_latest_by_matches_both_fields() {
        let store = Partition::in_memory().unwrap();
        store.insert(&entry("old", 0, "UA1", "1.1.1.1")).unwrap();
        store.insert(&entry("new", 5, "UA1", "1.1.1.1")).unwrap();
        store.insert(&entry("other-ip", 9, "UA1", "2.2.2.2")).unwrap();
        store.insert(&entry("other-ua", 9, "UA2", "1.1.1.1")).unwrap();

        let latest = store.find_latest_by("UA1", "1.1.1.1").unwrap().unwrap();
        assert_eq!(latest.id.as_str(), "new");
        assert!(store.find_latest_by("UA3", "1.1.1.1").unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = Partition::in_memory().unwrap();
        store.insert(&entry("a", 0, "UA", "ip")).unwrap();

        assert_eq!(store.delete(&EntryId::new("a")).unwrap(), 1);
        assert_eq!(store.delete(&EntryId::new("a")).unwrap(), 0);
        assert_eq!(store.delete(&EntryId::new("never")).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_id_is_reported() {
        let store = Partition::in_memory().unwrap();
        store.insert(&entry("a", 0, "UA", "ip")).unwrap();

        let err = store.insert(&entry("a", 1, "UA", "ip")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "a"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_skips_existing_ids() {
        let mut store = Partition::in_memory().unwrap();
        store.insert(&entry("a", 0, "UA", "ip")).unwrap();

        let batch = vec![
            entry("a", 0, "UA", "ip"),
            entry("b", 1, "UA", "ip"),
            entry("c", 2, "UA", "ip"),
            entry("b", 1, "UA", "ip"),
        ];
        let report = store.import(&batch).unwrap();

        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, vec![EntryId::new("a"), EntryId::new("b")]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_import_failure_rolls_back_batch() {
        let mut store = Partition::in_memory().unwrap();
        let mut unstorable = entry("late", 0, "UA", "ip");
        unstorable.created = "2300-01-01T00:00:00Z".parse().unwrap();

        let batch = vec![entry("a", 0, "UA", "ip"), unstorable, entry("b", 1, "UA", "ip")];
        let err = store.import(&batch).unwrap_err();

        assert!(matches!(err, StoreError::TimestampOutOfRange(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_read_page() {
        let store = Partition::in_memory().unwrap();
        for i in 0..25 {
            store.insert(&entry(&format!("e{i:02}"), i, "UA", "ip")).unwrap();
        }

        let page = read_page(&store, Pagination::new(3, 10).unwrap()).unwrap();
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.total, 25);
        assert_eq!(page.messages.len(), 5);
        assert_eq!(page.messages[0].id.as_str(), "e04");

        let beyond = read_page(&store, Pagination::new(9, 10).unwrap()).unwrap();
        assert_eq!(beyond.pages, 3);
        assert_eq!(beyond.total, 25);
        assert!(beyond.messages.is_empty());
    }

    #[test]
    fn test_pagination() {
        assert!(Pagination::new(0, 10).is_none());

        let first = Pagination::new(1, 10).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(first.limit(), 10);

        let third = Pagination::new(3, 10).unwrap();
        assert_eq!(third.offset(), 20);
    }
}
