//! Shared types for the guestbook service
//!
//! This crate provides the wire-level data model used across the guestbook
//! crates: registered sites, persisted entries, incoming submissions and
//! paginated listings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered namespace under which guestbook entries are collected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
}

impl Site {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Entry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        EntryId(id)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        EntryId(id.to_string())
    }
}

/// A persisted guestbook message.
///
/// Entries are immutable once stored. The `id` is derived from the creation
/// instant, the message and the origin address, so two identical messages
/// posted at different instants get different ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestbookEntry {
    pub id: EntryId,
    pub created: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "ip")]
    pub origin_ip: String,
    pub user_agent: String,
    pub nickname: String,
}

/// An incoming, not yet admitted, guestbook post.
///
/// Missing fields deserialize as empty strings so that emptiness is reported
/// by the admission rules with a specific reason rather than as a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "ip")]
    pub origin_ip: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub nickname: String,
}

/// One page of a site's guestbook, newest entries first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookPage {
    pub pages: u64,
    pub page: u64,
    pub total: u64,
    pub messages: Vec<GuestbookEntry>,
}

impl GuestbookPage {
    pub fn new(page: u64, page_size: u64, total: u64, messages: Vec<GuestbookEntry>) -> Self {
        Self {
            pages: page_count(total, page_size),
            page,
            total,
            messages,
        }
    }
}

/// Number of pages needed to show `total` entries, `page_size` at a time.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
