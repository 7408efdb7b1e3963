//! # guestbook-core
//!
//! Core library for the guestbook service.
//!
//! This crate provides the site registry, the per-site storage partitions,
//! the guestbook entry store and the admission pipeline that gates every
//! public post.

pub mod clock;
pub mod config;
pub mod hash;
pub mod moderation;
pub mod partition;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GuestbookConfig, ModerationConfig};
pub use hash::{entry_id, hash_seed, partition_file_name};
pub use moderation::{ProfanityMatcher, UrlFilter, WordListMatcher};
pub use partition::PartitionResolver;
pub use pipeline::{
    AdmissionError, AdmissionPipeline, AdmissionRule, Rejection, RejectionKind, RuleContext,
};
pub use registry::{RegistryError, SiteRegistry, YamlSiteRegistry};
pub use store::{read_page, EntryStore, ImportReport, Pagination, Partition, StoreError};

pub use guestbook_types::{EntryId, GuestbookEntry, GuestbookPage, Site, Submission};
