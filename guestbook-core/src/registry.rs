//! Durable list of registered sites.
//!
//! The default backend is a human-editable YAML file (`sites.yaml`), a
//! sequence of `{ name }` mappings. Writers are serialized by an in-process
//! lock and replace the file atomically, so readers always observe either the
//! old or the new list, never a torn one.

use std::io::Write;
use std::path::{Path, PathBuf};

use guestbook_types::Site;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to access site registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse site registry: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to replace site registry: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("invalid site name: {0:?}")]
    InvalidName(String),
}

/// Known-site lookup and registration.
pub trait SiteRegistry: Send + Sync {
    /// True iff `name` is registered. Fails closed: an absent or unreadable
    /// registry reports every name as unknown.
    fn exists(&self, name: &str) -> bool;

    /// Append a site. Duplicates are tolerated.
    fn add(&self, site: Site) -> Result<Site, RegistryError>;

    fn list(&self) -> Result<Vec<Site>, RegistryError>;
}

pub struct YamlSiteRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlSiteRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Site>, RegistryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn write(&self, sites: &[Site]) -> Result<(), RegistryError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let yaml = serde_yaml::to_string(sites)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl SiteRegistry for YamlSiteRegistry {
    fn exists(&self, name: &str) -> bool {
        match self.read() {
            Ok(sites) => sites.iter().any(|site| site.name == name),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "site registry unreadable");
                false
            }
        }
    }

    fn add(&self, site: Site) -> Result<Site, RegistryError> {
        if site.name.trim().is_empty() {
            return Err(RegistryError::InvalidName(site.name));
        }

        let _guard = self.write_lock.lock();
        let mut sites = self.read()?;
        if sites.iter().any(|existing| existing.name == site.name) {
            warn!(site = %site.name, "site registered more than once");
        }
        sites.push(site.clone());
        self.write(&sites)?;

        debug!(site = %site.name, total = sites.len(), "site registered");
        Ok(site)
    }

    fn list(&self) -> Result<Vec<Site>, RegistryError> {
        self.read()
    }
}
