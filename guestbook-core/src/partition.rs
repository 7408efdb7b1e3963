//! Site name to storage partition resolution.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::hash::partition_file_name;
use crate::store::{Partition, StoreError};

/// Maps site names onto partition files inside one data directory.
///
/// The mapping is a pure function of the name (see
/// [`partition_file_name`]), so resolving the same site twice always opens
/// the same file and no name-to-partition index has to be kept.
#[derive(Debug, Clone)]
pub struct PartitionResolver {
    data_dir: PathBuf,
}

impl PartitionResolver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Location of `site`'s partition file, whether or not it exists yet.
    pub fn partition_path(&self, site: &str) -> PathBuf {
        self.data_dir.join(partition_file_name(site))
    }

    /// Open `site`'s partition, creating the file and schema on first use.
    ///
    /// The returned handle closes its connection when dropped.
    pub fn resolve(&self, site: &str) -> Result<Partition, StoreError> {
        std::fs::create_dir_all(&self.data_dir)?;

        let path = self.partition_path(site);
        let is_new = !path.exists();
        let partition = Partition::open(&path)?;

        if is_new {
            info!(%site, path = %path.display(), "created partition");
        } else {
            debug!(%site, path = %path.display(), "opened partition");
        }
        Ok(partition)
    }
}
