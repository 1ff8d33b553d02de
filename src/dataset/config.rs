use serde::{Deserialize, Serialize};

/// How a [`Dataset`](super::Dataset) opens its backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Create the file when it does not exist
    pub create_if_missing: bool,

    /// Open without write access; appends and header writes fail
    pub read_only: bool,

    /// `fsync` after every committed block
    pub sync_on_write: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            read_only: false,
            sync_on_write: false,
        }
    }
}

impl DatasetConfig {
    /// Read-only access to an existing file
    pub fn read_only() -> Self {
        Self {
            create_if_missing: false,
            read_only: true,
            sync_on_write: false,
        }
    }

    /// Builder-style toggle for `sync_on_write`
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// Builder-style toggle for `create_if_missing`
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}
