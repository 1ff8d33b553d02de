use crate::acquisition::AcquisitionError;
use crate::header::HeaderError;

/// Errors that can occur during dataset operations
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The file cannot be opened or created, is not a container, or the
    /// group name is invalid or collides with the existing layout
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A record index at or beyond the current count
    #[error("Index {index} out of range (count {count})")]
    IndexOutOfRange {
        /// Requested index
        index: u64,
        /// Records available
        count: u64,
    },

    /// An append or header write failed; nothing was committed
    #[error("Write failed: {0}")]
    WriteError(#[source] std::io::Error),

    /// An image or array variable name is empty, reserved or not a single
    /// path component
    #[error("Invalid variable name: {0:?}")]
    InvalidVariable(String),

    /// The dataset was closed
    #[error("Dataset is closed")]
    ContainerClosed,

    /// A write was attempted on a dataset opened read-only
    #[error("Dataset is opened read-only")]
    ReadOnly,

    /// A stored block no longer matches its checksum or holds invalid text
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The stored header text is not a valid header
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    /// A stored record payload cannot be decoded, or a record cannot be encoded
    #[error("Record error: {0}")]
    Record(#[from] AcquisitionError),

    /// I/O error while reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// True for errors caused by file content rather than the environment
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DatasetError::Header(_) | DatasetError::Record(_) | DatasetError::CorruptRecord(_)
        )
    }

    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        DatasetError::StorageUnavailable(message.into())
    }
}
