use std::fmt;

use serde::Serialize;

/// Summary of one group of an open dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    /// Group name
    pub group: String,

    /// Number of acquisitions in the group
    pub acquisitions: u64,

    /// Number of waveforms in the group
    pub waveforms: u64,

    /// Number of images across all image variables
    pub images: u64,

    /// Number of arrays across all array variables
    pub arrays: u64,

    /// Whether a header has been written
    pub has_header: bool,

    /// Number of groups in the file
    pub groups: usize,

    /// Committed size of the file in bytes
    pub file_size_bytes: u64,
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Group {}: {} acquisitions, {} waveforms, {} images, {} arrays, header {}, {} groups, {} bytes",
            self.group,
            self.acquisitions,
            self.waveforms,
            self.images,
            self.arrays,
            if self.has_header { "present" } else { "absent" },
            self.groups,
            self.file_size_bytes
        )
    }
}
