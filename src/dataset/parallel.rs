use std::fs::File;
use std::io;
use std::ops::Range;

use rayon::prelude::*;

use super::store::{read_payload, BlockKind};
use super::{Dataset, DatasetError};
use crate::acquisition::Acquisition;

impl Dataset {
    /// Read a range of acquisitions on the rayon pool
    ///
    /// Each worker opens its own read-only handle on the file, so only
    /// blocks committed before the call are read.
    pub fn read_acquisitions_parallel(
        &self,
        range: Range<u64>,
    ) -> Result<Vec<Acquisition>, DatasetError> {
        let blocks = self.blocks_for(BlockKind::Acquisition, range)?;
        let path = self.path();

        blocks
            .par_iter()
            .map_init(
                || File::open(path),
                |file, block| {
                    let file = file.as_mut().map_err(|e| {
                        DatasetError::Io(io::Error::new(e.kind(), e.to_string()))
                    })?;
                    let payload = read_payload(file, block)?;
                    Ok(Acquisition::from_bytes(&payload)?)
                },
            )
            .collect()
    }
}
