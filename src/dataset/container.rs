use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::group::{
    check_collision, index_blocks, validate_group_name, validate_variable_name, GroupIndex,
};
use super::store::{BlockKind, BlockRef, Store};
use super::{DatasetConfig, DatasetError, DatasetStats};
use crate::acquisition::Acquisition;
use crate::header::{self, IsmrmrdHeader};
use crate::image::Image;
use crate::ndarray::NdArray;
use crate::waveform::Waveform;

/// One group of an ISMRMRD container file
///
/// A dataset is opened on a path and a group name, holds the group's XML
/// header and its acquisitions and waveforms as append-only, indexed
/// streams. Images and arrays live in named variables of the group, each
/// its own indexed stream. Closing (or dropping) releases the file handle; every operation
/// on a closed dataset fails with [`DatasetError::ContainerClosed`].
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    group: String,
    config: DatasetConfig,
    state: Option<OpenState>,
}

#[derive(Debug)]
struct OpenState {
    store: Store,
    index: GroupIndex,
    groups: BTreeSet<String>,
    header_text: Option<String>,
}

impl Dataset {
    /// Open `group` in the file at `path`, creating either when absent
    pub fn open<P: AsRef<Path>>(path: P, group: &str) -> Result<Self, DatasetError> {
        Self::open_with_config(path, group, DatasetConfig::default())
    }

    /// Open `group` in the file at `path` with explicit options
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        group: &str,
        config: DatasetConfig,
    ) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        validate_group_name(group)?;

        let (mut store, blocks) = Store::open(path, &config)?;
        let mut groups = index_blocks(blocks);
        check_collision(group, groups.keys().map(String::as_str))?;

        let index = match groups.remove(group) {
            Some(index) => index,
            None if store.is_writable() => {
                store.append(BlockKind::Group, group, &[]).map_err(|e| {
                    DatasetError::unavailable(format!(
                        "cannot create group {} in {}: {}",
                        group,
                        path.display(),
                        e
                    ))
                })?;
                info!("Created group {} in {}", group, path.display());
                GroupIndex::default()
            }
            None => GroupIndex::default(),
        };

        let mut names: BTreeSet<String> = groups.into_keys().collect();
        if store.is_writable() || !index.is_empty() {
            names.insert(group.to_string());
        }

        debug!(
            "Opened group {} of {}: {} acquisitions, {} waveforms, {} image and {} array variables",
            group,
            path.display(),
            index.acquisitions.len(),
            index.waveforms.len(),
            index.images.len(),
            index.arrays.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            group: group.to_string(),
            config,
            state: Some(OpenState {
                store,
                index,
                groups: names,
                header_text: None,
            }),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Group this dataset addresses
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Options the dataset was opened with
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// False once [`close`](Self::close) has been called
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&OpenState, DatasetError> {
        self.state.as_ref().ok_or(DatasetError::ContainerClosed)
    }

    fn parts(&mut self) -> Result<(&str, &mut OpenState), DatasetError> {
        let state = self.state.as_mut().ok_or(DatasetError::ContainerClosed)?;
        Ok((&self.group, state))
    }

    // ==================== Header ====================

    /// Stored header text, or `None` when no header has been written
    pub fn read_header_text(&mut self) -> Result<Option<String>, DatasetError> {
        let (_, state) = self.parts()?;
        if let Some(text) = &state.header_text {
            return Ok(Some(text.clone()));
        }
        let Some(block) = &state.index.header else {
            return Ok(None);
        };

        let payload = state.store.read_payload(block)?;
        let text = String::from_utf8(payload).map_err(|_| {
            DatasetError::CorruptRecord(format!(
                "header block at offset {} is not UTF-8",
                block.offset
            ))
        })?;
        state.header_text = Some(text.clone());
        Ok(Some(text))
    }

    /// Store header text; the last write wins
    pub fn write_header_text(&mut self, text: &str) -> Result<(), DatasetError> {
        let (group, state) = self.parts()?;
        let block = state.store.append(BlockKind::Header, group, text.as_bytes())?;
        state.index.record(block);
        state.header_text = Some(text.to_string());
        Ok(())
    }

    /// Decode the stored header
    pub fn read_header(&mut self) -> Result<Option<IsmrmrdHeader>, DatasetError> {
        match self.read_header_text()? {
            Some(text) => Ok(Some(header::decode(&text)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a header
    pub fn write_header(&mut self, header: &IsmrmrdHeader) -> Result<(), DatasetError> {
        let text = header::encode(header)?;
        self.write_header_text(&text)
    }

    // ==================== Acquisitions ====================

    /// Number of acquisitions in the group
    pub fn acquisition_count(&self) -> Result<u64, DatasetError> {
        Ok(self.state()?.index.acquisitions.len() as u64)
    }

    /// Read the acquisition at `index`
    pub fn read_acquisition(&mut self, index: u64) -> Result<Acquisition, DatasetError> {
        let payload = self.read_record(BlockKind::Acquisition, index)?;
        Ok(Acquisition::from_bytes(&payload)?)
    }

    /// Append an acquisition after the current last one
    pub fn append_acquisition(&mut self, acq: &Acquisition) -> Result<(), DatasetError> {
        let payload = acq.to_bytes()?;
        self.append_record(BlockKind::Acquisition, &payload)
    }

    /// Read a contiguous range of acquisitions
    pub fn read_acquisitions(&mut self, range: Range<u64>) -> Result<Vec<Acquisition>, DatasetError> {
        self.check_range(BlockKind::Acquisition, &range)?;
        range.map(|i| self.read_acquisition(i)).collect()
    }

    // ==================== Waveforms ====================

    /// Number of waveforms in the group
    pub fn waveform_count(&self) -> Result<u64, DatasetError> {
        Ok(self.state()?.index.waveforms.len() as u64)
    }

    /// Read the waveform at `index`
    pub fn read_waveform(&mut self, index: u64) -> Result<Waveform, DatasetError> {
        let payload = self.read_record(BlockKind::Waveform, index)?;
        Ok(Waveform::from_bytes(&payload)?)
    }

    /// Append a waveform after the current last one
    pub fn append_waveform(&mut self, waveform: &Waveform) -> Result<(), DatasetError> {
        let payload = waveform.to_bytes()?;
        self.append_record(BlockKind::Waveform, &payload)
    }

    // ==================== Images ====================

    /// Number of images in `variable`; zero when it does not exist
    pub fn image_count(&self, variable: &str) -> Result<u64, DatasetError> {
        self.variable_count(BlockKind::Image, variable)
    }

    /// Read image `index` of `variable`
    pub fn read_image(&mut self, variable: &str, index: u64) -> Result<Image, DatasetError> {
        let payload = self.read_variable_record(BlockKind::Image, variable, index)?;
        Ok(Image::from_bytes(&payload)?)
    }

    /// Append an image to `variable`, creating the variable on first use
    pub fn append_image(&mut self, variable: &str, image: &Image) -> Result<(), DatasetError> {
        validate_variable_name(&self.group, variable)?;
        let payload = image.to_bytes()?;
        self.append_variable_record(BlockKind::Image, variable, &payload)
    }

    /// Names of the image variables in the group
    pub fn image_variables(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.state()?.index.images.keys().cloned().collect())
    }

    // ==================== Arrays ====================

    /// Number of arrays in `variable`; zero when it does not exist
    pub fn array_count(&self, variable: &str) -> Result<u64, DatasetError> {
        self.variable_count(BlockKind::Array, variable)
    }

    /// Read array `index` of `variable`
    pub fn read_array(&mut self, variable: &str, index: u64) -> Result<NdArray, DatasetError> {
        let payload = self.read_variable_record(BlockKind::Array, variable, index)?;
        Ok(NdArray::from_bytes(&payload)?)
    }

    /// Append an array to `variable`, creating the variable on first use
    pub fn append_array(&mut self, variable: &str, array: &NdArray) -> Result<(), DatasetError> {
        validate_variable_name(&self.group, variable)?;
        let payload = array.to_bytes()?;
        self.append_variable_record(BlockKind::Array, variable, &payload)
    }

    /// Names of the array variables in the group
    pub fn array_variables(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.state()?.index.arrays.keys().cloned().collect())
    }

    // ==================== Misc ====================

    /// Names of all groups present in the file
    pub fn groups(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.state()?.groups.iter().cloned().collect())
    }

    /// Counts and sizes of this group
    pub fn stats(&self) -> Result<DatasetStats, DatasetError> {
        let state = self.state()?;
        Ok(DatasetStats {
            group: self.group.clone(),
            acquisitions: state.index.acquisitions.len() as u64,
            waveforms: state.index.waveforms.len() as u64,
            images: total_records(&state.index.images),
            arrays: total_records(&state.index.arrays),
            has_header: state.index.header.is_some(),
            groups: state.groups.len(),
            file_size_bytes: state.store.len(),
        })
    }

    /// Flush and release the file handle
    pub fn close(&mut self) -> Result<(), DatasetError> {
        let mut state = self.state.take().ok_or(DatasetError::ContainerClosed)?;
        state.store.sync()?;
        debug!("Closed group {} of {}", self.group, self.path.display());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_size_limit(&mut self, limit: Option<u64>) {
        if let Some(state) = self.state.as_mut() {
            state.store.set_size_limit(limit);
        }
    }

    fn read_record(&mut self, kind: BlockKind, index: u64) -> Result<Vec<u8>, DatasetError> {
        let (_, state) = self.parts()?;
        let block = nth_block(state.index.records(kind), index)?;
        state.store.read_payload(block)
    }

    fn append_record(&mut self, kind: BlockKind, payload: &[u8]) -> Result<(), DatasetError> {
        let (group, state) = self.parts()?;
        let block = state.store.append(kind, group, payload)?;
        state.index.record(block);
        Ok(())
    }

    fn variable_count(&self, kind: BlockKind, variable: &str) -> Result<u64, DatasetError> {
        let state = self.state()?;
        validate_variable_name(&self.group, variable)?;
        Ok(state.index.variable_records(kind, variable).len() as u64)
    }

    fn read_variable_record(
        &mut self,
        kind: BlockKind,
        variable: &str,
        index: u64,
    ) -> Result<Vec<u8>, DatasetError> {
        let (group, state) = self.parts()?;
        validate_variable_name(group, variable)?;
        let block = nth_block(state.index.variable_records(kind, variable), index)?;
        state.store.read_payload(block)
    }

    fn append_variable_record(
        &mut self,
        kind: BlockKind,
        variable: &str,
        payload: &[u8],
    ) -> Result<(), DatasetError> {
        let (group, state) = self.parts()?;
        let name = format!("{}/{}", group, variable);
        let block = state.store.append(kind, &name, payload)?;
        state.index.record(block);
        Ok(())
    }

    fn check_range(&self, kind: BlockKind, range: &Range<u64>) -> Result<(), DatasetError> {
        let count = self.state()?.index.records(kind).len() as u64;
        if range.start < range.end && range.end > count {
            return Err(DatasetError::IndexOutOfRange {
                index: range.end - 1,
                count,
            });
        }
        Ok(())
    }

    /// Path and block locations for a validated range, for readers that open
    /// their own handles
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub(crate) fn blocks_for(
        &self,
        kind: BlockKind,
        range: Range<u64>,
    ) -> Result<Vec<BlockRef>, DatasetError> {
        self.check_range(kind, &range)?;
        let blocks = self.state()?.index.records(kind);
        if range.start >= range.end {
            return Ok(Vec::new());
        }
        Ok(blocks[range.start as usize..range.end as usize].to_vec())
    }
}

fn nth_block(blocks: &[BlockRef], index: u64) -> Result<&BlockRef, DatasetError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| blocks.get(i))
        .ok_or(DatasetError::IndexOutOfRange {
            index,
            count: blocks.len() as u64,
        })
}

fn total_records(variables: &BTreeMap<String, Vec<BlockRef>>) -> u64 {
    variables.values().map(|blocks| blocks.len() as u64).sum()
}
