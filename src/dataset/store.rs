//! Append-only block file
//!
//! ```text
//! preamble  magic "ISMRMRD\0" | format version u16 | reserved u16
//! block*    kind u8 | name length u16 | name | payload length u64 |
//!           payload | crc32 u32 over every preceding byte of the block
//! ```
//!
//! The name is the owning group, or `group/variable` for image and array
//! blocks.
//!
//! All integers are little-endian. Only the final block may be incomplete;
//! it is the remains of an interrupted append and is dropped on open.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info, warn};

use super::{DatasetConfig, DatasetError};

/// File signature
pub const MAGIC: &[u8; 8] = b"ISMRMRD\0";

/// Container format version written by this library
pub const FORMAT_VERSION: u16 = 1;

/// Bytes before the first block
pub const PREAMBLE_SIZE: u64 = 12;

const CRC_SIZE: u64 = 4;
const SCAN_CHUNK: usize = 64 * 1024;

/// Kind tag of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockKind {
    /// Declares a group; empty payload
    Group = 1,
    /// XML header text of a group
    Header = 2,
    /// Encoded acquisition record
    Acquisition = 3,
    /// Encoded waveform record
    Waveform = 4,
    /// Encoded image record of a named variable
    Image = 5,
    /// Encoded n-dimensional array of a named variable
    Array = 6,
}

impl BlockKind {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(BlockKind::Group),
            2 => Some(BlockKind::Header),
            3 => Some(BlockKind::Acquisition),
            4 => Some(BlockKind::Waveform),
            5 => Some(BlockKind::Image),
            6 => Some(BlockKind::Array),
            _ => None,
        }
    }

    /// True for kinds stored under a named variable of their group
    pub fn is_variable(self) -> bool {
        matches!(self, BlockKind::Image | BlockKind::Array)
    }
}

/// Split a block name into its group and, for variable kinds, the variable
fn split_name(kind: BlockKind, name: &str) -> Option<(&str, Option<&str>)> {
    if !kind.is_variable() {
        return Some((name, None));
    }
    match name.rsplit_once('/') {
        Some((group, variable)) if !group.is_empty() && !variable.is_empty() => {
            Some((group, Some(variable)))
        }
        _ => None,
    }
}

/// Location of one committed block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    /// Block kind
    pub kind: BlockKind,
    /// Owning group
    pub group: String,
    /// Variable inside the group, for image and array blocks
    pub variable: Option<String>,
    /// File offset of the kind byte
    pub offset: u64,
    /// Total block length including the checksum
    pub len: u64,
    /// Payload length
    pub payload_len: u64,
}

impl BlockRef {
    fn payload_start(&self) -> u64 {
        self.len - CRC_SIZE - self.payload_len
    }
}

fn prefix_len(name_len: u64) -> u64 {
    1 + 2 + name_len + 8
}

/// Open handle on a block file
#[derive(Debug)]
pub struct Store {
    file: File,
    path: PathBuf,
    len: u64,
    writable: bool,
    sync: bool,
    #[cfg(test)]
    size_limit: Option<u64>,
}

impl Store {
    /// Open or create the file and index its blocks
    pub fn open(path: &Path, config: &DatasetConfig) -> Result<(Self, Vec<BlockRef>), DatasetError> {
        if !path.exists() {
            if config.read_only || !config.create_if_missing {
                return Err(DatasetError::unavailable(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
            create(path)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(!config.read_only)
            .open(path)
            .map_err(|e| {
                DatasetError::unavailable(format!("cannot open {}: {}", path.display(), e))
            })?;

        let unavailable =
            |e: io::Error| DatasetError::unavailable(format!("{}: {}", path.display(), e));

        let file_len = file.metadata().map_err(unavailable)?.len();
        check_preamble(&mut file, file_len, path)?;

        let scan = scan(&mut file, file_len).map_err(unavailable)?;
        let blocks = match scan.end {
            ScanEnd::Clean => scan.blocks,
            ScanEnd::Torn(reason) => {
                warn!(
                    "Ignoring incomplete final block at offset {} in {}: {}",
                    scan.valid_len,
                    path.display(),
                    reason
                );
                if !config.read_only {
                    file.set_len(scan.valid_len).map_err(unavailable)?;
                    file.sync_all().map_err(unavailable)?;
                }
                scan.blocks
            }
            ScanEnd::Corrupt(reason) => {
                return Err(DatasetError::unavailable(format!(
                    "{} is corrupt: {}",
                    path.display(),
                    reason
                )));
            }
        };

        debug!(
            "Indexed {} blocks ({} bytes) in {}",
            blocks.len(),
            scan.valid_len,
            path.display()
        );

        let store = Self {
            file,
            path: path.to_path_buf(),
            len: scan.valid_len,
            writable: !config.read_only,
            sync: config.sync_on_write,
            #[cfg(test)]
            size_limit: None,
        };
        Ok((store, blocks))
    }

    /// Committed length of the file
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the file was opened for writing
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Append one block; on failure the file is cut back to its previous length
    ///
    /// `name` is the group, or `group/variable` for variable kinds.
    pub fn append(
        &mut self,
        kind: BlockKind,
        name: &str,
        payload: &[u8],
    ) -> Result<BlockRef, DatasetError> {
        if !self.writable {
            return Err(DatasetError::ReadOnly);
        }
        let (group, variable) = split_name(kind, name)
            .ok_or_else(|| DatasetError::InvalidVariable(name.to_string()))?;

        let bytes = encode_block(kind, name, payload).map_err(DatasetError::WriteError)?;
        let offset = self.len;

        if let Err(e) = self.write_at(offset, &bytes) {
            if let Err(rollback) = self.file.set_len(offset) {
                warn!(
                    "Failed to roll back partial block at offset {} in {}: {}",
                    offset,
                    self.path.display(),
                    rollback
                );
            }
            return Err(DatasetError::WriteError(e));
        }

        self.len = offset + bytes.len() as u64;
        Ok(BlockRef {
            kind,
            group: group.to_string(),
            variable: variable.map(str::to_string),
            offset,
            len: bytes.len() as u64,
            payload_len: payload.len() as u64,
        })
    }

    /// Make writes that would grow the file past `limit` fail part way
    #[cfg(test)]
    pub(crate) fn set_size_limit(&mut self, limit: Option<u64>) {
        self.size_limit = limit;
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        #[cfg(test)]
        if let Some(limit) = self.size_limit {
            let end = offset + bytes.len() as u64;
            if end > limit {
                let fits = limit.saturating_sub(offset) as usize;
                self.file.write_all(&bytes[..fits])?;
                self.file.flush()?;
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "file size limit exceeded",
                ));
            }
        }
        self.file.write_all(bytes)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Read and verify the payload of a committed block
    pub fn read_payload(&mut self, block: &BlockRef) -> Result<Vec<u8>, DatasetError> {
        read_payload(&mut self.file, block)
    }

    /// Flush file contents to disk
    pub fn sync(&mut self) -> Result<(), DatasetError> {
        if self.writable {
            self.file.sync_all().map_err(DatasetError::WriteError)?;
        }
        Ok(())
    }
}

fn create(path: &Path) -> Result<(), DatasetError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => {
            return Err(DatasetError::unavailable(format!(
                "cannot create {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut preamble = Vec::with_capacity(PREAMBLE_SIZE as usize);
    preamble.extend_from_slice(MAGIC);
    preamble.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    preamble.extend_from_slice(&0u16.to_le_bytes());

    file.write_all(&preamble)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            DatasetError::unavailable(format!("cannot initialize {}: {}", path.display(), e))
        })?;

    info!("Created dataset file {}", path.display());
    Ok(())
}

fn check_preamble(file: &mut File, file_len: u64, path: &Path) -> Result<(), DatasetError> {
    if file_len < PREAMBLE_SIZE {
        return Err(DatasetError::unavailable(format!(
            "{} is not an ISMRMRD container (file too short)",
            path.display()
        )));
    }

    let mut preamble = [0u8; PREAMBLE_SIZE as usize];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_exact(&mut preamble))
        .map_err(|e| DatasetError::unavailable(format!("{}: {}", path.display(), e)))?;

    if &preamble[..8] != MAGIC {
        return Err(DatasetError::unavailable(format!(
            "{} is not an ISMRMRD container (bad signature)",
            path.display()
        )));
    }
    let version = LittleEndian::read_u16(&preamble[8..10]);
    if version != FORMAT_VERSION {
        return Err(DatasetError::unavailable(format!(
            "{} uses unsupported container version {}",
            path.display(),
            version
        )));
    }
    Ok(())
}

/// Frame one block in memory
pub(crate) fn encode_block(kind: BlockKind, name: &str, payload: &[u8]) -> io::Result<Vec<u8>> {
    let name_len = u16::try_from(name.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "block name too long"))?;

    let total = prefix_len(name.len() as u64) as usize + payload.len() + CRC_SIZE as usize;
    let mut buf = Vec::with_capacity(total);
    buf.write_u8(kind as u8)?;
    buf.write_u16::<LittleEndian>(name_len)?;
    buf.write_all(name.as_bytes())?;
    buf.write_u64::<LittleEndian>(payload.len() as u64)?;
    buf.write_all(payload)?;
    let crc = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(crc)?;
    Ok(buf)
}

/// Read a block through any seekable reader and return its verified payload
pub(crate) fn read_payload<R: Read + Seek>(
    reader: &mut R,
    block: &BlockRef,
) -> Result<Vec<u8>, DatasetError> {
    reader.seek(SeekFrom::Start(block.offset))?;
    let mut bytes = vec![0u8; block.len as usize];
    reader.read_exact(&mut bytes)?;

    let body = bytes.len() - CRC_SIZE as usize;
    let stored = LittleEndian::read_u32(&bytes[body..]);
    if crc32fast::hash(&bytes[..body]) != stored {
        return Err(DatasetError::CorruptRecord(format!(
            "checksum mismatch in {:?} block at offset {}",
            block.kind, block.offset
        )));
    }

    let start = block.payload_start() as usize;
    Ok(bytes[start..body].to_vec())
}

enum ScanEnd {
    Clean,
    Torn(String),
    Corrupt(String),
}

struct Scan {
    blocks: Vec<BlockRef>,
    valid_len: u64,
    end: ScanEnd,
}

enum BlockScan {
    Block(BlockRef),
    Torn(String),
    Corrupt(String),
}

fn scan(file: &mut File, file_len: u64) -> io::Result<Scan> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(PREAMBLE_SIZE))?;

    let mut blocks = Vec::new();
    let mut offset = PREAMBLE_SIZE;
    while offset < file_len {
        match scan_block(&mut reader, offset, file_len - offset)? {
            BlockScan::Block(block) => {
                offset += block.len;
                blocks.push(block);
            }
            BlockScan::Torn(reason) => {
                return Ok(Scan {
                    blocks,
                    valid_len: offset,
                    end: ScanEnd::Torn(reason),
                })
            }
            BlockScan::Corrupt(reason) => {
                return Ok(Scan {
                    blocks,
                    valid_len: offset,
                    end: ScanEnd::Corrupt(reason),
                })
            }
        }
    }

    Ok(Scan {
        blocks,
        valid_len: offset,
        end: ScanEnd::Clean,
    })
}

fn scan_block<R: Read>(r: &mut R, offset: u64, remaining: u64) -> io::Result<BlockScan> {
    if remaining < prefix_len(0) + CRC_SIZE {
        return Ok(BlockScan::Torn("incomplete block prefix".to_string()));
    }

    let mut hasher = crc32fast::Hasher::new();

    let kind_byte = r.read_u8()?;
    let name_len = r.read_u16::<LittleEndian>()?;
    hasher.update(&[kind_byte]);
    hasher.update(&name_len.to_le_bytes());

    let prefix = prefix_len(name_len as u64);
    if remaining < prefix + CRC_SIZE {
        return Ok(BlockScan::Torn("incomplete block prefix".to_string()));
    }

    let mut name = vec![0u8; name_len as usize];
    r.read_exact(&mut name)?;
    hasher.update(&name);

    let payload_len = r.read_u64::<LittleEndian>()?;
    hasher.update(&payload_len.to_le_bytes());

    let total = match prefix
        .checked_add(payload_len)
        .and_then(|t| t.checked_add(CRC_SIZE))
    {
        Some(t) if t <= remaining => t,
        _ => return Ok(BlockScan::Torn("block extends past end of file".to_string())),
    };

    let mut chunk = vec![0u8; SCAN_CHUNK];
    let mut left = payload_len;
    while left > 0 {
        let n = left.min(SCAN_CHUNK as u64) as usize;
        r.read_exact(&mut chunk[..n])?;
        hasher.update(&chunk[..n]);
        left -= n as u64;
    }

    let stored = r.read_u32::<LittleEndian>()?;
    if stored != hasher.finalize() {
        let reason = format!("checksum mismatch in block at offset {}", offset);
        return Ok(if total == remaining {
            BlockScan::Torn(reason)
        } else {
            BlockScan::Corrupt(reason)
        });
    }

    let kind = match BlockKind::from_u8(kind_byte) {
        Some(k) => k,
        None => {
            return Ok(BlockScan::Corrupt(format!(
                "unknown block kind {} at offset {}",
                kind_byte, offset
            )))
        }
    };
    let name = match String::from_utf8(name) {
        Ok(n) => n,
        Err(_) => {
            return Ok(BlockScan::Corrupt(format!(
                "block name at offset {} is not UTF-8",
                offset
            )))
        }
    };
    let Some((group, variable)) = split_name(kind, &name) else {
        return Ok(BlockScan::Corrupt(format!(
            "{:?} block at offset {} names no variable",
            kind, offset
        )));
    };

    Ok(BlockScan::Block(BlockRef {
        kind,
        group: group.to_string(),
        variable: variable.map(str::to_string),
        offset,
        len: total,
        payload_len,
    }))
}
