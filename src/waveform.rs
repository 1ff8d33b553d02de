//! Physiological and gradient waveform records
//!
//! A [`Waveform`] holds `number_of_samples x channels` unsigned samples,
//! channel-major, behind a small fixed-layout [`WaveformHeader`]. Waveforms
//! are stored next to acquisitions in their own indexed stream.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionError, FlagBits};

/// Record layout version written by this library
pub const WAVEFORM_VERSION: u16 = 1;

/// Encoded size of [`WaveformHeader`]
pub const WAVEFORM_HEADER_SIZE: usize = 32;

/// Fixed-layout header of one waveform record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformHeader {
    /// Record layout version
    pub version: u16,
    /// Bit field, same numbering as acquisition flags
    pub flags: u64,
    /// Unique measurement id
    pub measurement_uid: u32,
    /// Scan counter within the measurement
    pub scan_counter: u32,
    /// Clock tick of the first sample
    pub time_stamp: u32,
    /// Samples per channel
    pub number_of_samples: u16,
    /// Number of channels
    pub channels: u16,
    /// Sample spacing in microseconds
    pub sample_time_us: f32,
    /// Id matching a `waveformInformation` entry of the XML header
    pub waveform_id: u16,
}

impl Default for WaveformHeader {
    fn default() -> Self {
        Self {
            version: WAVEFORM_VERSION,
            flags: 0,
            measurement_uid: 0,
            scan_counter: 0,
            time_stamp: 0,
            number_of_samples: 0,
            channels: 0,
            sample_time_us: 0.0,
            waveform_id: 0,
        }
    }
}

impl WaveformHeader {
    /// Number of samples the data buffer holds
    pub fn data_len(&self) -> usize {
        self.number_of_samples as usize * self.channels as usize
    }
}

impl FlagBits for WaveformHeader {
    fn flag_word(&self) -> u64 {
        self.flags
    }

    fn flag_word_mut(&mut self) -> &mut u64 {
        &mut self.flags
    }
}

/// One waveform record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    head: WaveformHeader,
    data: Vec<u32>,
}

impl Waveform {
    /// Zero-filled waveform with the given dimensions
    pub fn new(number_of_samples: u16, channels: u16) -> Self {
        let mut w = Self::default();
        w.resize(number_of_samples, channels);
        w
    }

    /// Build a waveform from a header and a matching buffer
    pub fn from_parts(head: WaveformHeader, data: Vec<u32>) -> Result<Self, AcquisitionError> {
        if data.len() != head.data_len() {
            return Err(AcquisitionError::SizeMismatch {
                buffer: "waveform data",
                expected: head.data_len(),
                actual: data.len(),
            });
        }
        Ok(Self { head, data })
    }

    /// Change the sample counts and reallocate the buffer
    pub fn resize(&mut self, number_of_samples: u16, channels: u16) {
        self.head.number_of_samples = number_of_samples;
        self.head.channels = channels;
        self.data.resize(self.head.data_len(), 0);
    }

    /// The record header
    pub fn head(&self) -> &WaveformHeader {
        &self.head
    }

    /// Edit the header in place; count changes resize the buffer
    pub fn update_head(&mut self, f: impl FnOnce(&mut WaveformHeader)) {
        let mut head = self.head;
        f(&mut head);
        self.head = head;
        self.resize(head.number_of_samples, head.channels);
    }

    /// Channel-major samples
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Mutable channel-major samples
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    /// All samples of one channel
    pub fn channel(&self, channel: u16) -> Option<&[u32]> {
        if channel >= self.head.channels {
            return None;
        }
        let ns = self.head.number_of_samples as usize;
        let start = channel as usize * ns;
        Some(&self.data[start..start + ns])
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        WAVEFORM_HEADER_SIZE + self.data.len() * 4
    }

    /// Write the encoded record
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), AcquisitionError> {
        let h = &self.head;
        if h.version != WAVEFORM_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(h.version));
        }
        w.write_u16::<LittleEndian>(h.version)?;
        w.write_u64::<LittleEndian>(h.flags)?;
        w.write_u32::<LittleEndian>(h.measurement_uid)?;
        w.write_u32::<LittleEndian>(h.scan_counter)?;
        w.write_u32::<LittleEndian>(h.time_stamp)?;
        w.write_u16::<LittleEndian>(h.number_of_samples)?;
        w.write_u16::<LittleEndian>(h.channels)?;
        w.write_f32::<LittleEndian>(h.sample_time_us)?;
        w.write_u16::<LittleEndian>(h.waveform_id)?;
        for v in &self.data {
            w.write_u32::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    /// Encode the record into a new buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, AcquisitionError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode exactly one record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AcquisitionError> {
        if bytes.len() < WAVEFORM_HEADER_SIZE {
            return Err(AcquisitionError::Truncated {
                needed: WAVEFORM_HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut r = Cursor::new(bytes);
        let head = WaveformHeader {
            version: r.read_u16::<LittleEndian>()?,
            flags: r.read_u64::<LittleEndian>()?,
            measurement_uid: r.read_u32::<LittleEndian>()?,
            scan_counter: r.read_u32::<LittleEndian>()?,
            time_stamp: r.read_u32::<LittleEndian>()?,
            number_of_samples: r.read_u16::<LittleEndian>()?,
            channels: r.read_u16::<LittleEndian>()?,
            sample_time_us: r.read_f32::<LittleEndian>()?,
            waveform_id: r.read_u16::<LittleEndian>()?,
        };
        if head.version != WAVEFORM_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(head.version));
        }

        let needed = WAVEFORM_HEADER_SIZE + head.data_len() * 4;
        if bytes.len() < needed {
            return Err(AcquisitionError::Truncated {
                needed,
                available: bytes.len(),
            });
        }
        if bytes.len() > needed {
            return Err(AcquisitionError::SizeMismatch {
                buffer: "waveform record",
                expected: needed,
                actual: bytes.len(),
            });
        }

        let mut data = vec![0u32; head.data_len()];
        r.read_u32_into::<LittleEndian>(&mut data)?;
        Ok(Self { head, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::AcquisitionFlag;

    fn ecg() -> Waveform {
        let mut w = Waveform::new(5, 2);
        w.update_head(|h| {
            h.waveform_id = 3;
            h.time_stamp = 1000;
            h.sample_time_us = 2500.0;
            h.set_flag(AcquisitionFlag::User2);
        });
        for (i, v) in w.data_mut().iter_mut().enumerate() {
            *v = 2048 + i as u32;
        }
        w
    }

    #[test]
    fn test_round_trip() {
        let w = ecg();
        let bytes = w.to_bytes().unwrap();
        assert_eq!(bytes.len(), WAVEFORM_HEADER_SIZE + 10 * 4);
        assert_eq!(Waveform::from_bytes(&bytes).unwrap(), w);
    }

    #[test]
    fn test_encode_rejects_unsupported_version() {
        let mut w = ecg();
        w.update_head(|h| h.version = WAVEFORM_VERSION + 1);
        assert!(matches!(
            w.to_bytes(),
            Err(AcquisitionError::UnsupportedVersion(v)) if v == WAVEFORM_VERSION + 1
        ));
    }

    #[test]
    fn test_channel_slices() {
        let w = ecg();
        assert_eq!(w.channel(1), Some(&[2053u32, 2054, 2055, 2056, 2057][..]));
        assert!(w.channel(2).is_none());
    }

    #[test]
    fn test_update_head_resizes() {
        let mut w = ecg();
        w.update_head(|h| h.channels = 4);
        assert_eq!(w.data().len(), 20);
        assert!(w.head().is_flag_set(AcquisitionFlag::User2));
    }

    #[test]
    fn test_from_parts_checks_length() {
        let head = WaveformHeader {
            number_of_samples: 3,
            channels: 1,
            ..Default::default()
        };
        assert!(Waveform::from_parts(head, vec![1, 2, 3]).is_ok());
        assert!(matches!(
            Waveform::from_parts(head, vec![1, 2]),
            Err(AcquisitionError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = ecg().to_bytes().unwrap();
        assert!(matches!(
            Waveform::from_bytes(&bytes[..20]),
            Err(AcquisitionError::Truncated { .. })
        ));
        assert!(matches!(
            Waveform::from_bytes(&bytes[..bytes.len() - 4]),
            Err(AcquisitionError::Truncated { .. })
        ));
        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            Waveform::from_bytes(&longer),
            Err(AcquisitionError::SizeMismatch { .. })
        ));
    }
}
