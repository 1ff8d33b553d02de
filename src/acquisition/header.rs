use serde::{Deserialize, Serialize};

use super::flags::FlagBits;

/// Record layout version written by this library
pub const ACQUISITION_VERSION: u16 = 1;

/// Number of 64-bit words in the channel mask (1024 channels)
pub const CHANNEL_MASK_WORDS: usize = 16;

/// Number of user counters in [`EncodingCounters`]
pub const USER_INTS: usize = 8;

/// Number of user floats in [`AcquisitionHeader`]
pub const USER_FLOATS: usize = 8;

/// Highest channel index addressable by the channel mask
pub const MAX_CHANNELS: u16 = (CHANNEL_MASK_WORDS * 64) as u16;

/// Loop counters locating an acquisition in k-space
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingCounters {
    pub kspace_encode_step_1: u16,
    pub kspace_encode_step_2: u16,
    pub average: u16,
    pub slice: u16,
    pub contrast: u16,
    pub phase: u16,
    pub repetition: u16,
    pub set: u16,
    pub segment: u16,
    pub user: [u16; USER_INTS],
}

impl EncodingCounters {
    /// Counters paired with the `encodingLimits` element they are checked against
    pub fn limited(&self) -> [(&'static str, u16); 9] {
        [
            ("kspace_encoding_step_1", self.kspace_encode_step_1),
            ("kspace_encoding_step_2", self.kspace_encode_step_2),
            ("average", self.average),
            ("slice", self.slice),
            ("contrast", self.contrast),
            ("phase", self.phase),
            ("repetition", self.repetition),
            ("set", self.set),
            ("segment", self.segment),
        ]
    }
}

/// Fixed-layout header of one readout
///
/// The sample counts (`number_of_samples`, `active_channels`,
/// `trajectory_dimensions`) describe the buffers of the owning
/// [`Acquisition`](super::Acquisition) and are changed through
/// [`Acquisition::resize`](super::Acquisition::resize).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionHeader {
    /// Record layout version
    pub version: u16,
    /// Bit field of [`AcquisitionFlag`](super::AcquisitionFlag)s
    pub flags: u64,
    /// Unique measurement id
    pub measurement_uid: u32,
    /// Scan counter within the measurement
    pub scan_counter: u32,
    /// Acquisition clock tick
    pub acquisition_time_stamp: u32,
    /// Physiology clock ticks (ECG, respiration, ...)
    pub physiology_time_stamp: [u32; 3],
    /// Samples per channel
    pub number_of_samples: u16,
    /// Channels available on the receiver
    pub available_channels: u16,
    /// Channels stored in this record
    pub active_channels: u16,
    /// One bit per receiver channel
    pub channel_mask: [u64; CHANNEL_MASK_WORDS],
    /// Samples to discard at the start of the readout
    pub discard_pre: u16,
    /// Samples to discard at the end of the readout
    pub discard_post: u16,
    /// Sample at the k-space center
    pub center_sample: u16,
    /// Index into the header's `encoding` list
    pub encoding_space_ref: u16,
    /// Values per trajectory point
    pub trajectory_dimensions: u16,
    /// Dwell time in microseconds
    pub sample_time_us: f32,
    /// Slice position in patient coordinates (mm)
    pub position: [f32; 3],
    /// Readout direction cosines
    pub read_dir: [f32; 3],
    /// Phase direction cosines
    pub phase_dir: [f32; 3],
    /// Slice direction cosines
    pub slice_dir: [f32; 3],
    /// Table position (mm)
    pub patient_table_position: [f32; 3],
    /// Encoding loop counters
    pub idx: EncodingCounters,
    /// Free user integers
    pub user_int: [i32; USER_INTS],
    /// Free user floats
    pub user_float: [f32; USER_FLOATS],
}

impl Default for AcquisitionHeader {
    fn default() -> Self {
        Self {
            version: ACQUISITION_VERSION,
            flags: 0,
            measurement_uid: 0,
            scan_counter: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; 3],
            number_of_samples: 0,
            available_channels: 0,
            active_channels: 0,
            channel_mask: [0; CHANNEL_MASK_WORDS],
            discard_pre: 0,
            discard_post: 0,
            center_sample: 0,
            encoding_space_ref: 0,
            trajectory_dimensions: 0,
            sample_time_us: 0.0,
            position: [0.0; 3],
            read_dir: [0.0; 3],
            phase_dir: [0.0; 3],
            slice_dir: [0.0; 3],
            patient_table_position: [0.0; 3],
            idx: EncodingCounters::default(),
            user_int: [0; USER_INTS],
            user_float: [0.0; USER_FLOATS],
        }
    }
}

impl AcquisitionHeader {
    /// Number of complex samples the data buffer holds
    pub fn data_len(&self) -> usize {
        self.number_of_samples as usize * self.active_channels as usize
    }

    /// Number of values the trajectory buffer holds
    pub fn traj_len(&self) -> usize {
        self.number_of_samples as usize * self.trajectory_dimensions as usize
    }

    /// True when `channel` is marked active in the channel mask
    ///
    /// Channels beyond the mask range are never active.
    pub fn is_channel_active(&self, channel: u16) -> bool {
        match mask_position(channel) {
            Some((word, bit)) => self.channel_mask[word] & bit != 0,
            None => false,
        }
    }

    /// Mark `channel` active; out-of-range channels are ignored
    pub fn set_channel_active(&mut self, channel: u16) {
        if let Some((word, bit)) = mask_position(channel) {
            self.channel_mask[word] |= bit;
        }
    }

    /// Mark `channel` inactive; out-of-range channels are ignored
    pub fn set_channel_inactive(&mut self, channel: u16) {
        if let Some((word, bit)) = mask_position(channel) {
            self.channel_mask[word] &= !bit;
        }
    }

    /// Clear the whole channel mask
    pub fn set_all_channels_off(&mut self) {
        self.channel_mask = [0; CHANNEL_MASK_WORDS];
    }

    /// Number of channels marked active in the mask
    pub fn active_channel_count(&self) -> u32 {
        self.channel_mask.iter().map(|w| w.count_ones()).sum()
    }
}

fn mask_position(channel: u16) -> Option<(usize, u64)> {
    if channel >= MAX_CHANNELS {
        return None;
    }
    Some(((channel / 64) as usize, 1u64 << (channel % 64)))
}

impl FlagBits for AcquisitionHeader {
    fn flag_word(&self) -> u64 {
        self.flags
    }

    fn flag_word_mut(&mut self) -> &mut u64 {
        &mut self.flags
    }
}
