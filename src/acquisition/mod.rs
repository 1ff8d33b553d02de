//! # Acquisition records
//!
//! One [`Acquisition`] holds a single readout: a fixed-layout
//! [`AcquisitionHeader`], an optional k-space trajectory and the complex
//! samples of every active channel.
//!
//! Sample data is stored channel-major: sample `s` of channel `c` lives at
//! `data[c * number_of_samples + s]`. Both buffer lengths always match the
//! counts in the header; counts only change through [`Acquisition::resize`]
//! (or [`Acquisition::set_head`], which resizes).

mod codec;
mod error;
mod flags;
mod header;

pub use codec::ACQUISITION_HEADER_SIZE;
pub use error::AcquisitionError;
pub use flags::{AcquisitionFlag, FlagBits};
pub use header::{
    AcquisitionHeader, EncodingCounters, ACQUISITION_VERSION, CHANNEL_MASK_WORDS, MAX_CHANNELS,
    USER_FLOATS, USER_INTS,
};

use num_complex::Complex32;

/// A single readout with its header, trajectory and samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Acquisition {
    head: AcquisitionHeader,
    traj: Vec<f32>,
    data: Vec<Complex32>,
}

impl Acquisition {
    /// Zero-filled acquisition with the given dimensions
    pub fn new(number_of_samples: u16, active_channels: u16, trajectory_dimensions: u16) -> Self {
        let mut acq = Self::default();
        acq.resize(number_of_samples, active_channels, trajectory_dimensions);
        acq
    }

    /// Build an acquisition from a header and matching buffers
    pub fn from_parts(
        head: AcquisitionHeader,
        traj: Vec<f32>,
        data: Vec<Complex32>,
    ) -> Result<Self, AcquisitionError> {
        check_len("traj", head.traj_len(), traj.len())?;
        check_len("data", head.data_len(), data.len())?;
        Ok(Self::from_parts_unchecked(head, traj, data))
    }

    pub(crate) fn from_parts_unchecked(
        head: AcquisitionHeader,
        traj: Vec<f32>,
        data: Vec<Complex32>,
    ) -> Self {
        debug_assert_eq!(traj.len(), head.traj_len());
        debug_assert_eq!(data.len(), head.data_len());
        Self { head, traj, data }
    }

    /// Change the sample counts and reallocate both buffers
    ///
    /// Existing values are kept where the flat index still exists; new
    /// slots are zero.
    pub fn resize(
        &mut self,
        number_of_samples: u16,
        active_channels: u16,
        trajectory_dimensions: u16,
    ) {
        self.head.number_of_samples = number_of_samples;
        self.head.active_channels = active_channels;
        self.head.trajectory_dimensions = trajectory_dimensions;
        self.traj.resize(self.head.traj_len(), 0.0);
        self.data.resize(self.head.data_len(), Complex32::new(0.0, 0.0));
    }

    /// The record header
    pub fn head(&self) -> &AcquisitionHeader {
        &self.head
    }

    /// Replace the header, resizing the buffers when its counts differ
    pub fn set_head(&mut self, head: AcquisitionHeader) {
        let resize = head.number_of_samples != self.head.number_of_samples
            || head.active_channels != self.head.active_channels
            || head.trajectory_dimensions != self.head.trajectory_dimensions;
        self.head = head;
        if resize {
            self.resize(
                head.number_of_samples,
                head.active_channels,
                head.trajectory_dimensions,
            );
        }
    }

    /// Edit the header in place; count changes resize the buffers
    pub fn update_head(&mut self, f: impl FnOnce(&mut AcquisitionHeader)) {
        let mut head = self.head;
        f(&mut head);
        self.set_head(head);
    }

    /// Samples per channel
    pub fn number_of_samples(&self) -> u16 {
        self.head.number_of_samples
    }

    /// Channels stored in this record
    pub fn active_channels(&self) -> u16 {
        self.head.active_channels
    }

    /// Values per trajectory point
    pub fn trajectory_dimensions(&self) -> u16 {
        self.head.trajectory_dimensions
    }

    /// Trajectory buffer, `trajectory_dimensions` values per sample
    pub fn traj(&self) -> &[f32] {
        &self.traj
    }

    /// Mutable trajectory buffer
    pub fn traj_mut(&mut self) -> &mut [f32] {
        &mut self.traj
    }

    /// Replace the trajectory buffer; its length must match the header
    pub fn set_traj(&mut self, traj: Vec<f32>) -> Result<(), AcquisitionError> {
        check_len("traj", self.head.traj_len(), traj.len())?;
        self.traj = traj;
        Ok(())
    }

    /// Channel-major complex samples
    pub fn data(&self) -> &[Complex32] {
        &self.data
    }

    /// Mutable channel-major complex samples
    pub fn data_mut(&mut self) -> &mut [Complex32] {
        &mut self.data
    }

    /// Replace the sample buffer; its length must match the header
    pub fn set_data(&mut self, data: Vec<Complex32>) -> Result<(), AcquisitionError> {
        check_len("data", self.head.data_len(), data.len())?;
        self.data = data;
        Ok(())
    }

    /// Sample `sample` of channel `channel`
    pub fn sample(&self, sample: u16, channel: u16) -> Option<Complex32> {
        self.sample_index(sample, channel).map(|i| self.data[i])
    }

    /// Mutable sample `sample` of channel `channel`
    pub fn sample_mut(&mut self, sample: u16, channel: u16) -> Option<&mut Complex32> {
        let i = self.sample_index(sample, channel)?;
        Some(&mut self.data[i])
    }

    /// All samples of one channel
    pub fn channel(&self, channel: u16) -> Option<&[Complex32]> {
        if channel >= self.head.active_channels {
            return None;
        }
        let ns = self.head.number_of_samples as usize;
        let start = channel as usize * ns;
        Some(&self.data[start..start + ns])
    }

    /// Trajectory point of one sample
    pub fn traj_point(&self, sample: u16) -> Option<&[f32]> {
        if sample >= self.head.number_of_samples {
            return None;
        }
        let dims = self.head.trajectory_dimensions as usize;
        let start = sample as usize * dims;
        Some(&self.traj[start..start + dims])
    }

    fn sample_index(&self, sample: u16, channel: u16) -> Option<usize> {
        if sample >= self.head.number_of_samples || channel >= self.head.active_channels {
            return None;
        }
        Some(channel as usize * self.head.number_of_samples as usize + sample as usize)
    }

    /// True when `flag` is set in the header
    pub fn is_flag_set(&self, flag: AcquisitionFlag) -> bool {
        self.head.is_flag_set(flag)
    }

    /// Set `flag` in the header
    pub fn set_flag(&mut self, flag: AcquisitionFlag) {
        self.head.set_flag(flag);
    }

    /// Clear `flag` in the header
    pub fn clear_flag(&mut self, flag: AcquisitionFlag) {
        self.head.clear_flag(flag);
    }

    /// True when `channel` is marked active in the channel mask
    pub fn is_channel_active(&self, channel: u16) -> bool {
        self.head.is_channel_active(channel)
    }

    /// Mark `channel` active in the channel mask
    pub fn set_channel_active(&mut self, channel: u16) {
        self.head.set_channel_active(channel);
    }

    /// Mark `channel` inactive in the channel mask
    pub fn set_channel_inactive(&mut self, channel: u16) {
        self.head.set_channel_inactive(channel);
    }

    /// Clear the channel mask
    pub fn set_all_channels_off(&mut self) {
        self.head.set_all_channels_off();
    }
}

fn check_len(buffer: &'static str, expected: usize, actual: usize) -> Result<(), AcquisitionError> {
    if expected != actual {
        return Err(AcquisitionError::SizeMismatch {
            buffer,
            expected,
            actual,
        });
    }
    Ok(())
}
