//! Acquisition flag bits
//!
//! Flags are numbered from 1; flag `n` occupies bit `n - 1` of the 64-bit
//! `flags` word.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named bits of [`AcquisitionHeader::flags`](super::AcquisitionHeader::flags)
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AcquisitionFlag {
    FirstInEncodeStep1 = 1,
    LastInEncodeStep1 = 2,
    FirstInEncodeStep2 = 3,
    LastInEncodeStep2 = 4,
    FirstInAverage = 5,
    LastInAverage = 6,
    FirstInSlice = 7,
    LastInSlice = 8,
    FirstInContrast = 9,
    LastInContrast = 10,
    FirstInPhase = 11,
    LastInPhase = 12,
    FirstInRepetition = 13,
    LastInRepetition = 14,
    FirstInSet = 15,
    LastInSet = 16,
    FirstInSegment = 17,
    LastInSegment = 18,
    IsNoiseMeasurement = 19,
    IsParallelCalibration = 20,
    IsParallelCalibrationAndImaging = 21,
    IsReverse = 22,
    IsNavigationData = 23,
    IsPhasecorrData = 24,
    LastInMeasurement = 25,
    IsHpFeedbackData = 26,
    IsDummyscanData = 27,
    IsRtFeedbackData = 28,
    IsSurfaceCoilCorrectionScanData = 29,
    User1 = 57,
    User2 = 58,
    User3 = 59,
    User4 = 60,
    User5 = 61,
    User6 = 62,
    User7 = 63,
    User8 = 64,
}

impl AcquisitionFlag {
    /// Every defined flag, in bit order
    pub const ALL: [AcquisitionFlag; 37] = [
        Self::FirstInEncodeStep1,
        Self::LastInEncodeStep1,
        Self::FirstInEncodeStep2,
        Self::LastInEncodeStep2,
        Self::FirstInAverage,
        Self::LastInAverage,
        Self::FirstInSlice,
        Self::LastInSlice,
        Self::FirstInContrast,
        Self::LastInContrast,
        Self::FirstInPhase,
        Self::LastInPhase,
        Self::FirstInRepetition,
        Self::LastInRepetition,
        Self::FirstInSet,
        Self::LastInSet,
        Self::FirstInSegment,
        Self::LastInSegment,
        Self::IsNoiseMeasurement,
        Self::IsParallelCalibration,
        Self::IsParallelCalibrationAndImaging,
        Self::IsReverse,
        Self::IsNavigationData,
        Self::IsPhasecorrData,
        Self::LastInMeasurement,
        Self::IsHpFeedbackData,
        Self::IsDummyscanData,
        Self::IsRtFeedbackData,
        Self::IsSurfaceCoilCorrectionScanData,
        Self::User1,
        Self::User2,
        Self::User3,
        Self::User4,
        Self::User5,
        Self::User6,
        Self::User7,
        Self::User8,
    ];

    /// 1-based flag number
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Bit mask inside the 64-bit flags word
    pub fn bitmask(self) -> u64 {
        1u64 << (self.number() - 1)
    }

    /// Flags set in `word`, in bit order
    pub fn decompose(word: u64) -> Vec<AcquisitionFlag> {
        Self::ALL
            .iter()
            .copied()
            .filter(|f| word & f.bitmask() != 0)
            .collect()
    }
}

impl fmt::Display for AcquisitionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Flag operations on a 64-bit flags word
pub trait FlagBits {
    /// The raw flags word
    fn flag_word(&self) -> u64;

    /// Mutable access to the raw flags word
    fn flag_word_mut(&mut self) -> &mut u64;

    /// True when `flag` is set
    fn is_flag_set(&self, flag: AcquisitionFlag) -> bool {
        self.flag_word() & flag.bitmask() != 0
    }

    /// Set `flag`
    fn set_flag(&mut self, flag: AcquisitionFlag) {
        *self.flag_word_mut() |= flag.bitmask();
    }

    /// Clear `flag`
    fn clear_flag(&mut self, flag: AcquisitionFlag) {
        *self.flag_word_mut() &= !flag.bitmask();
    }

    /// Clear every flag
    fn clear_all_flags(&mut self) {
        *self.flag_word_mut() = 0;
    }
}
