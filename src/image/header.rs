use serde::{Deserialize, Serialize};

use crate::acquisition::{FlagBits, USER_FLOATS, USER_INTS};

/// Record layout version written by this library
pub const IMAGE_VERSION: u16 = 1;

/// What the pixel values of an image represent
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ImageType {
    Magnitude = 1,
    Phase = 2,
    Real = 3,
    Imag = 4,
    Complex = 5,
}

impl ImageType {
    /// Code stored in [`ImageHeader::image_type`]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a type by its stored code
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Magnitude),
            2 => Some(Self::Phase),
            3 => Some(Self::Real),
            4 => Some(Self::Imag),
            5 => Some(Self::Complex),
            _ => None,
        }
    }
}

/// Fixed-layout header of one reconstructed image
///
/// `matrix_size` and `channels` describe the pixel buffer of the owning
/// [`Image`](super::Image) and change through
/// [`Image::resize`](super::Image::resize). The element type and the
/// attribute string length are taken from the image itself when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageHeader {
    /// Record layout version
    pub version: u16,
    /// Bit field; images use `IsNavigationData` and `User1`..`User8`
    pub flags: u64,
    /// Unique measurement id
    pub measurement_uid: u32,
    /// Pixels in x, y and z
    pub matrix_size: [u16; 3],
    /// Physical extent in millimetres
    pub field_of_view: [f32; 3],
    /// Number of receive channels
    pub channels: u16,
    /// Centre of the image in patient coordinates
    pub position: [f32; 3],
    /// Readout direction cosines
    pub read_dir: [f32; 3],
    /// Phase encoding direction cosines
    pub phase_dir: [f32; 3],
    /// Slice direction cosines
    pub slice_dir: [f32; 3],
    /// Table position
    pub patient_table_position: [f32; 3],
    #[allow(missing_docs)]
    pub average: u16,
    #[allow(missing_docs)]
    pub slice: u16,
    #[allow(missing_docs)]
    pub contrast: u16,
    #[allow(missing_docs)]
    pub phase: u16,
    #[allow(missing_docs)]
    pub repetition: u16,
    #[allow(missing_docs)]
    pub set: u16,
    /// Clock tick of the acquisition
    pub acquisition_time_stamp: u32,
    /// Physiology clock ticks
    pub physiology_time_stamp: [u32; 3],
    /// An [`ImageType`] code
    pub image_type: u16,
    /// Index within the series
    pub image_index: u16,
    /// Series the image belongs to
    pub image_series_index: u16,
    /// Free integer slots
    pub user_int: [i32; USER_INTS],
    /// Free float slots
    pub user_float: [f32; USER_FLOATS],
}

impl Default for ImageHeader {
    fn default() -> Self {
        Self {
            version: IMAGE_VERSION,
            flags: 0,
            measurement_uid: 0,
            matrix_size: [0, 1, 1],
            field_of_view: [0.0; 3],
            channels: 1,
            position: [0.0; 3],
            read_dir: [0.0; 3],
            phase_dir: [0.0; 3],
            slice_dir: [0.0; 3],
            patient_table_position: [0.0; 3],
            average: 0,
            slice: 0,
            contrast: 0,
            phase: 0,
            repetition: 0,
            set: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; 3],
            image_type: ImageType::Magnitude.code(),
            image_index: 0,
            image_series_index: 0,
            user_int: [0; USER_INTS],
            user_float: [0.0; USER_FLOATS],
        }
    }
}

impl ImageHeader {
    /// Number of elements the pixel buffer holds
    pub fn data_len(&self) -> usize {
        self.matrix_size.iter().map(|m| *m as usize).product::<usize>() * self.channels as usize
    }

    /// Decoded [`ImageType`], `None` for an unknown code
    pub fn kind(&self) -> Option<ImageType> {
        ImageType::from_code(self.image_type)
    }
}

impl FlagBits for ImageHeader {
    fn flag_word(&self) -> u64 {
        self.flags
    }

    fn flag_word_mut(&mut self) -> &mut u64 {
        &mut self.flags
    }
}
