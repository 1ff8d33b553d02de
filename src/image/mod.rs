//! # Image records
//!
//! An [`Image`] is a reconstructed image: a fixed-layout [`ImageHeader`],
//! a free-form attribute string and a typed pixel buffer. Pixels are
//! stored x fastest, then y, z and channel, so pixel `(x, y, z)` of
//! channel `c` lives at `((c * nz + z) * ny + y) * nx + x`.
//!
//! The buffer length always matches `matrix_size` and `channels`.

mod codec;
mod header;

pub use codec::IMAGE_HEADER_SIZE;
pub use header::{ImageHeader, ImageType, IMAGE_VERSION};

use crate::acquisition::{AcquisitionError, AcquisitionFlag, FlagBits};
use crate::ndarray::{ArrayData, ArrayElement, DataType};

/// One reconstructed image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    head: ImageHeader,
    attribute_string: String,
    data: ArrayData,
}

impl Image {
    /// Zero-filled image of the given type and size
    pub fn new(data_type: DataType, matrix_size: [u16; 3], channels: u16) -> Self {
        let head = ImageHeader {
            matrix_size,
            channels,
            ..Default::default()
        };
        Self {
            data: ArrayData::zeros(data_type, head.data_len()),
            head,
            attribute_string: String::new(),
        }
    }

    /// Build an image from a header, attributes and a matching buffer
    pub fn from_parts(
        head: ImageHeader,
        attribute_string: impl Into<String>,
        data: ArrayData,
    ) -> Result<Self, AcquisitionError> {
        if data.len() != head.data_len() {
            return Err(AcquisitionError::SizeMismatch {
                buffer: "image data",
                expected: head.data_len(),
                actual: data.len(),
            });
        }
        Ok(Self {
            head,
            attribute_string: attribute_string.into(),
            data,
        })
    }

    /// Change the matrix size and channel count, reallocating the buffer
    pub fn resize(&mut self, matrix_size: [u16; 3], channels: u16) {
        self.head.matrix_size = matrix_size;
        self.head.channels = channels;
        self.data.resize(self.head.data_len());
    }

    /// Switch the pixel type; existing pixels are reset to zero
    pub fn set_data_type(&mut self, data_type: DataType) {
        if data_type != self.data.data_type() {
            self.data = ArrayData::zeros(data_type, self.head.data_len());
        }
    }

    /// The record header
    pub fn head(&self) -> &ImageHeader {
        &self.head
    }

    /// Edit the header in place; size changes resize the buffer
    pub fn update_head(&mut self, f: impl FnOnce(&mut ImageHeader)) {
        let mut head = self.head;
        f(&mut head);
        self.head = head;
        self.resize(head.matrix_size, head.channels);
    }

    /// Pixel element type
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// The pixel buffer
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Typed view of the pixels, `None` when `T` is not the pixel type
    pub fn as_slice<T: ArrayElement>(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    /// Mutable typed view of the pixels
    pub fn as_mut_slice<T: ArrayElement>(&mut self) -> Option<&mut [T]> {
        self.data.as_mut_slice()
    }

    /// All pixels of one channel
    pub fn channel<T: ArrayElement>(&self, channel: u16) -> Option<&[T]> {
        if channel >= self.head.channels {
            return None;
        }
        let per_channel = self.head.data_len() / self.head.channels as usize;
        let start = channel as usize * per_channel;
        self.as_slice().map(|pixels| &pixels[start..start + per_channel])
    }

    /// Free-form attributes, usually a serialised meta container
    pub fn attribute_string(&self) -> &str {
        &self.attribute_string
    }

    /// Replace the attribute string
    pub fn set_attribute_string(&mut self, attributes: impl Into<String>) {
        self.attribute_string = attributes.into();
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
}

impl Default for Image {
    fn default() -> Self {
        Self::new(DataType::Float, [0, 1, 1], 1)
    }
}

#[cfg(test)]
mod tests;
