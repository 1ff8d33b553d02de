//! Little-endian binary layout of image records
//!
//! ```text
//! header (198 bytes, fields in declaration order, data_type after version,
//!         attribute_string_len u32 last)
//! attribute string  UTF-8 x attribute_string_len
//! pixels            data_type elements x matrix_size product * channels
//! ```

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{Image, ImageHeader, IMAGE_VERSION};
use crate::acquisition::AcquisitionError;
use crate::ndarray::{check_exact, ArrayData, DataType};

/// Encoded size of the fixed image header
pub const IMAGE_HEADER_SIZE: usize = 198;

fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> std::io::Result<()> {
    values.iter().try_for_each(|v| w.write_f32::<LittleEndian>(*v))
}

fn write_header<W: Write>(
    w: &mut W,
    h: &ImageHeader,
    data_type: DataType,
    attribute_len: u32,
) -> std::io::Result<()> {
    w.write_u16::<LittleEndian>(h.version)?;
    w.write_u16::<LittleEndian>(data_type.code())?;
    w.write_u64::<LittleEndian>(h.flags)?;
    w.write_u32::<LittleEndian>(h.measurement_uid)?;
    for m in h.matrix_size {
        w.write_u16::<LittleEndian>(m)?;
    }
    write_f32s(w, &h.field_of_view)?;
    w.write_u16::<LittleEndian>(h.channels)?;
    write_f32s(w, &h.position)?;
    write_f32s(w, &h.read_dir)?;
    write_f32s(w, &h.phase_dir)?;
    write_f32s(w, &h.slice_dir)?;
    write_f32s(w, &h.patient_table_position)?;
    for c in [h.average, h.slice, h.contrast, h.phase, h.repetition, h.set] {
        w.write_u16::<LittleEndian>(c)?;
    }
    w.write_u32::<LittleEndian>(h.acquisition_time_stamp)?;
    for t in h.physiology_time_stamp {
        w.write_u32::<LittleEndian>(t)?;
    }
    w.write_u16::<LittleEndian>(h.image_type)?;
    w.write_u16::<LittleEndian>(h.image_index)?;
    w.write_u16::<LittleEndian>(h.image_series_index)?;
    for u in h.user_int {
        w.write_i32::<LittleEndian>(u)?;
    }
    write_f32s(w, &h.user_float)?;
    w.write_u32::<LittleEndian>(attribute_len)
}

/// Header fields plus the stored type code and attribute length
fn read_header<R: Read>(r: &mut R) -> std::io::Result<(ImageHeader, u16, u32)> {
    let mut h = ImageHeader {
        version: r.read_u16::<LittleEndian>()?,
        ..Default::default()
    };
    let data_type = r.read_u16::<LittleEndian>()?;
    h.flags = r.read_u64::<LittleEndian>()?;
    h.measurement_uid = r.read_u32::<LittleEndian>()?;
    r.read_u16_into::<LittleEndian>(&mut h.matrix_size)?;
    r.read_f32_into::<LittleEndian>(&mut h.field_of_view)?;
    h.channels = r.read_u16::<LittleEndian>()?;
    r.read_f32_into::<LittleEndian>(&mut h.position)?;
    r.read_f32_into::<LittleEndian>(&mut h.read_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.phase_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.slice_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.patient_table_position)?;

    let mut counters = [0u16; 6];
    r.read_u16_into::<LittleEndian>(&mut counters)?;
    [h.average, h.slice, h.contrast, h.phase, h.repetition, h.set] = counters;

    h.acquisition_time_stamp = r.read_u32::<LittleEndian>()?;
    r.read_u32_into::<LittleEndian>(&mut h.physiology_time_stamp)?;
    h.image_type = r.read_u16::<LittleEndian>()?;
    h.image_index = r.read_u16::<LittleEndian>()?;
    h.image_series_index = r.read_u16::<LittleEndian>()?;
    r.read_i32_into::<LittleEndian>(&mut h.user_int)?;
    r.read_f32_into::<LittleEndian>(&mut h.user_float)?;
    let attribute_len = r.read_u32::<LittleEndian>()?;
    Ok((h, data_type, attribute_len))
}

impl Image {
    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        IMAGE_HEADER_SIZE + self.attribute_string().len() + self.data().encoded_len()
    }

    /// Write the encoded record
    ///
    /// Only [`IMAGE_VERSION`] records are written, so everything encoded
    /// here decodes again.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), AcquisitionError> {
        if self.head().version != IMAGE_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(self.head().version));
        }
        let attributes = self.attribute_string().as_bytes();
        let attribute_len = u32::try_from(attributes.len()).map_err(|_| {
            AcquisitionError::Malformed(format!("attribute string of {} bytes", attributes.len()))
        })?;
        write_header(w, self.head(), self.data_type(), attribute_len)?;
        w.write_all(attributes)?;
        self.data().write_to(w)?;
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
        if bytes.len() < IMAGE_HEADER_SIZE {
            return Err(AcquisitionError::Truncated {
                needed: IMAGE_HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut r = Cursor::new(bytes);
        let (head, code, attribute_len) = read_header(&mut r)?;
        if head.version != IMAGE_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(head.version));
        }
        let data_type = DataType::from_code(code).ok_or(AcquisitionError::UnsupportedDataType(code))?;

        let len = head.data_len();
        let needed = len
            .checked_mul(data_type.element_size())
            .and_then(|n| n.checked_add(IMAGE_HEADER_SIZE + attribute_len as usize))
            .ok_or_else(|| AcquisitionError::Malformed("image size overflows".to_string()))?;
        check_exact(bytes.len(), needed, "image record")?;

        let mut attributes = vec![0u8; attribute_len as usize];
        r.read_exact(&mut attributes)?;
        let attribute_string = String::from_utf8(attributes)
            .map_err(|_| AcquisitionError::Malformed("attribute string is not UTF-8".to_string()))?;
        let data = ArrayData::read_from(&mut r, data_type, len)?;
        Self::from_parts(head, attribute_string, data)
    }
}
