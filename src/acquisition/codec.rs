//! Little-endian binary layout of acquisition records
//!
//! ```text
//! header (340 bytes, fields in declaration order, no padding)
//! trajectory  f32 x number_of_samples * trajectory_dimensions
//! data        (re f32, im f32) x number_of_samples * active_channels
//! ```

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex32;

use super::{Acquisition, AcquisitionError, AcquisitionHeader, EncodingCounters, ACQUISITION_VERSION};

/// Encoded size of [`AcquisitionHeader`]
pub const ACQUISITION_HEADER_SIZE: usize = 340;

fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> std::io::Result<()> {
    for v in values {
        w.write_f32::<LittleEndian>(*v)?;
    }
    Ok(())
}

fn write_header<W: Write>(w: &mut W, h: &AcquisitionHeader) -> std::io::Result<()> {
    w.write_u16::<LittleEndian>(h.version)?;
    w.write_u64::<LittleEndian>(h.flags)?;
    w.write_u32::<LittleEndian>(h.measurement_uid)?;
    w.write_u32::<LittleEndian>(h.scan_counter)?;
    w.write_u32::<LittleEndian>(h.acquisition_time_stamp)?;
    for t in h.physiology_time_stamp {
        w.write_u32::<LittleEndian>(t)?;
    }
    w.write_u16::<LittleEndian>(h.number_of_samples)?;
    w.write_u16::<LittleEndian>(h.available_channels)?;
    w.write_u16::<LittleEndian>(h.active_channels)?;
    for m in h.channel_mask {
        w.write_u64::<LittleEndian>(m)?;
    }
    w.write_u16::<LittleEndian>(h.discard_pre)?;
    w.write_u16::<LittleEndian>(h.discard_post)?;
    w.write_u16::<LittleEndian>(h.center_sample)?;
    w.write_u16::<LittleEndian>(h.encoding_space_ref)?;
    w.write_u16::<LittleEndian>(h.trajectory_dimensions)?;
    w.write_f32::<LittleEndian>(h.sample_time_us)?;
    write_f32s(w, &h.position)?;
    write_f32s(w, &h.read_dir)?;
    write_f32s(w, &h.phase_dir)?;
    write_f32s(w, &h.slice_dir)?;
    write_f32s(w, &h.patient_table_position)?;

    let idx = &h.idx;
    for c in [
        idx.kspace_encode_step_1,
        idx.kspace_encode_step_2,
        idx.average,
        idx.slice,
        idx.contrast,
        idx.phase,
        idx.repetition,
        idx.set,
        idx.segment,
    ] {
        w.write_u16::<LittleEndian>(c)?;
    }
    for u in idx.user {
        w.write_u16::<LittleEndian>(u)?;
    }

    for u in h.user_int {
        w.write_i32::<LittleEndian>(u)?;
    }
    write_f32s(w, &h.user_float)
}

fn read_header<R: Read>(r: &mut R) -> std::io::Result<AcquisitionHeader> {
    let mut h = AcquisitionHeader {
        version: r.read_u16::<LittleEndian>()?,
        flags: r.read_u64::<LittleEndian>()?,
        measurement_uid: r.read_u32::<LittleEndian>()?,
        scan_counter: r.read_u32::<LittleEndian>()?,
        acquisition_time_stamp: r.read_u32::<LittleEndian>()?,
        ..Default::default()
    };
    r.read_u32_into::<LittleEndian>(&mut h.physiology_time_stamp)?;
    h.number_of_samples = r.read_u16::<LittleEndian>()?;
    h.available_channels = r.read_u16::<LittleEndian>()?;
    h.active_channels = r.read_u16::<LittleEndian>()?;
    r.read_u64_into::<LittleEndian>(&mut h.channel_mask)?;
    h.discard_pre = r.read_u16::<LittleEndian>()?;
    h.discard_post = r.read_u16::<LittleEndian>()?;
    h.center_sample = r.read_u16::<LittleEndian>()?;
    h.encoding_space_ref = r.read_u16::<LittleEndian>()?;
    h.trajectory_dimensions = r.read_u16::<LittleEndian>()?;
    h.sample_time_us = r.read_f32::<LittleEndian>()?;
    r.read_f32_into::<LittleEndian>(&mut h.position)?;
    r.read_f32_into::<LittleEndian>(&mut h.read_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.phase_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.slice_dir)?;
    r.read_f32_into::<LittleEndian>(&mut h.patient_table_position)?;

    let mut counters = [0u16; 9];
    r.read_u16_into::<LittleEndian>(&mut counters)?;
    let mut user = [0u16; 8];
    r.read_u16_into::<LittleEndian>(&mut user)?;
    h.idx = EncodingCounters {
        kspace_encode_step_1: counters[0],
        kspace_encode_step_2: counters[1],
        average: counters[2],
        slice: counters[3],
        contrast: counters[4],
        phase: counters[5],
        repetition: counters[6],
        set: counters[7],
        segment: counters[8],
        user,
    };

    r.read_i32_into::<LittleEndian>(&mut h.user_int)?;
    r.read_f32_into::<LittleEndian>(&mut h.user_float)?;
    Ok(h)
}

impl Acquisition {
    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        ACQUISITION_HEADER_SIZE + self.traj().len() * 4 + self.data().len() * 8
    }

    /// Write the encoded record
    ///
    /// Only [`ACQUISITION_VERSION`] records are written, so everything
    /// encoded here decodes again.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), AcquisitionError> {
        if self.head().version != ACQUISITION_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(self.head().version));
        }
        write_header(w, self.head())?;
        write_f32s(w, self.traj())?;
        for z in self.data() {
            w.write_f32::<LittleEndian>(z.re)?;
            w.write_f32::<LittleEndian>(z.im)?;
        }
        Ok(())
    }

    /// Encode the record into a new buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>, AcquisitionError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode a record produced by [`Acquisition::to_bytes`]
    ///
    /// The slice must hold exactly one record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AcquisitionError> {
        if bytes.len() < ACQUISITION_HEADER_SIZE {
            return Err(AcquisitionError::Truncated {
                needed: ACQUISITION_HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut cursor = Cursor::new(bytes);
        let head = read_header(&mut cursor)?;
        if head.version != ACQUISITION_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(head.version));
        }

        let needed = ACQUISITION_HEADER_SIZE + head.traj_len() * 4 + head.data_len() * 8;
        if bytes.len() < needed {
            return Err(AcquisitionError::Truncated {
                needed,
                available: bytes.len(),
            });
        }
        if bytes.len() > needed {
            return Err(AcquisitionError::SizeMismatch {
                buffer: "record",
                expected: needed,
                actual: bytes.len(),
            });
        }

        let mut traj = vec![0f32; head.traj_len()];
        cursor.read_f32_into::<LittleEndian>(&mut traj)?;

        let mut raw = vec![0f32; head.data_len() * 2];
        cursor.read_f32_into::<LittleEndian>(&mut raw)?;
        let data = raw
            .chunks_exact(2)
            .map(|pair| Complex32::new(pair[0], pair[1]))
            .collect();

        Ok(Acquisition::from_parts_unchecked(head, traj, data))
    }
}
