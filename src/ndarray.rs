//! N-dimensional array records
//!
//! An [`NdArray`] is a typed element buffer with up to [`MAX_DIMENSIONS`]
//! dimensions, first dimension varying fastest. [`ArrayData`] is the typed
//! buffer itself and is shared with image records.
//!
//! ```text
//! version u16 | data_type u16 | ndim u16 | dims u64 x 7 | elements (little-endian)
//! ```

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionError;

/// Record layout version written by this library
pub const NDARRAY_VERSION: u16 = 1;

/// Largest number of dimensions an array may have
pub const MAX_DIMENSIONS: usize = 7;

/// Encoded size of the array header
pub const NDARRAY_HEADER_SIZE: usize = 6 + 8 * MAX_DIMENSIONS;

/// Element type of an array or image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DataType {
    /// `u16`
    UShort = 1,
    /// `i16`
    Short = 2,
    /// `u32`
    UInt = 3,
    /// `i32`
    Int = 4,
    /// `f32`
    Float = 5,
    /// `f64`
    Double = 6,
    /// Complex `f32` pair
    CxFloat = 7,
    /// Complex `f64` pair
    CxDouble = 8,
}

impl DataType {
    /// Every element type, in code order
    pub const ALL: [DataType; 8] = [
        DataType::UShort,
        DataType::Short,
        DataType::UInt,
        DataType::Int,
        DataType::Float,
        DataType::Double,
        DataType::CxFloat,
        DataType::CxDouble,
    ];

    /// Code stored in record headers
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a type by its stored code
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Encoded size of one element in bytes
    pub fn element_size(self) -> usize {
        match self {
            DataType::UShort | DataType::Short => 2,
            DataType::UInt | DataType::Int | DataType::Float => 4,
            DataType::Double | DataType::CxFloat => 8,
            DataType::CxDouble => 16,
        }
    }
}

/// Typed element buffer
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// `u16` elements
    UShort(Vec<u16>),
    /// `i16` elements
    Short(Vec<i16>),
    /// `u32` elements
    UInt(Vec<u32>),
    /// `i32` elements
    Int(Vec<i32>),
    /// `f32` elements
    Float(Vec<f32>),
    /// `f64` elements
    Double(Vec<f64>),
    /// Complex `f32` elements
    CxFloat(Vec<Complex32>),
    /// Complex `f64` elements
    CxDouble(Vec<Complex64>),
}

macro_rules! each_buffer {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::UShort($v) => $body,
            ArrayData::Short($v) => $body,
            ArrayData::UInt($v) => $body,
            ArrayData::Int($v) => $body,
            ArrayData::Float($v) => $body,
            ArrayData::Double($v) => $body,
            ArrayData::CxFloat($v) => $body,
            ArrayData::CxDouble($v) => $body,
        }
    };
}

impl ArrayData {
    /// Zero-filled buffer of `len` elements
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::UShort => ArrayData::UShort(vec![0; len]),
            DataType::Short => ArrayData::Short(vec![0; len]),
            DataType::UInt => ArrayData::UInt(vec![0; len]),
            DataType::Int => ArrayData::Int(vec![0; len]),
            DataType::Float => ArrayData::Float(vec![0.0; len]),
            DataType::Double => ArrayData::Double(vec![0.0; len]),
            DataType::CxFloat => ArrayData::CxFloat(vec![Complex32::default(); len]),
            DataType::CxDouble => ArrayData::CxDouble(vec![Complex64::default(); len]),
        }
    }

    /// Element type of the buffer
    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::UShort(_) => DataType::UShort,
            ArrayData::Short(_) => DataType::Short,
            ArrayData::UInt(_) => DataType::UInt,
            ArrayData::Int(_) => DataType::Int,
            ArrayData::Float(_) => DataType::Float,
            ArrayData::Double(_) => DataType::Double,
            ArrayData::CxFloat(_) => DataType::CxFloat,
            ArrayData::CxDouble(_) => DataType::CxDouble,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        each_buffer!(self, v => v.len())
    }

    /// True when the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        self.len() * self.data_type().element_size()
    }

    /// Typed view of the elements, `None` when `T` is not the buffer's type
    pub fn as_slice<T: ArrayElement>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Mutable typed view of the elements
    pub fn as_mut_slice<T: ArrayElement>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Grow or shrink to `len` elements, zero-filling new ones
    pub(crate) fn resize(&mut self, len: usize) {
        each_buffer!(self, v => v.resize(len, Default::default()))
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            ArrayData::UShort(v) => v.iter().try_for_each(|x| w.write_u16::<LittleEndian>(*x)),
            ArrayData::Short(v) => v.iter().try_for_each(|x| w.write_i16::<LittleEndian>(*x)),
            ArrayData::UInt(v) => v.iter().try_for_each(|x| w.write_u32::<LittleEndian>(*x)),
            ArrayData::Int(v) => v.iter().try_for_each(|x| w.write_i32::<LittleEndian>(*x)),
            ArrayData::Float(v) => v.iter().try_for_each(|x| w.write_f32::<LittleEndian>(*x)),
            ArrayData::Double(v) => v.iter().try_for_each(|x| w.write_f64::<LittleEndian>(*x)),
            ArrayData::CxFloat(v) => v.iter().try_for_each(|z| {
                w.write_f32::<LittleEndian>(z.re)?;
                w.write_f32::<LittleEndian>(z.im)
            }),
            ArrayData::CxDouble(v) => v.iter().try_for_each(|z| {
                w.write_f64::<LittleEndian>(z.re)?;
                w.write_f64::<LittleEndian>(z.im)
            }),
        }
    }

    /// Read `len` elements; the caller has already checked the byte count
    pub(crate) fn read_from<R: Read>(r: &mut R, data_type: DataType, len: usize) -> io::Result<Self> {
        let mut data = ArrayData::zeros(data_type, len);
        match &mut data {
            ArrayData::UShort(v) => r.read_u16_into::<LittleEndian>(v)?,
            ArrayData::Short(v) => r.read_i16_into::<LittleEndian>(v)?,
            ArrayData::UInt(v) => r.read_u32_into::<LittleEndian>(v)?,
            ArrayData::Int(v) => r.read_i32_into::<LittleEndian>(v)?,
            ArrayData::Float(v) => r.read_f32_into::<LittleEndian>(v)?,
            ArrayData::Double(v) => r.read_f64_into::<LittleEndian>(v)?,
            ArrayData::CxFloat(v) => {
                for z in v.iter_mut() {
                    *z = Complex32::new(r.read_f32::<LittleEndian>()?, r.read_f32::<LittleEndian>()?);
                }
            }
            ArrayData::CxDouble(v) => {
                for z in v.iter_mut() {
                    *z = Complex64::new(r.read_f64::<LittleEndian>()?, r.read_f64::<LittleEndian>()?);
                }
            }
        }
        Ok(data)
    }
}

/// Element types an [`ArrayData`] buffer can hold
pub trait ArrayElement: Copy + Default + Sized {
    /// Matching buffer type
    const DATA_TYPE: DataType;

    /// Borrow the elements when the buffer holds `Self`
    fn slice(data: &ArrayData) -> Option<&[Self]>;

    /// Mutably borrow the elements when the buffer holds `Self`
    fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]>;

    /// Wrap a vector in the matching buffer variant
    fn wrap(values: Vec<Self>) -> ArrayData;
}

macro_rules! array_element {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ArrayElement for $t {
                const DATA_TYPE: DataType = DataType::$variant;

                fn slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }

                fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v.as_mut_slice()),
                        _ => None,
                    }
                }

                fn wrap(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values)
                }
            }
        )+
    };
}

array_element!(
    u16 => UShort,
    i16 => Short,
    u32 => UInt,
    i32 => Int,
    f32 => Float,
    f64 => Double,
    Complex32 => CxFloat,
    Complex64 => CxDouble,
);

/// Number of elements implied by `dims`, checking the dimension count
fn element_count(dims: &[usize]) -> Result<usize, AcquisitionError> {
    if dims.is_empty() || dims.len() > MAX_DIMENSIONS {
        return Err(AcquisitionError::Malformed(format!(
            "arrays need 1 to {MAX_DIMENSIONS} dimensions, got {}",
            dims.len()
        )));
    }
    dims.iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d))
        .ok_or_else(|| AcquisitionError::Malformed(format!("dimensions {dims:?} overflow")))
}

/// One n-dimensional array record
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dims: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Zero-filled array of the given type and shape
    pub fn new(data_type: DataType, dims: &[usize]) -> Result<Self, AcquisitionError> {
        let len = element_count(dims)?;
        Ok(Self {
            dims: dims.to_vec(),
            data: ArrayData::zeros(data_type, len),
        })
    }

    /// Array over an existing buffer whose length matches `dims`
    pub fn from_data(dims: &[usize], data: ArrayData) -> Result<Self, AcquisitionError> {
        let len = element_count(dims)?;
        if data.len() != len {
            return Err(AcquisitionError::SizeMismatch {
                buffer: "array data",
                expected: len,
                actual: data.len(),
            });
        }
        Ok(Self {
            dims: dims.to_vec(),
            data,
        })
    }

    /// Array over a typed vector
    pub fn from_vec<T: ArrayElement>(dims: &[usize], values: Vec<T>) -> Result<Self, AcquisitionError> {
        Self::from_data(dims, T::wrap(values))
    }

    /// Dimensions, first varying fastest
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element type
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// The element buffer
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Typed view of the elements
    pub fn as_slice<T: ArrayElement>(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    /// Mutable typed view of the elements
    pub fn as_mut_slice<T: ArrayElement>(&mut self) -> Option<&mut [T]> {
        self.data.as_mut_slice()
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        NDARRAY_HEADER_SIZE + self.data.encoded_len()
    }

    /// Write the encoded record
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), AcquisitionError> {
        w.write_u16::<LittleEndian>(NDARRAY_VERSION)?;
        w.write_u16::<LittleEndian>(self.data_type().code())?;
        w.write_u16::<LittleEndian>(self.dims.len() as u16)?;
        for i in 0..MAX_DIMENSIONS {
            w.write_u64::<LittleEndian>(self.dims.get(i).copied().unwrap_or(0) as u64)?;
        }
        self.data.write_to(w)?;
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
        if bytes.len() < NDARRAY_HEADER_SIZE {
            return Err(AcquisitionError::Truncated {
                needed: NDARRAY_HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut r = Cursor::new(bytes);
        let version = r.read_u16::<LittleEndian>()?;
        if version != NDARRAY_VERSION {
            return Err(AcquisitionError::UnsupportedVersion(version));
        }
        let code = r.read_u16::<LittleEndian>()?;
        let data_type = DataType::from_code(code).ok_or(AcquisitionError::UnsupportedDataType(code))?;
        let ndim = r.read_u16::<LittleEndian>()? as usize;
        let mut stored = [0u64; MAX_DIMENSIONS];
        r.read_u64_into::<LittleEndian>(&mut stored)?;
        if ndim == 0 || ndim > MAX_DIMENSIONS {
            return Err(AcquisitionError::Malformed(format!("invalid dimension count {ndim}")));
        }
        if stored[ndim..].iter().any(|d| *d != 0) {
            return Err(AcquisitionError::Malformed("unused dimension slots must be zero".to_string()));
        }
        let dims = stored[..ndim]
            .iter()
            .map(|d| usize::try_from(*d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| AcquisitionError::Malformed("dimension exceeds address space".to_string()))?;

        let len = element_count(&dims)?;
        let needed = len
            .checked_mul(data_type.element_size())
            .and_then(|n| n.checked_add(NDARRAY_HEADER_SIZE))
            .ok_or_else(|| AcquisitionError::Malformed(format!("dimensions {dims:?} overflow")))?;
        check_exact(bytes.len(), needed, "array record")?;

        let data = ArrayData::read_from(&mut r, data_type, len)?;
        Ok(Self { dims, data })
    }
}

/// Compare a record's byte count against what its header implies
pub(crate) fn check_exact(available: usize, needed: usize, buffer: &'static str) -> Result<(), AcquisitionError> {
    if available < needed {
        return Err(AcquisitionError::Truncated { needed, available });
    }
    if available > needed {
        return Err(AcquisitionError::SizeMismatch {
            buffer,
            expected: needed,
            actual: available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> NdArray {
        let values: Vec<f32> = (0..24).map(|i| i as f32 * 0.5).collect();
        NdArray::from_vec(&[4, 3, 2], values).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let a = volume();
        let bytes = a.to_bytes().unwrap();
        assert_eq!(bytes.len(), NDARRAY_HEADER_SIZE + 24 * 4);
        assert_eq!(&bytes[..6], &[1, 0, 5, 0, 3, 0]);
        assert_eq!(NdArray::from_bytes(&bytes).unwrap(), a);
    }

    #[test]
    fn test_every_type_keeps_its_elements() {
        for t in DataType::ALL {
            let mut a = NdArray::new(t, &[3]).unwrap();
            match &mut a.data {
                ArrayData::Short(v) => v.copy_from_slice(&[-1, 0, i16::MAX]),
                ArrayData::CxDouble(v) => v[2] = Complex64::new(1.5, -2.5),
                _ => {}
            }
            let back = NdArray::from_bytes(&a.to_bytes().unwrap()).unwrap();
            assert_eq!(back.data_type(), t);
            assert_eq!(back, a);
        }
    }

    #[test]
    fn test_typed_views() {
        let mut a = volume();
        assert!(a.as_slice::<f64>().is_none());
        a.as_mut_slice::<f32>().unwrap()[23] = -1.0;
        assert_eq!(a.as_slice::<f32>().unwrap()[23], -1.0);
        assert_eq!(a.ndim(), 3);
    }

    #[test]
    fn test_shape_is_checked() {
        assert!(matches!(NdArray::new(DataType::Int, &[]), Err(AcquisitionError::Malformed(_))));
        assert!(matches!(
            NdArray::new(DataType::Int, &[1; MAX_DIMENSIONS + 1]),
            Err(AcquisitionError::Malformed(_))
        ));
        assert!(matches!(
            NdArray::from_vec(&[2, 2], vec![1u16, 2, 3]),
            Err(AcquisitionError::SizeMismatch { expected: 4, actual: 3, .. })
        ));
        assert!(matches!(
            NdArray::new(DataType::Int, &[usize::MAX, 2]),
            Err(AcquisitionError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_headers() {
        let bytes = volume().to_bytes().unwrap();

        let mut bad_type = bytes.clone();
        bad_type[2] = 9;
        assert!(matches!(
            NdArray::from_bytes(&bad_type),
            Err(AcquisitionError::UnsupportedDataType(9))
        ));

        let mut bad_version = bytes.clone();
        bad_version[0] = 2;
        assert!(matches!(
            NdArray::from_bytes(&bad_version),
            Err(AcquisitionError::UnsupportedVersion(2))
        ));

        let mut stray_dim = bytes.clone();
        stray_dim[6 + 8 * 5] = 1;
        assert!(matches!(
            NdArray::from_bytes(&stray_dim),
            Err(AcquisitionError::Malformed(_))
        ));

        let mut huge = bytes.clone();
        huge[6..14].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(NdArray::from_bytes(&huge).is_err());

        assert!(matches!(
            NdArray::from_bytes(&bytes[..bytes.len() - 1]),
            Err(AcquisitionError::Truncated { .. })
        ));
        let mut longer = bytes;
        longer.push(0);
        assert!(matches!(
            NdArray::from_bytes(&longer),
            Err(AcquisitionError::SizeMismatch { .. })
        ));
    }
}
