/// Errors raised while building or decoding binary records
///
/// Shared by acquisitions, waveforms, images and arrays.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// A buffer length does not match the counts in the record header
    #[error("Buffer size mismatch for {buffer}: expected {expected} values, got {actual}")]
    SizeMismatch {
        /// Buffer name
        buffer: &'static str,
        /// Length implied by the header
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// The encoded record ends before its declared payload
    #[error("Truncated record: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required by the header
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// The record header carries a version this library cannot read
    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u16),

    /// The record declares an element type code this library does not know
    #[error("Unsupported data type code: {0}")]
    UnsupportedDataType(u16),

    /// The record's shape or text fields cannot be represented
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Underlying reader or writer failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
