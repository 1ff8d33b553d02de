//! # ismrmrd - MRI Raw Data Containers
//!
//! `ismrmrd` reads and writes ISMRM Raw Data: the XML experiment header,
//! the fixed-layout acquisition records that carry k-space readouts, and a
//! single-file container that groups both.
//!
//! ## Key Features
//!
//! - **Typed Header Model**: every header group is a plain struct with
//!   `Option`/`Vec` fields, decoded and encoded by an explicit, validating
//!   XML codec. Unknown top-level and user-parameter elements survive a
//!   round trip.
//!
//! - **Acquisition Records**: a packed little-endian header plus
//!   trajectory and complex sample buffers whose lengths always match the
//!   header's sample, channel and trajectory counts.
//!
//! - **Images and Arrays**: reconstructed images and n-dimensional arrays
//!   of any supported element type, stored under named variables.
//!
//! - **Append-Only Container**: named groups hold a header, indexed
//!   acquisition and waveform streams, and image and array variables.
//!   Every block is checksummed; an interrupted append is dropped on the
//!   next open.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ismrmrd::prelude::*;
//!
//! let mut dataset = Dataset::open("scan.bin", DEFAULT_GROUP)?;
//! dataset.write_header(&IsmrmrdHeader::new(128_000_000))?;
//!
//! let mut acq = Acquisition::new(256, 8, 0);
//! acq.set_flag(AcquisitionFlag::LastInMeasurement);
//! dataset.append_acquisition(&acq)?;
//! dataset.close()?;
//!
//! let mut dataset = Dataset::open("scan.bin", DEFAULT_GROUP)?;
//! assert_eq!(dataset.acquisition_count()?, 1);
//! let header = dataset.read_header()?.expect("header written above");
//! assert_eq!(header.resonance_frequency_hz(), 128_000_000);
//! # Ok::<(), ismrmrd::dataset::DatasetError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`header`]: header model and XML codec
//! - [`acquisition`]: acquisition header, flags and record codec
//! - [`waveform`]: physiological waveform records
//! - [`image`]: reconstructed image records
//! - [`ndarray`]: n-dimensional arrays and the typed element buffer
//! - [`dataset`]: container file with named groups
//! - [`validator`]: consistency report over one group

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod acquisition;
pub mod dataset;
pub mod header;
pub mod image;
pub mod ndarray;
pub mod validator;
pub mod waveform;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::acquisition::{Acquisition, AcquisitionFlag, AcquisitionHeader, FlagBits};
    pub use crate::dataset::{Dataset, DatasetConfig, DatasetError, DEFAULT_GROUP};
    pub use crate::header::{Encoding, EncodingSpace, HeaderError, IsmrmrdHeader, Trajectory};
    pub use crate::image::{Image, ImageHeader, ImageType};
    pub use crate::ndarray::{ArrayData, DataType, NdArray};
    pub use crate::waveform::{Waveform, WaveformHeader};
    pub use num_complex::Complex32;
}
