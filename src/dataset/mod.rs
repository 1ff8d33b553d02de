//! # ISMRMRD Dataset Module
//!
//! A dataset file holds one or more named groups (default `/dataset`). Each
//! group owns an XML header and append-only streams of acquisitions and
//! waveforms, addressed by a contiguous index starting at 0. Images and
//! n-dimensional arrays are kept in named variables of the group, each an
//! append-only stream of its own.
//!
//! ## File Format
//!
//! ```text
//! {name}.bin
//! ├── preamble                 # "ISMRMRD\0", format version, reserved
//! ├── block: group /dataset    # declares the group
//! ├── block: header /dataset   # XML text; later header blocks replace earlier ones
//! ├── block: acquisition ...   # encoded Acquisition, in append order
//! ├── block: waveform ...      # encoded Waveform, in append order
//! ├── block: image /dataset/v  # encoded Image of variable v
//! └── block: array /dataset/m  # encoded NdArray of variable m
//! ```
//!
//! Every block carries a CRC-32 over its bytes. An append is written in one
//! piece and flushed; a failed append is truncated away, and a block torn by
//! a crash is discarded on the next open.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ismrmrd::acquisition::Acquisition;
//! use ismrmrd::dataset::Dataset;
//! use ismrmrd::header::IsmrmrdHeader;
//!
//! let mut dataset = Dataset::open("scan.bin", "/dataset")?;
//! dataset.write_header(&IsmrmrdHeader::new(128_000_000))?;
//! dataset.append_acquisition(&Acquisition::new(256, 8, 0))?;
//! assert_eq!(dataset.acquisition_count()?, 1);
//! dataset.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod container;
mod error;
mod group;
#[cfg(feature = "parallel")]
mod parallel;
mod stats;
mod store;


pub use config::DatasetConfig;
pub use container::Dataset;
pub use error::DatasetError;
pub use group::{DEFAULT_GROUP, RESERVED_NAMES};
pub use stats::DatasetStats;
pub use store::{FORMAT_VERSION, MAGIC, PREAMBLE_SIZE};
