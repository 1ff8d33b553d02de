//! # ISMRMRD XML header
//!
//! Every dataset carries one XML document describing the subject, the
//! scanner, the experimental conditions and one or more encoding spaces.
//! This module holds the typed model of that document ([`IsmrmrdHeader`])
//! and a validating codec for it.
//!
//! ## Usage
//!
//! ```rust
//! use ismrmrd::header::{decode, encode, IsmrmrdHeader};
//!
//! let mut header = IsmrmrdHeader::new(63_500_000);
//! header.user_parameters_mut().set_long("averages", 2i64);
//!
//! let xml = encode(&header).unwrap();
//! let back = decode(&xml).unwrap();
//! assert_eq!(back, header);
//! ```
//!
//! ## Round trips
//!
//! Absent optional groups stay absent. Elements the schema does not define
//! are kept as [`Element`] trees when they appear at the top level or inside
//! `userParameters`; anywhere else they are rejected.

mod decode;
mod encode;
mod error;
mod model;
mod node;

pub use decode::decode;
pub use encode::{encode, header_element};
pub use error::HeaderError;
pub use model::*;
pub use node::{parse_document, write_element, Element, Node};

/// Default namespace of the header document
pub const ISMRMRD_NAMESPACE: &str = "http://www.ismrm.org/ISMRMRD";

/// Value written to `xsi:schemaLocation` on the root element
pub const ISMRMRD_SCHEMA_LOCATION: &str = "http://www.ismrm.org/ISMRMRD ismrmrd.xsd";
