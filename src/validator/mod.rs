//! # ISMRMRD Validation Module
//!
//! Consistency checks over one group of a dataset file. The file is opened
//! read-only and never modified.
//!
//! ## Validation Checklist
//!
//! 1. **Structure**: the container opens and holds the group
//! 2. **Header**: the XML header is present, decodes and re-encodes losslessly
//! 3. **Acquisitions**: every record decodes; encoding space references,
//!    encoding counters and channel counts agree with the header
//! 4. **Waveforms**: every record decodes
//! 5. **Images and arrays**: every record of every variable decodes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ismrmrd::validator::validate_dataset;
//! use std::path::Path;
//!
//! match validate_dataset(Path::new("scan.bin"), "/dataset") {
//!     Ok(report) => println!("{}", report),
//!     Err(e) => eprintln!("Validation failed: {}", e),
//! }
//! ```

use std::path::Path;

use anyhow::Result;

pub use report::{CheckStatus, ValidationCheck, ValidationReport};

mod header;
mod records;
mod report;
mod structure;

/// Run every check against `group` of the file at `path`
pub fn validate_dataset(path: &Path, group: &str) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(path.display().to_string(), group);

    // 1. Structure
    let Some(mut dataset) = structure::check_structure(path, group, &mut report) else {
        return Ok(report);
    };

    // 2. Header
    let header = header::check_header(&mut dataset, &mut report);

    // 3. Acquisitions
    records::check_acquisitions(&mut dataset, header.as_ref(), &mut report)?;

    // 4. Waveforms
    records::check_waveforms(&mut dataset, header.as_ref(), &mut report)?;

    // 5. Images and arrays
    records::check_variables(&mut dataset, &mut report)?;

    dataset.close()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Acquisition;
    use crate::dataset::Dataset;
    use crate::header::{
        AcquisitionSystemInformation, Encoding, EncodingSpace, IsmrmrdHeader, Limit, Trajectory,
    };
    use crate::image::Image;
    use crate::ndarray::{DataType, NdArray};
    use crate::waveform::Waveform;
    use tempfile::tempdir;

    fn header() -> IsmrmrdHeader {
        let mut header = IsmrmrdHeader::new(128_000_000);
        let mut encoding = Encoding::new(EncodingSpace::default(), Trajectory::Cartesian);
        encoding.encoding_limits.kspace_encoding_step_1 = Some(Limit::new(0, 15, 8));
        header.encoding.push(encoding);
        header.acquisition_system_information = Some(AcquisitionSystemInformation {
            receiver_channels: Some(4),
            ..Default::default()
        });
        header
    }

    fn line(step: u16, channels: u16) -> Acquisition {
        let mut acq = Acquisition::new(8, channels, 0);
        acq.update_head(|h| h.idx.kspace_encode_step_1 = step);
        acq
    }

    fn status(report: &ValidationReport, name: &str) -> CheckStatus {
        report
            .check(name)
            .unwrap_or_else(|| panic!("missing check {:?}\n{}", name, report))
            .status
            .clone()
    }

    #[test]
    fn test_validation_report_display() {
        let mut report = ValidationReport::new("test.bin", "/dataset");
        report.add_check(ValidationCheck::ok("Test check 1"));
        report.add_check(ValidationCheck::warning("Test check 2", "This is a warning"));
        report.add_check(ValidationCheck::failed("Test check 3", "This failed"));

        let output = format!("{}", report);
        assert!(output.contains("✓"));
        assert!(output.contains("⚠"));
        assert!(output.contains("✗"));
        assert!(output.contains("Group: /dataset"));
        assert!(output.contains("1 passed, 1 warnings, 1 failed"));
        assert!(output.contains("Validation FAILED"));
    }

    #[test]
    fn test_consistent_dataset_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("good.bin");

        let mut ds = Dataset::open(&path, "/dataset").unwrap();
        ds.write_header(&header()).unwrap();
        for step in 0..16 {
            ds.append_acquisition(&line(step, 4)).unwrap();
        }
        ds.close().unwrap();

        let report = validate_dataset(&path, "/dataset").unwrap();
        assert!(!report.has_failures(), "{}", report);
        assert!(!report.has_warnings(), "{}", report);
        assert_eq!(status(&report, "Encoding counters within limits"), CheckStatus::Ok);
    }

    #[test]
    fn test_inconsistent_records_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bin");

        let mut ds = Dataset::open(&path, "/dataset").unwrap();
        ds.write_header(&header()).unwrap();
        ds.append_acquisition(&line(3, 4)).unwrap();
        ds.append_acquisition(&line(40, 4)).unwrap();
        ds.append_acquisition(&line(3, 8)).unwrap();
        let mut stray = line(3, 4);
        stray.update_head(|h| h.encoding_space_ref = 2);
        ds.append_acquisition(&stray).unwrap();
        let mut masked = line(3, 2);
        masked.set_channel_active(0);
        ds.append_acquisition(&masked).unwrap();
        ds.close().unwrap();

        let report = validate_dataset(&path, "/dataset").unwrap();
        assert!(report.has_failures());
        assert_eq!(status(&report, "Acquisitions decode"), CheckStatus::Ok);
        assert!(matches!(
            status(&report, "Encoding counters within limits"),
            CheckStatus::Warning(msg) if msg.contains("#1") && msg.contains("kspace_encoding_step_1 = 40")
        ));
        assert!(matches!(
            status(&report, "Active channels within receiverChannels"),
            CheckStatus::Failed(msg) if msg.starts_with("1 of 5")
        ));
        assert!(matches!(
            status(&report, "Encoding space references"),
            CheckStatus::Failed(msg) if msg.contains("#3")
        ));
        assert!(matches!(
            status(&report, "Channel masks match active channels"),
            CheckStatus::Warning(msg) if msg.contains("#4")
        ));
    }

    #[test]
    fn test_missing_header_warns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.bin");

        let mut ds = Dataset::open(&path, "/dataset").unwrap();
        ds.append_acquisition(&line(0, 1)).unwrap();
        ds.append_waveform(&Waveform::new(4, 1)).unwrap();
        ds.close().unwrap();

        let report = validate_dataset(&path, "/dataset").unwrap();
        assert!(!report.has_failures(), "{}", report);
        assert!(matches!(status(&report, "Header present"), CheckStatus::Warning(_)));
        assert_eq!(status(&report, "Waveforms decode"), CheckStatus::Ok);
        assert!(report.check("Waveforms declared").is_none());
    }

    #[test]
    fn test_image_and_array_variables_are_checked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recon.bin");

        let mut ds = Dataset::open(&path, "/dataset").unwrap();
        ds.write_header(&header()).unwrap();
        ds.append_image("image_0", &Image::new(DataType::UShort, [8, 8, 1], 1)).unwrap();
        ds.append_image("image_0", &Image::new(DataType::UShort, [8, 8, 1], 1)).unwrap();
        ds.append_array("noise", &NdArray::new(DataType::CxFloat, &[4, 4]).unwrap()).unwrap();
        ds.close().unwrap();

        let report = validate_dataset(&path, "/dataset").unwrap();
        assert!(!report.has_failures(), "{}", report);
        assert_eq!(status(&report, "Images of image_0 decode"), CheckStatus::Ok);
        assert_eq!(status(&report, "Arrays of noise decode"), CheckStatus::Ok);
    }

    #[test]
    fn test_undecodable_header_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("xml.bin");

        let mut ds = Dataset::open(&path, "/dataset").unwrap();
        ds.write_header_text("<ismrmrdHeader/>").unwrap();
        ds.close().unwrap();

        let report = validate_dataset(&path, "/dataset").unwrap();
        assert!(matches!(status(&report, "Header decodes"), CheckStatus::Failed(_)));
    }

    #[test]
    fn test_missing_group_and_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("groups.bin");
        Dataset::open(&path, "/dataset").unwrap().close().unwrap();

        let report = validate_dataset(&path, "/other").unwrap();
        assert!(matches!(
            status(&report, "Group /other present"),
            CheckStatus::Failed(msg) if msg.contains("/dataset")
        ));

        let report = validate_dataset(&dir.path().join("absent.bin"), "/dataset").unwrap();
        assert!(matches!(status(&report, "Container readable"), CheckStatus::Failed(_)));
        assert_eq!(report.checks.len(), 1);
    }
}
