use anyhow::{bail, Context, Result};
use log::info;
use num_complex::Complex32;
use std::f32::consts::PI;
use std::path::PathBuf;

use ismrmrd::acquisition::{Acquisition, AcquisitionFlag};
use ismrmrd::dataset::{Dataset, DatasetConfig};
use ismrmrd::header::{
    AcquisitionSystemInformation, Encoding, EncodingSpace, FieldOfView, IsmrmrdHeader, Limit,
    MatrixSize, MeasurementInformation, PatientPosition, SequenceParameters, Trajectory,
};

use super::config::{Config, DemoConfig};

const FOV_MM: f32 = 256.0;

/// Write a synthetic fully sampled Cartesian scan
pub fn run(output: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let demo = match config {
        Some(path) => Config::from_file(&path)?.demo,
        None => DemoConfig::default(),
    };
    if demo.samples == 0 || demo.phase_encodes == 0 || demo.channels == 0 {
        bail!("samples, phase_encodes and channels must be non-zero");
    }

    info!("ISMRMRD Demo Writer");
    info!("===================");
    info!(
        "{} lines x {} samples x {} channels into {} ({})",
        demo.phase_encodes,
        demo.samples,
        demo.channels,
        output.display(),
        demo.group
    );

    let dataset_config = DatasetConfig::default().with_sync_on_write(demo.sync_on_write);
    let mut dataset = Dataset::open_with_config(&output, &demo.group, dataset_config)
        .with_context(|| format!("Failed to open {}", output.display()))?;

    if dataset.acquisition_count()? > 0 {
        bail!(
            "Group {} of {} already holds acquisitions",
            demo.group,
            output.display()
        );
    }

    dataset
        .write_header(&build_header(&demo))
        .context("Failed to write header")?;

    for line in 0..demo.phase_encodes {
        dataset
            .append_acquisition(&build_line(&demo, line))
            .with_context(|| format!("Failed to append line {}", line))?;

        if (line + 1) % 32 == 0 {
            info!("  Written {} lines...", line + 1);
        }
    }

    let stats = dataset.stats()?;
    dataset.close().context("Failed to close dataset")?;

    info!("Demo complete!");
    info!("  {}", stats);
    println!("{}", stats);
    Ok(())
}

/// Header describing the demo geometry
pub fn build_header(demo: &DemoConfig) -> IsmrmrdHeader {
    let mut header = IsmrmrdHeader::new(demo.resonance_frequency_hz);

    header.measurement_information = Some(MeasurementInformation {
        protocol_name: Some("ismrmrd-tool demo".to_string()),
        ..MeasurementInformation::new(PatientPosition::Hfs)
    });
    header.acquisition_system_information = Some(AcquisitionSystemInformation {
        system_vendor: Some("synthetic".to_string()),
        receiver_channels: Some(demo.channels),
        ..Default::default()
    });

    let space = EncodingSpace {
        matrix_size: MatrixSize {
            x: demo.samples,
            y: demo.phase_encodes,
            z: 1,
        },
        field_of_view_mm: FieldOfView {
            x: FOV_MM,
            y: FOV_MM,
            z: 5.0,
        },
    };
    let mut encoding = Encoding::new(space, Trajectory::Cartesian);
    encoding.encoding_limits.kspace_encoding_step_1 =
        Some(Limit::new(0, demo.phase_encodes - 1, demo.phase_encodes / 2));
    encoding.encoding_limits.slice = Some(Limit::new(0, 0, 0));
    header.encoding.push(encoding);

    header.sequence_parameters = Some(SequenceParameters {
        tr: vec![5.0],
        te: vec![2.5],
        ..Default::default()
    });

    header
}

/// One phase encoding line of a rectangle phantom seen by phase-rotated coils
pub fn build_line(demo: &DemoConfig, line: u16) -> Acquisition {
    let mut acq = Acquisition::new(demo.samples, demo.channels, 0);
    let last = demo.phase_encodes - 1;

    acq.update_head(|h| {
        h.scan_counter = u32::from(line);
        h.available_channels = demo.channels;
        h.center_sample = demo.samples / 2;
        h.sample_time_us = 5.0;
        h.read_dir = [1.0, 0.0, 0.0];
        h.phase_dir = [0.0, 1.0, 0.0];
        h.slice_dir = [0.0, 0.0, 1.0];
        h.idx.kspace_encode_step_1 = line;
    });
    for c in 0..demo.channels {
        acq.set_channel_active(c);
    }

    if line == 0 {
        acq.set_flag(AcquisitionFlag::FirstInEncodeStep1);
        acq.set_flag(AcquisitionFlag::FirstInSlice);
    }
    if line == last {
        acq.set_flag(AcquisitionFlag::LastInEncodeStep1);
        acq.set_flag(AcquisitionFlag::LastInSlice);
        acq.set_flag(AcquisitionFlag::LastInMeasurement);
    }

    let ky = f32::from(line) - f32::from(demo.phase_encodes / 2);
    let row = sinc(PI * ky / 4.0);
    for c in 0..demo.channels {
        let coil = Complex32::from_polar(
            1.0 / (1.0 + 0.1 * f32::from(c)),
            2.0 * PI * f32::from(c) / f32::from(demo.channels),
        );
        for s in 0..demo.samples {
            let kx = f32::from(s) - f32::from(demo.samples / 2);
            if let Some(z) = acq.sample_mut(s, c) {
                *z = coil * (row * sinc(PI * kx / 4.0));
            }
        }
    }
    acq
}

fn sinc(x: f32) -> f32 {
    if x.abs() < 1e-6 {
        1.0
    } else {
        x.sin() / x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ismrmrd::header;

    fn small() -> DemoConfig {
        DemoConfig {
            samples: 16,
            phase_encodes: 8,
            channels: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_round_trips() {
        let h = build_header(&small());
        let text = header::encode(&h).unwrap();
        assert_eq!(header::decode(&text).unwrap(), h);
        assert_eq!(h.encoding[0].encoded_space.matrix_size.y, 8);
    }

    #[test]
    fn test_lines_peak_at_center() {
        let demo = small();
        let center = build_line(&demo, 4);
        let edge = build_line(&demo, 0);

        let peak = center.sample(8, 0).unwrap();
        assert!((peak.norm() - 1.0).abs() < 1e-5);
        assert!(edge.sample(8, 0).unwrap().norm() < peak.norm());
        assert_eq!(center.head().active_channel_count(), 2);
    }

    #[test]
    fn test_line_flags() {
        let demo = small();
        assert!(build_line(&demo, 0).is_flag_set(AcquisitionFlag::FirstInSlice));
        let last = build_line(&demo, 7);
        assert!(last.is_flag_set(AcquisitionFlag::LastInMeasurement));
        assert!(!last.is_flag_set(AcquisitionFlag::FirstInSlice));
    }
}
