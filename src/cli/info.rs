use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use ismrmrd::dataset::{Dataset, DatasetConfig, DatasetStats};
use ismrmrd::header::IsmrmrdHeader;

#[derive(Serialize)]
struct Info {
    file: String,
    #[serde(flatten)]
    stats: DatasetStats,
    groups_in_file: Vec<String>,
    image_variables: Vec<VariableSummary>,
    array_variables: Vec<VariableSummary>,
    header: Option<HeaderSummary>,
}

#[derive(Serialize)]
struct VariableSummary {
    name: String,
    count: u64,
}

#[derive(Serialize)]
struct HeaderSummary {
    resonance_frequency_hz: i64,
    system_vendor: Option<String>,
    receiver_channels: Option<u16>,
    encodings: Vec<EncodingSummary>,
    user_parameters: usize,
}

#[derive(Serialize)]
struct EncodingSummary {
    trajectory: String,
    encoded_matrix: [u16; 3],
    recon_matrix: [u16; 3],
}

impl HeaderSummary {
    fn new(header: &IsmrmrdHeader) -> Self {
        let system = header.acquisition_system_information.as_ref();
        let user = header.user_parameters.as_ref();
        Self {
            resonance_frequency_hz: header.resonance_frequency_hz(),
            system_vendor: system.and_then(|s| s.system_vendor.clone()),
            receiver_channels: system.and_then(|s| s.receiver_channels),
            encodings: header
                .encoding
                .iter()
                .map(|e| {
                    let enc = e.encoded_space.matrix_size;
                    let rec = e.recon_space.matrix_size;
                    EncodingSummary {
                        trajectory: e.trajectory.to_string(),
                        encoded_matrix: [enc.x, enc.y, enc.z],
                        recon_matrix: [rec.x, rec.y, rec.z],
                    }
                })
                .collect(),
            user_parameters: user.map_or(0, |u| {
                u.user_parameter_long.len()
                    + u.user_parameter_double.len()
                    + u.user_parameter_string.len()
                    + u.user_parameter_base64.len()
            }),
        }
    }
}

/// Display counts and a header summary for one group
pub fn run(file: PathBuf, group: String, json: bool) -> Result<()> {
    let mut dataset = Dataset::open_with_config(&file, &group, DatasetConfig::read_only())
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let header = dataset
        .read_header()
        .context("Failed to read header")?
        .map(|h| HeaderSummary::new(&h));
    let image_variables = dataset
        .image_variables()?
        .into_iter()
        .map(|name| -> Result<VariableSummary> {
            let count = dataset.image_count(&name)?;
            Ok(VariableSummary { name, count })
        })
        .collect::<Result<Vec<_>>>()?;
    let array_variables = dataset
        .array_variables()?
        .into_iter()
        .map(|name| -> Result<VariableSummary> {
            let count = dataset.array_count(&name)?;
            Ok(VariableSummary { name, count })
        })
        .collect::<Result<Vec<_>>>()?;
    let info = Info {
        file: file.display().to_string(),
        stats: dataset.stats()?,
        groups_in_file: dataset.groups()?,
        image_variables,
        array_variables,
        header,
    };
    dataset.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("ISMRMRD Dataset Information");
    println!("===========================");
    println!("File: {}", info.file);
    println!("Groups: {}", info.groups_in_file.join(", "));
    println!();

    println!("Group {}:", info.stats.group);
    println!("  Acquisitions: {}", info.stats.acquisitions);
    println!("  Waveforms: {}", info.stats.waveforms);
    for v in &info.image_variables {
        println!("  Images {}: {}", v.name, v.count);
    }
    for v in &info.array_variables {
        println!("  Arrays {}: {}", v.name, v.count);
    }
    println!("  File size: {} bytes", info.stats.file_size_bytes);
    println!();

    match &info.header {
        None => println!("Header: <none>"),
        Some(h) => {
            println!("Header:");
            println!("  H1 resonance frequency: {} Hz", h.resonance_frequency_hz);
            if let Some(vendor) = &h.system_vendor {
                println!("  System vendor: {}", vendor);
            }
            if let Some(channels) = h.receiver_channels {
                println!("  Receiver channels: {}", channels);
            }
            for (i, e) in h.encodings.iter().enumerate() {
                println!(
                    "  Encoding {}: {} {}x{}x{} (recon {}x{}x{})",
                    i,
                    e.trajectory,
                    e.encoded_matrix[0],
                    e.encoded_matrix[1],
                    e.encoded_matrix[2],
                    e.recon_matrix[0],
                    e.recon_matrix[1],
                    e.recon_matrix[2]
                );
            }
            println!("  User parameters: {}", h.user_parameters);
        }
    }

    Ok(())
}
