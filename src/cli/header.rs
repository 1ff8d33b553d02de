use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;

use ismrmrd::dataset::{Dataset, DatasetConfig};
use ismrmrd::header;

/// Print the stored header text of a group
pub fn dump(file: PathBuf, group: String) -> Result<()> {
    let mut dataset = Dataset::open_with_config(&file, &group, DatasetConfig::read_only())
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let Some(text) = dataset.read_header_text().context("Failed to read header")? else {
        bail!("Group {} of {} has no header", group, file.display());
    };
    dataset.close()?;

    println!("{}", text);
    Ok(())
}

/// Decode an XML header file and print its canonical encoding
pub fn check(xml: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&xml)
        .with_context(|| format!("Failed to read {}", xml.display()))?;

    let decoded = header::decode(&text)
        .with_context(|| format!("{} is not a valid ISMRMRD header", xml.display()))?;
    info!(
        "Decoded header: {} encodings, H1 {} Hz",
        decoded.encoding.len(),
        decoded.resonance_frequency_hz()
    );

    let canonical = header::encode(&decoded).context("Failed to re-encode header")?;
    let again = header::decode(&canonical).context("Re-encoded header does not decode")?;
    if again != decoded {
        bail!("Re-encoded header decodes to a different value");
    }

    println!("{}", canonical);
    Ok(())
}
