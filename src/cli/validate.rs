use anyhow::Result;
use log::info;
use std::path::PathBuf;

/// Validate one group of a dataset file
pub fn run(file: PathBuf, group: String) -> Result<()> {
    use ismrmrd::validator::validate_dataset;

    info!("ISMRMRD Validator");
    info!("=================");
    info!("File: {}", file.display());
    info!("Group: {}", group);

    match validate_dataset(&file, &group) {
        Ok(report) => {
            println!("{}", report.format_colored());

            // Exit with error code if validation failed
            if report.has_failures() {
                std::process::exit(1);
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Validation error: {}", e);
            std::process::exit(1);
        }
    }
}
