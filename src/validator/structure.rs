use std::path::Path;

use crate::dataset::{Dataset, DatasetConfig};

use super::{ValidationCheck, ValidationReport};

/// Step 1: open the container read-only and locate the group
///
/// Returns `None` when nothing further can be checked.
pub(crate) fn check_structure(
    path: &Path,
    group: &str,
    report: &mut ValidationReport,
) -> Option<Dataset> {
    let dataset = match Dataset::open_with_config(path, group, DatasetConfig::read_only()) {
        Ok(ds) => {
            report.add_check(ValidationCheck::ok("Container readable"));
            ds
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed("Container readable", e.to_string()));
            return None;
        }
    };

    match dataset.groups() {
        Ok(groups) if groups.iter().any(|g| g == group) => {
            report.add_check(ValidationCheck::ok(format!("Group {} present", group)));
            Some(dataset)
        }
        Ok(groups) => {
            let known = if groups.is_empty() {
                "file holds no groups".to_string()
            } else {
                format!("file holds {}", groups.join(", "))
            };
            report.add_check(ValidationCheck::failed(
                format!("Group {} present", group),
                known,
            ));
            None
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed(
                format!("Group {} present", group),
                e.to_string(),
            ));
            None
        }
    }
}
