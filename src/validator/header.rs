use crate::dataset::Dataset;
use crate::header::{self, IsmrmrdHeader};

use super::{ValidationCheck, ValidationReport};

/// Step 2: the stored header decodes and survives a re-encode
pub(crate) fn check_header(
    dataset: &mut Dataset,
    report: &mut ValidationReport,
) -> Option<IsmrmrdHeader> {
    let text = match dataset.read_header_text() {
        Ok(Some(text)) => text,
        Ok(None) => {
            report.add_check(ValidationCheck::warning(
                "Header present",
                "no XML header has been written",
            ));
            return None;
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed("Header present", e.to_string()));
            return None;
        }
    };
    report.add_check(ValidationCheck::ok("Header present"));

    let decoded = match header::decode(&text) {
        Ok(h) => {
            report.add_check(ValidationCheck::ok("Header decodes"));
            h
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed("Header decodes", e.to_string()));
            return None;
        }
    };

    let round_trip = header::encode(&decoded).and_then(|text| header::decode(&text));
    match round_trip {
        Ok(again) if again == decoded => {
            report.add_check(ValidationCheck::ok("Header round trip"));
        }
        Ok(_) => report.add_check(ValidationCheck::failed(
            "Header round trip",
            "re-encoded header decodes to a different value",
        )),
        Err(e) => report.add_check(ValidationCheck::failed("Header round trip", e.to_string())),
    }

    if decoded.encoding.is_empty() {
        report.add_check(ValidationCheck::warning(
            "Encoding declared",
            "header has no encoding element",
        ));
    } else {
        report.add_check(ValidationCheck::ok("Encoding declared"));
    }

    Some(decoded)
}
