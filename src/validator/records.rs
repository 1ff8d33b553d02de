use std::fmt;

use anyhow::Result;
use log::debug;

use crate::acquisition::Acquisition;
use crate::dataset::Dataset;
use crate::header::IsmrmrdHeader;

use super::{ValidationCheck, ValidationReport};

const MAX_EXAMPLES: usize = 3;

/// Offending records of one rule, with the first few kept as examples
#[derive(Default)]
struct Findings {
    count: u64,
    examples: Vec<(u64, String)>,
}

impl Findings {
    fn note(&mut self, index: u64, message: impl Into<String>) {
        self.count += 1;
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push((index, message.into()));
        }
    }

    fn into_check(self, name: &str, total: u64, fatal: bool) -> ValidationCheck {
        if self.count == 0 {
            return ValidationCheck::ok(name);
        }
        let message = format!("{} of {} records: {}", self.count, total, self);
        if fatal {
            ValidationCheck::failed(name, message)
        } else {
            ValidationCheck::warning(name, message)
        }
    }
}

impl fmt::Display for Findings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (index, message)) in self.examples.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "#{} {}", index, message)?;
        }
        if self.count > self.examples.len() as u64 {
            write!(f, "; ...")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct AcquisitionRules {
    unreadable: Findings,
    encoding_refs: Findings,
    limits: Findings,
    channels: Findings,
    masks: Findings,
}

impl AcquisitionRules {
    fn apply(&mut self, index: u64, acq: &Acquisition, header: Option<&IsmrmrdHeader>) {
        let head = acq.head();

        let mask_count = head.active_channel_count();
        if mask_count != 0 && mask_count != u32::from(head.active_channels) {
            self.masks.note(
                index,
                format!(
                    "mask enables {} channels, record stores {}",
                    mask_count, head.active_channels
                ),
            );
        }

        let Some(header) = header else {
            return;
        };

        if !header.encoding.is_empty() {
            match header.encoding.get(usize::from(head.encoding_space_ref)) {
                Some(encoding) => {
                    let limits = encoding.encoding_limits.entries();
                    for (name, value) in head.idx.limited() {
                        let limit = limits.iter().find(|(n, _)| *n == name).and_then(|(_, l)| *l);
                        if let Some(limit) = limit {
                            if !limit.contains(value) {
                                self.limits.note(
                                    index,
                                    format!(
                                        "{} = {} outside [{}, {}]",
                                        name, value, limit.minimum, limit.maximum
                                    ),
                                );
                            }
                        }
                    }
                }
                None => self.encoding_refs.note(
                    index,
                    format!(
                        "encoding_space_ref {} but header declares {} encodings",
                        head.encoding_space_ref,
                        header.encoding.len()
                    ),
                ),
            }
        }

        let receivers = header
            .acquisition_system_information
            .as_ref()
            .and_then(|a| a.receiver_channels);
        if let Some(receivers) = receivers {
            if head.active_channels > receivers {
                self.channels.note(
                    index,
                    format!(
                        "{} active channels, receiverChannels is {}",
                        head.active_channels, receivers
                    ),
                );
            }
        }
    }
}

/// Step 3: every acquisition decodes and agrees with the header
pub(crate) fn check_acquisitions(
    dataset: &mut Dataset,
    header: Option<&IsmrmrdHeader>,
    report: &mut ValidationReport,
) -> Result<()> {
    let total = dataset.acquisition_count()?;
    debug!("Validating {} acquisitions", total);

    let mut rules = AcquisitionRules::default();
    for index in 0..total {
        match dataset.read_acquisition(index) {
            Ok(acq) => rules.apply(index, &acq, header),
            Err(e) => rules.unreadable.note(index, e.to_string()),
        }
    }

    report.add_check(rules.unreadable.into_check("Acquisitions decode", total, true));
    report.add_check(rules.masks.into_check("Channel masks match active channels", total, false));

    if let Some(header) = header {
        if !header.encoding.is_empty() {
            report.add_check(rules.encoding_refs.into_check("Encoding space references", total, true));
            report.add_check(rules.limits.into_check("Encoding counters within limits", total, false));
        }
        let declares_receivers = header
            .acquisition_system_information
            .as_ref()
            .is_some_and(|a| a.receiver_channels.is_some());
        if declares_receivers {
            report.add_check(rules.channels.into_check("Active channels within receiverChannels", total, true));
        }
    }
    Ok(())
}

/// Step 4: every waveform decodes
pub(crate) fn check_waveforms(
    dataset: &mut Dataset,
    header: Option<&IsmrmrdHeader>,
    report: &mut ValidationReport,
) -> Result<()> {
    let total = dataset.waveform_count()?;
    if total == 0 {
        return Ok(());
    }
    debug!("Validating {} waveforms", total);

    let mut unreadable = Findings::default();
    for index in 0..total {
        if let Err(e) = dataset.read_waveform(index) {
            unreadable.note(index, e.to_string());
        }
    }
    report.add_check(unreadable.into_check("Waveforms decode", total, true));

    if header.is_some_and(|h| h.waveform_information.is_empty()) {
        report.add_check(ValidationCheck::warning(
            "Waveforms declared",
            format!("{} waveforms stored but header has no waveformInformation", total),
        ));
    }
    Ok(())
}

/// Step 5: every image and array of every variable decodes
pub(crate) fn check_variables(dataset: &mut Dataset, report: &mut ValidationReport) -> Result<()> {
    for variable in dataset.image_variables()? {
        let total = dataset.image_count(&variable)?;
        debug!("Validating {} images of {}", total, variable);
        let mut unreadable = Findings::default();
        for index in 0..total {
            if let Err(e) = dataset.read_image(&variable, index) {
                unreadable.note(index, e.to_string());
            }
        }
        let name = format!("Images of {} decode", variable);
        report.add_check(unreadable.into_check(&name, total, true));
    }

    for variable in dataset.array_variables()? {
        let total = dataset.array_count(&variable)?;
        debug!("Validating {} arrays of {}", total, variable);
        let mut unreadable = Findings::default();
        for index in 0..total {
            if let Err(e) = dataset.read_array(&variable, index) {
                unreadable.note(index, e.to_string());
            }
        }
        let name = format!("Arrays of {} decode", variable);
        report.add_check(unreadable.into_check(&name, total, true));
    }
    Ok(())
}
