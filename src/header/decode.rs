//! XML text to [`IsmrmrdHeader`]

use std::fmt::Display;
use std::str::FromStr;

use super::encode::ROOT_NAMESPACES;
use super::model::*;
use super::node::{parse_document, Element};
use super::{HeaderError, ISMRMRD_NAMESPACE};

/// Decode an ISMRMRD header document
///
/// The document must be well-formed XML with an `ismrmrdHeader` root. Every
/// schema group is validated while it is mapped: missing mandatory elements,
/// repeated singletons, unknown children, bad numbers and unknown
/// enumeration literals all yield [`HeaderError::MalformedDocument`].
/// Unknown top-level elements and unknown entries inside `userParameters`
/// are preserved, each carrying the namespace declarations it needs from
/// the root.
pub fn decode(text: &str) -> Result<IsmrmrdHeader, HeaderError> {
    let root = parse_document(text)?;

    if root.local_name() != "ismrmrdHeader" {
        return Err(HeaderError::malformed(format!(
            "expected <ismrmrdHeader> root, found <{}>",
            root.name
        )));
    }
    if let Some(ns) = root.attribute("xmlns") {
        if ns != ISMRMRD_NAMESPACE {
            return Err(HeaderError::malformed(format!(
                "unexpected default namespace {:?}",
                ns
            )));
        }
    }

    let mut c = Children::new(&root)?;
    let mut header = IsmrmrdHeader {
        version: c.opt_value("version")?,
        subject_information: c.opt("subjectInformation", subject_information)?,
        study_information: c.opt("studyInformation", study_information)?,
        measurement_information: c.opt("measurementInformation", measurement_information)?,
        acquisition_system_information: c
            .opt("acquisitionSystemInformation", acquisition_system_information)?,
        experimental_conditions: c.req("experimentalConditions", experimental_conditions)?,
        encoding: c.all("encoding", encoding)?,
        sequence_parameters: c.opt("sequenceParameters", sequence_parameters)?,
        user_parameters: c.opt("userParameters", user_parameters)?,
        waveform_information: c.all("waveformInformation", waveform_information)?,
        extensions: c.rest(),
    };

    localize_namespaces(&mut header.extensions, &root)?;
    if let Some(u) = &mut header.user_parameters {
        localize_namespaces(&mut u.extensions, &root)?;
    }
    for w in &mut header.waveform_information {
        if let Some(u) = &mut w.user_parameters {
            localize_namespaces(&mut u.extensions, &root)?;
        }
    }
    Ok(header)
}

/// Copy root `xmlns:*` declarations onto the extensions that use them
fn localize_namespaces(extensions: &mut [Element], root: &Element) -> Result<(), HeaderError> {
    for ext in extensions {
        for prefix in ext.undeclared_prefixes() {
            let key = format!("xmlns:{}", prefix);
            let uri = root.attribute(&key).ok_or_else(|| {
                HeaderError::malformed(format!(
                    "undeclared namespace prefix {:?} in <{}>",
                    prefix, ext.name
                ))
            })?;
            if ROOT_NAMESPACES
                .iter()
                .any(|&(p, u)| p == prefix && u == uri)
            {
                continue;
            }
            let uri = uri.to_string();
            ext.attributes.push((key, uri));
        }
    }
    Ok(())
}

/// Child elements of one group, tracked so leftovers can be reported
struct Children<'a> {
    parent: &'a str,
    items: Vec<(&'a Element, bool)>,
}

impl<'a> Children<'a> {
    fn new(parent: &'a Element) -> Result<Self, HeaderError> {
        if !parent.text().trim().is_empty() {
            return Err(HeaderError::malformed(format!(
                "unexpected character data in <{}>",
                parent.name
            )));
        }
        Ok(Self {
            parent: parent.local_name(),
            items: parent.elements().map(|e| (e, false)).collect(),
        })
    }

    fn take(&mut self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for (element, used) in self.items.iter_mut() {
            if !*used && element.local_name() == name {
                *used = true;
                found.push(*element);
            }
        }
        found
    }

    fn take_single(&mut self, name: &str) -> Result<Option<&'a Element>, HeaderError> {
        let mut found = self.take(name);
        if found.len() > 1 {
            return Err(HeaderError::malformed(format!(
                "<{}> appears {} times in <{}>",
                name,
                found.len(),
                self.parent
            )));
        }
        Ok(found.pop())
    }

    fn opt<T>(
        &mut self,
        name: &str,
        map: fn(&Element) -> Result<T, HeaderError>,
    ) -> Result<Option<T>, HeaderError> {
        self.take_single(name)?.map(map).transpose()
    }

    fn req<T>(
        &mut self,
        name: &str,
        map: fn(&Element) -> Result<T, HeaderError>,
    ) -> Result<T, HeaderError> {
        match self.take_single(name)? {
            Some(e) => map(e),
            None => Err(self.missing(name)),
        }
    }

    fn all<T>(
        &mut self,
        name: &str,
        map: fn(&Element) -> Result<T, HeaderError>,
    ) -> Result<Vec<T>, HeaderError> {
        self.take(name).into_iter().map(map).collect()
    }

    fn opt_value<T>(&mut self, name: &str) -> Result<Option<T>, HeaderError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.take_single(name)?.map(value::<T>).transpose()
    }

    fn req_value<T>(&mut self, name: &str) -> Result<T, HeaderError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.take_single(name)? {
            Some(e) => value(e),
            None => Err(self.missing(name)),
        }
    }

    fn values<T>(&mut self, name: &str) -> Result<Vec<T>, HeaderError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.take(name).into_iter().map(value::<T>).collect()
    }

    fn missing(&self, name: &str) -> HeaderError {
        HeaderError::malformed(format!("missing <{}> in <{}>", name, self.parent))
    }

    /// Unconsumed children, cloned
    fn rest(self) -> Vec<Element> {
        self.items
            .into_iter()
            .filter(|(_, used)| !used)
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// Fail if any child was not consumed
    fn finish(self) -> Result<(), HeaderError> {
        match self.items.iter().find(|(_, used)| !used) {
            Some((e, _)) => Err(HeaderError::malformed(format!(
                "unexpected <{}> in <{}>",
                e.name, self.parent
            ))),
            None => Ok(()),
        }
    }
}

/// Parse the text content of a leaf element
///
/// Strings keep their text verbatim. Numbers and enumeration literals
/// tolerate surrounding whitespace.
fn value<T>(element: &Element) -> Result<T, HeaderError>
where
    T: FromStr,
    T::Err: Display,
{
    if element.has_element_children() {
        return Err(HeaderError::malformed(format!(
            "<{}> must contain text only",
            element.name
        )));
    }
    let text = element.text();
    text.parse().or_else(|_| text.trim().parse()).map_err(|e| {
        HeaderError::malformed(format!("invalid <{}> value {:?}: {}", element.name, text, e))
    })
}

fn subject_information(e: &Element) -> Result<SubjectInformation, HeaderError> {
    let mut c = Children::new(e)?;
    let out = SubjectInformation {
        patient_name: c.opt_value("patientName")?,
        patient_weight_kg: c.opt_value("patientWeight_kg")?,
        patient_height_m: c.opt_value("patientHeight_m")?,
        patient_id: c.opt_value("patientID")?,
        patient_birthdate: c.opt_value("patientBirthdate")?,
        patient_gender: c.opt_value("patientGender")?,
    };
    c.finish()?;
    Ok(out)
}

fn study_information(e: &Element) -> Result<StudyInformation, HeaderError> {
    let mut c = Children::new(e)?;
    let out = StudyInformation {
        study_date: c.opt_value("studyDate")?,
        study_time: c.opt_value("studyTime")?,
        study_id: c.opt_value("studyID")?,
        accession_number: c.opt_value("accessionNumber")?,
        referring_physician_name: c.opt_value("referringPhysicianName")?,
        study_description: c.opt_value("studyDescription")?,
        study_instance_uid: c.opt_value("studyInstanceUID")?,
        body_part_examined: c.opt_value("bodyPartExamined")?,
    };
    c.finish()?;
    Ok(out)
}

fn measurement_information(e: &Element) -> Result<MeasurementInformation, HeaderError> {
    let mut c = Children::new(e)?;
    let out = MeasurementInformation {
        measurement_id: c.opt_value("measurementID")?,
        series_date: c.opt_value("seriesDate")?,
        series_time: c.opt_value("seriesTime")?,
        patient_position: c.req_value("patientPosition")?,
        initial_series_number: c.opt_value("initialSeriesNumber")?,
        protocol_name: c.opt_value("protocolName")?,
        sequence_name: c.opt_value("sequenceName")?,
        series_description: c.opt_value("seriesDescription")?,
        measurement_dependency: c.all("measurementDependency", measurement_dependency)?,
        series_instance_uid_root: c.opt_value("seriesInstanceUIDRoot")?,
        frame_of_reference_uid: c.opt_value("frameOfReferenceUID")?,
        referenced_image_sequence: c
            .opt("referencedImageSequence", referenced_image_sequence)?
            .unwrap_or_default(),
    };
    c.finish()?;
    Ok(out)
}

fn measurement_dependency(e: &Element) -> Result<MeasurementDependency, HeaderError> {
    let mut c = Children::new(e)?;
    let out = MeasurementDependency {
        dependency_type: c.req_value("dependencyType")?,
        measurement_id: c.req_value("measurementID")?,
    };
    c.finish()?;
    Ok(out)
}

fn referenced_image_sequence(e: &Element) -> Result<Vec<String>, HeaderError> {
    let mut c = Children::new(e)?;
    let out = c.values("referencedSOPInstanceUID")?;
    c.finish()?;
    Ok(out)
}

fn acquisition_system_information(
    e: &Element,
) -> Result<AcquisitionSystemInformation, HeaderError> {
    let mut c = Children::new(e)?;
    let out = AcquisitionSystemInformation {
        system_vendor: c.opt_value("systemVendor")?,
        system_model: c.opt_value("systemModel")?,
        system_field_strength_t: c.opt_value("systemFieldStrength_T")?,
        relative_receiver_noise_bandwidth: c.opt_value("relativeReceiverNoiseBandwidth")?,
        receiver_channels: c.opt_value("receiverChannels")?,
        coil_label: c.all("coilLabel", coil_label)?,
        institution_name: c.opt_value("institutionName")?,
        station_name: c.opt_value("stationName")?,
        device_id: c.opt_value("deviceID")?,
    };
    c.finish()?;
    Ok(out)
}

fn coil_label(e: &Element) -> Result<CoilLabel, HeaderError> {
    let mut c = Children::new(e)?;
    let out = CoilLabel {
        coil_number: c.req_value("coilNumber")?,
        coil_name: c.req_value("coilName")?,
    };
    c.finish()?;
    Ok(out)
}

fn experimental_conditions(e: &Element) -> Result<ExperimentalConditions, HeaderError> {
    let mut c = Children::new(e)?;
    let out = ExperimentalConditions {
        h1_resonance_frequency_hz: c.req_value("H1resonanceFrequency_Hz")?,
    };
    c.finish()?;
    Ok(out)
}

fn encoding(e: &Element) -> Result<Encoding, HeaderError> {
    let mut c = Children::new(e)?;
    let out = Encoding {
        encoded_space: c.req("encodedSpace", encoding_space)?,
        recon_space: c.req("reconSpace", encoding_space)?,
        encoding_limits: c.req("encodingLimits", encoding_limits)?,
        trajectory: c.req_value("trajectory")?,
        trajectory_description: c.opt("trajectoryDescription", trajectory_description)?,
        parallel_imaging: c.opt("parallelImaging", parallel_imaging)?,
        echo_train_length: c.opt_value("echoTrainLength")?,
    };
    c.finish()?;
    Ok(out)
}

fn encoding_space(e: &Element) -> Result<EncodingSpace, HeaderError> {
    let mut c = Children::new(e)?;
    let out = EncodingSpace {
        matrix_size: c.req("matrixSize", matrix_size)?,
        field_of_view_mm: c.req("fieldOfView_mm", field_of_view)?,
    };
    c.finish()?;
    Ok(out)
}

fn matrix_size(e: &Element) -> Result<MatrixSize, HeaderError> {
    let mut c = Children::new(e)?;
    let out = MatrixSize {
        x: c.req_value("x")?,
        y: c.req_value("y")?,
        z: c.req_value("z")?,
    };
    c.finish()?;
    Ok(out)
}

fn field_of_view(e: &Element) -> Result<FieldOfView, HeaderError> {
    let mut c = Children::new(e)?;
    let out = FieldOfView {
        x: c.req_value("x")?,
        y: c.req_value("y")?,
        z: c.req_value("z")?,
    };
    c.finish()?;
    Ok(out)
}

fn encoding_limits(e: &Element) -> Result<EncodingLimits, HeaderError> {
    let mut c = Children::new(e)?;
    let mut out = EncodingLimits::default();
    for name in LIMIT_NAMES {
        let parsed = c.opt(name, limit)?;
        if let Some(slot) = out.slot_mut(name) {
            *slot = parsed;
        }
    }
    c.finish()?;
    Ok(out)
}

fn limit(e: &Element) -> Result<Limit, HeaderError> {
    let mut c = Children::new(e)?;
    let out = Limit {
        minimum: c.req_value("minimum")?,
        maximum: c.req_value("maximum")?,
        center: c.req_value("center")?,
    };
    c.finish()?;
    Ok(out)
}

fn trajectory_description(e: &Element) -> Result<TrajectoryDescription, HeaderError> {
    let mut c = Children::new(e)?;
    let out = TrajectoryDescription {
        identifier: c.req_value("identifier")?,
        user_parameter_long: c.all("userParameterLong", parameter_long)?,
        user_parameter_double: c.all("userParameterDouble", parameter_double)?,
        user_parameter_string: c.all("userParameterString", parameter_string)?,
        comment: c.opt_value("comment")?,
    };
    c.finish()?;
    Ok(out)
}

fn parallel_imaging(e: &Element) -> Result<ParallelImaging, HeaderError> {
    let mut c = Children::new(e)?;
    let out = ParallelImaging {
        acceleration_factor: c.req("accelerationFactor", acceleration_factor)?,
        calibration_mode: c.opt_value("calibrationMode")?,
        interleaving_dimension: c.opt_value("interleavingDimension")?,
    };
    c.finish()?;
    Ok(out)
}

fn acceleration_factor(e: &Element) -> Result<AccelerationFactor, HeaderError> {
    let mut c = Children::new(e)?;
    let out = AccelerationFactor {
        kspace_encoding_step_1: c.req_value("kspace_encoding_step_1")?,
        kspace_encoding_step_2: c.req_value("kspace_encoding_step_2")?,
    };
    c.finish()?;
    Ok(out)
}

fn sequence_parameters(e: &Element) -> Result<SequenceParameters, HeaderError> {
    let mut c = Children::new(e)?;
    let out = SequenceParameters {
        tr: c.values("TR")?,
        te: c.values("TE")?,
        ti: c.values("TI")?,
        flip_angle_deg: c.values("flipAngle_deg")?,
        sequence_type: c.opt_value("sequence_type")?,
        echo_spacing: c.values("echo_spacing")?,
    };
    c.finish()?;
    Ok(out)
}

fn user_parameters(e: &Element) -> Result<UserParameters, HeaderError> {
    let mut c = Children::new(e)?;
    let out = UserParameters {
        user_parameter_long: c.all("userParameterLong", parameter_long)?,
        user_parameter_double: c.all("userParameterDouble", parameter_double)?,
        user_parameter_string: c.all("userParameterString", parameter_string)?,
        user_parameter_base64: c.all("userParameterBase64", parameter_string)?,
        extensions: c.rest(),
    };
    if let Some((kind, key)) = out.duplicate_key() {
        return Err(HeaderError::malformed(format!(
            "duplicate {} key {:?}",
            kind, key
        )));
    }
    Ok(out)
}

fn parameter_long(e: &Element) -> Result<UserParameterLong, HeaderError> {
    let mut c = Children::new(e)?;
    let out = UserParameterLong {
        name: c.req_value("name")?,
        value: c.req_value("value")?,
    };
    c.finish()?;
    Ok(out)
}

fn parameter_double(e: &Element) -> Result<UserParameterDouble, HeaderError> {
    let mut c = Children::new(e)?;
    let out = UserParameterDouble {
        name: c.req_value("name")?,
        value: c.req_value("value")?,
    };
    c.finish()?;
    Ok(out)
}

fn parameter_string(e: &Element) -> Result<UserParameterString, HeaderError> {
    let mut c = Children::new(e)?;
    let out = UserParameterString {
        name: c.req_value("name")?,
        value: c.req_value("value")?,
    };
    c.finish()?;
    Ok(out)
}

fn waveform_information(e: &Element) -> Result<WaveformInformation, HeaderError> {
    let mut c = Children::new(e)?;
    let out = WaveformInformation {
        waveform_name: c.req_value("waveformName")?,
        waveform_type: c.req_value("waveformType")?,
        user_parameters: c.opt("userParameters", user_parameters)?,
    };
    c.finish()?;
    Ok(out)
}
