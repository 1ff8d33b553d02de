//! [`IsmrmrdHeader`] to XML text

use quick_xml::events::{BytesDecl, Event};
use quick_xml::Writer;

use super::model::*;
use super::node::{emit, write_element, Element};
use super::{HeaderError, ISMRMRD_NAMESPACE, ISMRMRD_SCHEMA_LOCATION};

/// Top-level element names the model maps itself
const KNOWN_TOP_LEVEL: [&str; 10] = [
    "version",
    "subjectInformation",
    "studyInformation",
    "measurementInformation",
    "acquisitionSystemInformation",
    "experimentalConditions",
    "encoding",
    "sequenceParameters",
    "userParameters",
    "waveformInformation",
];

const KNOWN_USER_PARAMETERS: [&str; 4] = [
    "userParameterLong",
    "userParameterDouble",
    "userParameterString",
    "userParameterBase64",
];

/// Prefixed namespaces the root element always declares
pub(super) const ROOT_NAMESPACES: [(&str, &str); 2] = [
    ("xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ("xs", "http://www.w3.org/2001/XMLSchema"),
];

/// Encode a header as a UTF-8 XML document
///
/// The output carries an XML declaration, the ISMRMRD default namespace and
/// schema location, and two-space indentation. Absent optional groups are
/// omitted.
pub fn encode(header: &IsmrmrdHeader) -> Result<String, HeaderError> {
    let root = header_element(header)?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_element(&mut writer, &root)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| HeaderError::encoding(format!("output is not UTF-8: {}", e)))
}

/// Build the element tree for a header without serializing it
pub fn header_element(header: &IsmrmrdHeader) -> Result<Element, HeaderError> {
    let mut root = Element::new("ismrmrdHeader");
    root.attributes = vec![("xmlns".to_string(), ISMRMRD_NAMESPACE.to_string())];
    for (prefix, uri) in ROOT_NAMESPACES {
        root.attributes
            .push((format!("xmlns:{}", prefix), uri.to_string()));
    }
    root.attributes.push((
        "xsi:schemaLocation".to_string(),
        ISMRMRD_SCHEMA_LOCATION.to_string(),
    ));

    root.push_opt("version", header.version.as_ref());
    if let Some(s) = &header.subject_information {
        root.push(subject_information(s)?);
    }
    if let Some(s) = &header.study_information {
        root.push(study_information(s));
    }
    if let Some(m) = &header.measurement_information {
        root.push(measurement_information(m));
    }
    if let Some(a) = &header.acquisition_system_information {
        root.push(acquisition_system_information(a)?);
    }

    let mut conditions = Element::new("experimentalConditions");
    conditions.push_text(
        "H1resonanceFrequency_Hz",
        header
            .experimental_conditions
            .h1_resonance_frequency_hz
            .to_string(),
    );
    root.push(conditions);

    for e in &header.encoding {
        root.push(encoding(e)?);
    }
    if let Some(s) = &header.sequence_parameters {
        root.push(sequence_parameters(s)?);
    }
    if let Some(u) = &header.user_parameters {
        root.push(user_parameters(u)?);
    }
    for w in &header.waveform_information {
        root.push(waveform_information(w)?);
    }

    for ext in &header.extensions {
        if KNOWN_TOP_LEVEL.contains(&ext.local_name()) {
            return Err(HeaderError::encoding(format!(
                "extension <{}> shadows a schema element",
                ext.name
            )));
        }
        check_namespaces(ext)?;
        root.push(ext.clone());
    }

    Ok(root)
}

/// Extensions must declare every prefix the root does not
fn check_namespaces(ext: &Element) -> Result<(), HeaderError> {
    let missing = ext
        .undeclared_prefixes()
        .into_iter()
        .find(|p| !ROOT_NAMESPACES.iter().any(|(known, _)| known == p));
    match missing {
        Some(prefix) => Err(HeaderError::encoding(format!(
            "extension <{}> uses undeclared namespace prefix {:?}",
            ext.name, prefix
        ))),
        None => Ok(()),
    }
}

fn f32_text(name: &str, v: f32) -> Result<String, HeaderError> {
    if !v.is_finite() {
        return Err(HeaderError::encoding(format!(
            "<{}> cannot hold non-finite value {}",
            name, v
        )));
    }
    Ok(v.to_string())
}

fn f64_text(name: &str, v: f64) -> Result<String, HeaderError> {
    if !v.is_finite() {
        return Err(HeaderError::encoding(format!(
            "<{}> cannot hold non-finite value {}",
            name, v
        )));
    }
    Ok(v.to_string())
}

fn push_f32(parent: &mut Element, name: &str, v: Option<f32>) -> Result<(), HeaderError> {
    if let Some(v) = v {
        parent.push_text(name, f32_text(name, v)?);
    }
    Ok(())
}

fn push_f32_list(parent: &mut Element, name: &str, values: &[f32]) -> Result<(), HeaderError> {
    for v in values {
        parent.push_text(name, f32_text(name, *v)?);
    }
    Ok(())
}

fn subject_information(s: &SubjectInformation) -> Result<Element, HeaderError> {
    let mut e = Element::new("subjectInformation");
    e.push_opt("patientName", s.patient_name.as_ref());
    push_f32(&mut e, "patientWeight_kg", s.patient_weight_kg)?;
    push_f32(&mut e, "patientHeight_m", s.patient_height_m)?;
    e.push_opt("patientID", s.patient_id.as_ref());
    e.push_opt("patientBirthdate", s.patient_birthdate.as_ref());
    e.push_opt("patientGender", s.patient_gender.as_ref());
    Ok(e)
}

fn study_information(s: &StudyInformation) -> Element {
    let mut e = Element::new("studyInformation");
    e.push_opt("studyDate", s.study_date.as_ref());
    e.push_opt("studyTime", s.study_time.as_ref());
    e.push_opt("studyID", s.study_id.as_ref());
    e.push_opt("accessionNumber", s.accession_number.as_ref());
    e.push_opt("referringPhysicianName", s.referring_physician_name.as_ref());
    e.push_opt("studyDescription", s.study_description.as_ref());
    e.push_opt("studyInstanceUID", s.study_instance_uid.as_ref());
    e.push_opt("bodyPartExamined", s.body_part_examined.as_ref());
    e
}

fn measurement_information(m: &MeasurementInformation) -> Element {
    let mut e = Element::new("measurementInformation");
    e.push_opt("measurementID", m.measurement_id.as_ref());
    e.push_opt("seriesDate", m.series_date.as_ref());
    e.push_opt("seriesTime", m.series_time.as_ref());
    e.push_text("patientPosition", m.patient_position.as_str());
    e.push_opt("initialSeriesNumber", m.initial_series_number.as_ref());
    e.push_opt("protocolName", m.protocol_name.as_ref());
    e.push_opt("sequenceName", m.sequence_name.as_ref());
    e.push_opt("seriesDescription", m.series_description.as_ref());
    for dep in &m.measurement_dependency {
        let mut d = Element::new("measurementDependency");
        d.push_text("dependencyType", dep.dependency_type.as_str());
        d.push_text("measurementID", dep.measurement_id.as_str());
        e.push(d);
    }
    e.push_opt("seriesInstanceUIDRoot", m.series_instance_uid_root.as_ref());
    e.push_opt("frameOfReferenceUID", m.frame_of_reference_uid.as_ref());
    if !m.referenced_image_sequence.is_empty() {
        let mut seq = Element::new("referencedImageSequence");
        for uid in &m.referenced_image_sequence {
            seq.push_text("referencedSOPInstanceUID", uid.as_str());
        }
        e.push(seq);
    }
    e
}

fn acquisition_system_information(
    a: &AcquisitionSystemInformation,
) -> Result<Element, HeaderError> {
    let mut e = Element::new("acquisitionSystemInformation");
    e.push_opt("systemVendor", a.system_vendor.as_ref());
    e.push_opt("systemModel", a.system_model.as_ref());
    push_f32(&mut e, "systemFieldStrength_T", a.system_field_strength_t)?;
    push_f32(
        &mut e,
        "relativeReceiverNoiseBandwidth",
        a.relative_receiver_noise_bandwidth,
    )?;
    e.push_opt("receiverChannels", a.receiver_channels.as_ref());
    for coil in &a.coil_label {
        let mut c = Element::new("coilLabel");
        c.push_text("coilNumber", coil.coil_number.to_string());
        c.push_text("coilName", coil.coil_name.as_str());
        e.push(c);
    }
    e.push_opt("institutionName", a.institution_name.as_ref());
    e.push_opt("stationName", a.station_name.as_ref());
    e.push_opt("deviceID", a.device_id.as_ref());
    Ok(e)
}

fn encoding(enc: &Encoding) -> Result<Element, HeaderError> {
    let mut e = Element::new("encoding");
    e.push(encoding_space("encodedSpace", &enc.encoded_space)?);
    e.push(encoding_space("reconSpace", &enc.recon_space)?);
    e.push(encoding_limits(&enc.encoding_limits));
    e.push_text("trajectory", enc.trajectory.as_str());
    if let Some(t) = &enc.trajectory_description {
        e.push(trajectory_description(t)?);
    }
    if let Some(p) = &enc.parallel_imaging {
        let mut pe = Element::new("parallelImaging");
        let mut af = Element::new("accelerationFactor");
        af.push_text(
            "kspace_encoding_step_1",
            p.acceleration_factor.kspace_encoding_step_1.to_string(),
        );
        af.push_text(
            "kspace_encoding_step_2",
            p.acceleration_factor.kspace_encoding_step_2.to_string(),
        );
        pe.push(af);
        pe.push_opt("calibrationMode", p.calibration_mode.as_ref());
        pe.push_opt("interleavingDimension", p.interleaving_dimension.as_ref());
        e.push(pe);
    }
    e.push_opt("echoTrainLength", enc.echo_train_length.as_ref());
    Ok(e)
}

fn encoding_space(name: &str, space: &EncodingSpace) -> Result<Element, HeaderError> {
    let mut e = Element::new(name);

    let mut matrix = Element::new("matrixSize");
    matrix.push_text("x", space.matrix_size.x.to_string());
    matrix.push_text("y", space.matrix_size.y.to_string());
    matrix.push_text("z", space.matrix_size.z.to_string());
    e.push(matrix);

    let fov = space.field_of_view_mm;
    let mut f = Element::new("fieldOfView_mm");
    f.push_text("x", f32_text("fieldOfView_mm", fov.x)?);
    f.push_text("y", f32_text("fieldOfView_mm", fov.y)?);
    f.push_text("z", f32_text("fieldOfView_mm", fov.z)?);
    e.push(f);

    Ok(e)
}

fn encoding_limits(limits: &EncodingLimits) -> Element {
    let mut e = Element::new("encodingLimits");
    for (name, limit) in limits.entries() {
        if let Some(l) = limit {
            let mut le = Element::new(name);
            le.push_text("minimum", l.minimum.to_string());
            le.push_text("maximum", l.maximum.to_string());
            le.push_text("center", l.center.to_string());
            e.push(le);
        }
    }
    e
}

fn trajectory_description(t: &TrajectoryDescription) -> Result<Element, HeaderError> {
    let mut e = Element::new("trajectoryDescription");
    e.push_text("identifier", t.identifier.as_str());
    push_parameters(
        &mut e,
        &t.user_parameter_long,
        &t.user_parameter_double,
        &t.user_parameter_string,
    )?;
    e.push_opt("comment", t.comment.as_ref());
    Ok(e)
}

fn push_parameters(
    parent: &mut Element,
    longs: &[UserParameterLong],
    doubles: &[UserParameterDouble],
    strings: &[UserParameterString],
) -> Result<(), HeaderError> {
    for p in longs {
        parent.push(parameter("userParameterLong", &p.name, p.value.to_string()));
    }
    for p in doubles {
        let text = f64_text("userParameterDouble", p.value)?;
        parent.push(parameter("userParameterDouble", &p.name, text));
    }
    for p in strings {
        parent.push(parameter("userParameterString", &p.name, p.value.clone()));
    }
    Ok(())
}

fn parameter(kind: &str, name: &str, value: String) -> Element {
    let mut e = Element::new(kind);
    e.push_text("name", name);
    e.push_text("value", value);
    e
}

fn sequence_parameters(s: &SequenceParameters) -> Result<Element, HeaderError> {
    let mut e = Element::new("sequenceParameters");
    push_f32_list(&mut e, "TR", &s.tr)?;
    push_f32_list(&mut e, "TE", &s.te)?;
    push_f32_list(&mut e, "TI", &s.ti)?;
    push_f32_list(&mut e, "flipAngle_deg", &s.flip_angle_deg)?;
    e.push_opt("sequence_type", s.sequence_type.as_ref());
    push_f32_list(&mut e, "echo_spacing", &s.echo_spacing)?;
    Ok(e)
}

fn user_parameters(u: &UserParameters) -> Result<Element, HeaderError> {
    if let Some((kind, key)) = u.duplicate_key() {
        return Err(HeaderError::encoding(format!(
            "duplicate {} key {:?}",
            kind, key
        )));
    }

    let mut e = Element::new("userParameters");
    push_parameters(
        &mut e,
        &u.user_parameter_long,
        &u.user_parameter_double,
        &u.user_parameter_string,
    )?;
    for p in &u.user_parameter_base64 {
        e.push(parameter("userParameterBase64", &p.name, p.value.clone()));
    }
    for ext in &u.extensions {
        if KNOWN_USER_PARAMETERS.contains(&ext.local_name()) {
            return Err(HeaderError::encoding(format!(
                "extension <{}> shadows a user parameter type",
                ext.name
            )));
        }
        check_namespaces(ext)?;
        e.push(ext.clone());
    }
    Ok(e)
}

fn waveform_information(w: &WaveformInformation) -> Result<Element, HeaderError> {
    let mut e = Element::new("waveformInformation");
    e.push_text("waveformName", w.waveform_name.as_str());
    e.push_text("waveformType", w.waveform_type.as_str());
    if let Some(u) = &w.user_parameters {
        e.push(user_parameters(u)?);
    }
    Ok(e)
}
