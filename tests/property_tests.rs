//! Property-based tests for the header codec and record codecs

use std::collections::BTreeMap;

use ismrmrd::acquisition::{Acquisition, AcquisitionError};
use ismrmrd::header::{self, *};
use ismrmrd::image::Image;
use ismrmrd::ndarray::{ArrayData, DataType, NdArray, MAX_DIMENSIONS, NDARRAY_HEADER_SIZE};
use num_complex::Complex32;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Any printable text, surrounding whitespace included
fn text() -> impl Strategy<Value = String> {
    "[\t\n \\PC]{0,16}"
}

/// Text with at least one non-blank character
fn word() -> impl Strategy<Value = String> {
    "[\\PC&&[^ ]][\t\n \\PC]{0,8}"
}

fn opt_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(text())
}

fn finite_f32() -> impl Strategy<Value = f32> {
    prop::num::f32::NORMAL | prop::num::f32::SUBNORMAL | prop::num::f32::ZERO
}

fn finite_f64() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO
}

fn limit() -> impl Strategy<Value = Limit> {
    (any::<u16>(), any::<u16>(), any::<u16>()).prop_map(|(a, b, c)| Limit::new(a, b, c))
}

fn trajectory() -> impl Strategy<Value = Trajectory> {
    prop_oneof![
        Just(Trajectory::Cartesian),
        Just(Trajectory::Epi),
        Just(Trajectory::Radial),
        Just(Trajectory::GoldenAngle),
        Just(Trajectory::Spiral),
        Just(Trajectory::Other),
    ]
}

fn patient_position() -> impl Strategy<Value = PatientPosition> {
    prop_oneof![
        Just(PatientPosition::Hfp),
        Just(PatientPosition::Hfs),
        Just(PatientPosition::Hfdr),
        Just(PatientPosition::Hfdl),
        Just(PatientPosition::Ffp),
        Just(PatientPosition::Ffs),
        Just(PatientPosition::Ffdr),
        Just(PatientPosition::Ffdl),
    ]
}

fn waveform_type() -> impl Strategy<Value = WaveformType> {
    prop_oneof![
        Just(WaveformType::Ecg),
        Just(WaveformType::Pulse),
        Just(WaveformType::Respiratory),
        Just(WaveformType::Trigger),
        Just(WaveformType::GradientWaveform),
        Just(WaveformType::Other),
    ]
}

fn subject_information() -> impl Strategy<Value = SubjectInformation> {
    (
        opt_text(),
        proptest::option::of(finite_f32()),
        proptest::option::of(finite_f32()),
        opt_text(),
        opt_text(),
        proptest::option::of(prop_oneof![
            Just(PatientGender::Male),
            Just(PatientGender::Female),
            Just(PatientGender::Other),
        ]),
    )
        .prop_map(
            |(patient_name, patient_weight_kg, patient_height_m, patient_id, patient_birthdate, patient_gender)| {
                SubjectInformation {
                    patient_name,
                    patient_weight_kg,
                    patient_height_m,
                    patient_id,
                    patient_birthdate,
                    patient_gender,
                }
            },
        )
}

fn study_information() -> impl Strategy<Value = StudyInformation> {
    (
        (opt_text(), opt_text(), opt_text(), proptest::option::of(any::<i64>())),
        (opt_text(), opt_text(), opt_text(), opt_text()),
    )
        .prop_map(|((date, time, id, accession), (physician, description, uid, body_part))| {
            StudyInformation {
                study_date: date,
                study_time: time,
                study_id: id,
                accession_number: accession,
                referring_physician_name: physician,
                study_description: description,
                study_instance_uid: uid,
                body_part_examined: body_part,
            }
        })
}

fn measurement_information() -> impl Strategy<Value = MeasurementInformation> {
    (
        (opt_text(), opt_text(), opt_text(), patient_position()),
        (proptest::option::of(any::<i64>()), opt_text(), opt_text(), opt_text()),
        (
            proptest::collection::vec((text(), text()), 0..3),
            opt_text(),
            opt_text(),
            proptest::collection::vec(text(), 0..3),
        ),
    )
        .prop_map(|((id, date, time, position), (series, protocol, sequence, description), (deps, uid_root, frame, images))| {
            let mut m = MeasurementInformation::new(position);
            m.measurement_id = id;
            m.series_date = date;
            m.series_time = time;
            m.initial_series_number = series;
            m.protocol_name = protocol;
            m.sequence_name = sequence;
            m.series_description = description;
            m.measurement_dependency = deps
                .into_iter()
                .map(|(dependency_type, measurement_id)| MeasurementDependency {
                    dependency_type,
                    measurement_id,
                })
                .collect();
            m.series_instance_uid_root = uid_root;
            m.frame_of_reference_uid = frame;
            m.referenced_image_sequence = images;
            m
        })
}

fn acquisition_system_information() -> impl Strategy<Value = AcquisitionSystemInformation> {
    (
        (opt_text(), opt_text(), proptest::option::of(finite_f32())),
        (proptest::option::of(finite_f32()), proptest::option::of(any::<u16>())),
        proptest::collection::vec((any::<u16>(), text()), 0..4),
        (opt_text(), opt_text(), opt_text()),
    )
        .prop_map(|((vendor, model, field), (bandwidth, channels), coils, (institution, station, device))| {
            AcquisitionSystemInformation {
                system_vendor: vendor,
                system_model: model,
                system_field_strength_t: field,
                relative_receiver_noise_bandwidth: bandwidth,
                receiver_channels: channels,
                coil_label: coils
                    .into_iter()
                    .map(|(coil_number, coil_name)| CoilLabel {
                        coil_number,
                        coil_name,
                    })
                    .collect(),
                institution_name: institution,
                station_name: station,
                device_id: device,
            }
        })
}

fn encoding_space() -> impl Strategy<Value = EncodingSpace> {
    (
        (any::<u16>(), any::<u16>(), any::<u16>()),
        (finite_f32(), finite_f32(), finite_f32()),
    )
        .prop_map(|((x, y, z), (fx, fy, fz))| EncodingSpace {
            matrix_size: MatrixSize { x, y, z },
            field_of_view_mm: FieldOfView { x: fx, y: fy, z: fz },
        })
}

fn encoding_limits() -> impl Strategy<Value = EncodingLimits> {
    proptest::collection::vec(proptest::option::of(limit()), 10).prop_map(|limits| {
        let mut out = EncodingLimits::default();
        out.kspace_encoding_step_0 = limits[0];
        out.kspace_encoding_step_1 = limits[1];
        out.kspace_encoding_step_2 = limits[2];
        out.average = limits[3];
        out.slice = limits[4];
        out.contrast = limits[5];
        out.phase = limits[6];
        out.repetition = limits[7];
        out.set = limits[8];
        out.segment = limits[9];
        out
    })
}

fn trajectory_description() -> impl Strategy<Value = TrajectoryDescription> {
    (
        text(),
        proptest::collection::vec((text(), any::<i64>()), 0..3),
        proptest::collection::vec((text(), finite_f64()), 0..3),
        proptest::collection::vec((text(), text()), 0..3),
        opt_text(),
    )
        .prop_map(|(identifier, longs, doubles, strings, comment)| TrajectoryDescription {
            identifier,
            user_parameter_long: longs
                .into_iter()
                .map(|(name, value)| UserParameterLong { name, value })
                .collect(),
            user_parameter_double: doubles
                .into_iter()
                .map(|(name, value)| UserParameterDouble { name, value })
                .collect(),
            user_parameter_string: strings
                .into_iter()
                .map(|(name, value)| UserParameterString { name, value })
                .collect(),
            comment,
        })
}

fn parallel_imaging() -> impl Strategy<Value = ParallelImaging> {
    (
        any::<u16>(),
        any::<u16>(),
        proptest::option::of(prop_oneof![
            Just(CalibrationMode::Embedded),
            Just(CalibrationMode::Interleaved),
            Just(CalibrationMode::Separate),
            Just(CalibrationMode::External),
            Just(CalibrationMode::Other),
        ]),
        proptest::option::of(prop_oneof![
            Just(InterleavingDimension::Phase),
            Just(InterleavingDimension::Repetition),
            Just(InterleavingDimension::Contrast),
            Just(InterleavingDimension::Average),
            Just(InterleavingDimension::Other),
        ]),
    )
        .prop_map(|(step_1, step_2, calibration_mode, interleaving_dimension)| ParallelImaging {
            acceleration_factor: AccelerationFactor {
                kspace_encoding_step_1: step_1,
                kspace_encoding_step_2: step_2,
            },
            calibration_mode,
            interleaving_dimension,
        })
}

fn encoding() -> impl Strategy<Value = Encoding> {
    (
        encoding_space(),
        encoding_space(),
        encoding_limits(),
        trajectory(),
        proptest::option::of(trajectory_description()),
        proptest::option::of(parallel_imaging()),
        proptest::option::of(any::<i64>()),
    )
        .prop_map(
            |(encoded_space, recon_space, encoding_limits, trajectory, trajectory_description, parallel_imaging, echo_train_length)| {
                Encoding {
                    encoded_space,
                    recon_space,
                    encoding_limits,
                    trajectory,
                    trajectory_description,
                    parallel_imaging,
                    echo_train_length,
                }
            },
        )
}

fn sequence_parameters() -> impl Strategy<Value = SequenceParameters> {
    let values = || proptest::collection::vec(finite_f32(), 0..3);
    (values(), values(), values(), values(), opt_text(), values()).prop_map(
        |(tr, te, ti, flip_angle_deg, sequence_type, echo_spacing)| SequenceParameters {
            tr,
            te,
            ti,
            flip_angle_deg,
            sequence_type,
            echo_spacing,
        },
    )
}

fn attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::btree_map("a[a-z]{0,5}", "\\PC{0,8}", 0..3)
        .prop_map(|m| m.into_iter().collect())
}

/// Unknown elements: leaf text, nested elements, or mixed content
fn extension() -> impl Strategy<Value = Element> {
    let leaf = ("ext_[a-z]{1,6}", attributes(), text()).prop_map(|(name, attributes, text)| {
        let mut element = Element::with_text(name, text);
        element.attributes = attributes;
        element
    });
    leaf.prop_recursive(3, 12, 3, |inner| {
        (
            "ext_[a-z]{1,6}",
            attributes(),
            proptest::collection::vec((proptest::option::of(word()), inner), 1..3),
            proptest::option::of(word()),
        )
            .prop_map(|(name, attributes, parts, tail)| {
                let mut element = Element::new(name);
                element.attributes = attributes;
                for (text, child) in parts {
                    if let Some(t) = text {
                        element.children.push(Node::Text(t));
                    }
                    element.push(child);
                }
                if let Some(t) = tail {
                    element.children.push(Node::Text(t));
                }
                element
            })
    })
}

/// An extension in a vendor namespace it declares itself
fn namespaced_extension() -> impl Strategy<Value = Element> {
    (extension(), "[a-z]{1,4}").prop_map(|(mut element, prefix)| {
        element.name = format!("v{}:{}", prefix, element.name);
        element
            .attributes
            .push((format!("xmlns:v{}", prefix), format!("urn:vendor:{}", prefix)));
        element
    })
}

fn user_parameters() -> impl Strategy<Value = UserParameters> {
    (
        proptest::collection::btree_map(text(), any::<i64>(), 0..4),
        proptest::collection::btree_map(text(), finite_f64(), 0..4),
        proptest::collection::btree_map(text(), text(), 0..4),
        proptest::collection::btree_map(text(), "[A-Za-z0-9+/]{0,12}", 0..3),
        proptest::collection::vec(extension(), 0..2),
    )
        .prop_map(
            |(longs, doubles, strings, blobs, extensions): (
                BTreeMap<_, _>,
                BTreeMap<_, _>,
                BTreeMap<_, _>,
                BTreeMap<_, _>,
                _,
            )| {
                let mut params = UserParameters::default();
                for (k, v) in longs {
                    params.set_long(k, v);
                }
                for (k, v) in doubles {
                    params.set_double(k, v);
                }
                for (k, v) in strings {
                    params.set_string(k, v);
                }
                for (k, v) in blobs {
                    params.set_base64(k, v);
                }
                params.extensions = extensions;
                params
            },
        )
}

fn waveform_information() -> impl Strategy<Value = WaveformInformation> {
    (text(), waveform_type(), proptest::option::of(user_parameters())).prop_map(
        |(waveform_name, waveform_type, user_parameters)| WaveformInformation {
            waveform_name,
            waveform_type,
            user_parameters,
        },
    )
}

fn ismrmrd_header() -> impl Strategy<Value = IsmrmrdHeader> {
    (
        (
            any::<i64>(),
            proptest::option::of(any::<i64>()),
            proptest::option::of(subject_information()),
            proptest::option::of(study_information()),
            proptest::option::of(measurement_information()),
            proptest::option::of(acquisition_system_information()),
        ),
        (
            proptest::collection::vec(encoding(), 0..3),
            proptest::option::of(sequence_parameters()),
            proptest::option::of(user_parameters()),
            proptest::collection::vec(waveform_information(), 0..3),
            proptest::collection::vec(prop_oneof![extension(), namespaced_extension()], 0..3),
        ),
    )
        .prop_map(
            |(
                (frequency, version, subject, study, measurement, system),
                (encoding, sequence_parameters, user_parameters, waveform_information, extensions),
            )| IsmrmrdHeader {
                version,
                subject_information: subject,
                study_information: study,
                measurement_information: measurement,
                acquisition_system_information: system,
                encoding,
                sequence_parameters,
                user_parameters,
                waveform_information,
                extensions,
                ..IsmrmrdHeader::new(frequency)
            },
        )
}

// ============================================================================
// Header codec
// ============================================================================

proptest! {
    /// Any representable header decodes back to itself
    #[test]
    fn test_header_round_trip(h in ismrmrd_header()) {
        let text = header::encode(&h).unwrap();
        let back = header::decode(&text).unwrap();
        prop_assert_eq!(back, h);
    }

    /// Re-encoding a decoded document is a fixed point
    #[test]
    fn test_encoding_is_canonical(h in ismrmrd_header()) {
        let first = header::encode(&h).unwrap();
        let second = header::encode(&header::decode(&first).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Arbitrary input never panics the decoder
    #[test]
    fn test_decode_never_panics(input in "\\PC{0,200}") {
        let _ = header::decode(&input);
    }
}

// ============================================================================
// Acquisition codec
// ============================================================================

proptest! {
    /// Records of any shape survive the byte codec
    #[test]
    fn test_acquisition_round_trip(
        samples in 0u16..64,
        channels in 0u16..8,
        dims in 0u16..4,
        scan in any::<u32>(),
        seed in any::<u16>(),
    ) {
        let mut acq = Acquisition::new(samples, channels, dims);
        acq.update_head(|h| h.scan_counter = scan);
        for (i, z) in acq.data_mut().iter_mut().enumerate() {
            *z = Complex32::new(f32::from(seed) + i as f32, -(i as f32));
        }
        for (i, t) in acq.traj_mut().iter_mut().enumerate() {
            *t = i as f32 * 0.25;
        }

        let bytes = acq.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), acq.encoded_len());
        prop_assert_eq!(Acquisition::from_bytes(&bytes).unwrap(), acq);
    }

    /// Every strict prefix of a record is rejected, never misread
    #[test]
    fn test_truncated_records_rejected(
        samples in 1u16..32,
        channels in 1u16..4,
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = Acquisition::new(samples, channels, 0).to_bytes().unwrap();
        let len = cut.index(bytes.len());
        let result = Acquisition::from_bytes(&bytes[..len]);
        prop_assert!(
            matches!(result, Err(AcquisitionError::Truncated { .. })),
            "prefix of {} bytes gave {:?}",
            len,
            result
        );
    }
}

// ============================================================================
// Image and array codecs
// ============================================================================

fn data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(DataType::ALL.to_vec())
}

/// Buffer of `len` elements whose bytes are all taken from `seed`
fn filled(data_type: DataType, len: usize, seed: u8) -> ArrayData {
    let mut bytes = vec![0u8; NDARRAY_HEADER_SIZE];
    bytes[0] = 1;
    bytes[2] = data_type.code() as u8;
    bytes[4] = 1;
    bytes[6..14].copy_from_slice(&(len as u64).to_le_bytes());
    bytes.extend((0..len * data_type.element_size()).map(|i| seed.wrapping_add(i as u8)));
    NdArray::from_bytes(&bytes).unwrap().data().clone()
}

proptest! {
    /// Arrays of any type and shape survive the byte codec
    #[test]
    fn test_array_round_trip(
        t in data_type(),
        dims in prop::collection::vec(1usize..4, 1..=MAX_DIMENSIONS),
        seed in any::<u8>(),
    ) {
        let len = dims.iter().product();
        let array = NdArray::from_data(&dims, filled(t, len, seed)).unwrap();
        let bytes = array.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), array.encoded_len());
        let back = NdArray::from_bytes(&bytes).unwrap();
        prop_assert_eq!(back.to_bytes().unwrap(), bytes);
        prop_assert_eq!(back.dims(), array.dims());
    }

    /// Images keep their attribute text and pixels, and every prefix is rejected
    #[test]
    fn test_image_round_trip(
        t in data_type(),
        matrix in (1u16..6, 1u16..6, 1u16..3),
        channels in 1u16..3,
        attributes in "\\PC{0,40}",
        seed in any::<u8>(),
        cut in any::<prop::sample::Index>(),
    ) {
        let matrix_size = [matrix.0, matrix.1, matrix.2];
        let blank = Image::new(t, matrix_size, channels);
        let pixels = filled(t, blank.data().len(), seed);
        let image = Image::from_parts(*blank.head(), attributes.clone(), pixels).unwrap();

        let bytes = image.to_bytes().unwrap();
        let back = Image::from_bytes(&bytes).unwrap();
        prop_assert_eq!(back.attribute_string(), attributes.as_str());
        prop_assert_eq!(back.to_bytes().unwrap(), bytes.clone());

        let prefix = cut.index(bytes.len());
        let result = Image::from_bytes(&bytes[..prefix]);
        prop_assert!(
            matches!(result, Err(AcquisitionError::Truncated { .. })),
            "prefix of {} bytes gave {:?}",
            prefix,
            result
        );
    }
}
