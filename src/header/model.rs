use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::node::Element;

/// Root of the ISMRMRD XML header
///
/// Every group is optional except [`ExperimentalConditions`]. Absent groups
/// stay `None` (or an empty list) through a decode/encode round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsmrmrdHeader {
    /// Schema version (`version`)
    pub version: Option<i64>,

    /// Subject description (`subjectInformation`)
    pub subject_information: Option<SubjectInformation>,

    /// Study description (`studyInformation`)
    pub study_information: Option<StudyInformation>,

    /// Measurement description (`measurementInformation`)
    pub measurement_information: Option<MeasurementInformation>,

    /// Scanner and coil description (`acquisitionSystemInformation`)
    pub acquisition_system_information: Option<AcquisitionSystemInformation>,

    /// Experimental conditions (`experimentalConditions`), mandatory
    pub experimental_conditions: ExperimentalConditions,

    /// Encoding spaces (`encoding`), one per encoding space reference
    pub encoding: Vec<Encoding>,

    /// Sequence timing parameters (`sequenceParameters`)
    pub sequence_parameters: Option<SequenceParameters>,

    /// Free-form typed parameters (`userParameters`)
    pub user_parameters: Option<UserParameters>,

    /// Physiological waveform descriptions (`waveformInformation`)
    pub waveform_information: Vec<WaveformInformation>,

    /// Unrecognized top-level elements, kept verbatim
    pub extensions: Vec<Element>,
}

impl IsmrmrdHeader {
    /// Create a minimal header with the given H1 resonance frequency
    pub fn new(h1_resonance_frequency_hz: i64) -> Self {
        Self {
            experimental_conditions: ExperimentalConditions {
                h1_resonance_frequency_hz,
            },
            ..Default::default()
        }
    }

    /// H1 resonance frequency in Hz
    pub fn resonance_frequency_hz(&self) -> i64 {
        self.experimental_conditions.h1_resonance_frequency_hz
    }

    /// User parameters, created on first use
    pub fn user_parameters_mut(&mut self) -> &mut UserParameters {
        self.user_parameters.get_or_insert_with(UserParameters::default)
    }
}

/// `subjectInformation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectInformation {
    /// `patientName`
    pub patient_name: Option<String>,
    /// `patientWeight_kg`
    pub patient_weight_kg: Option<f32>,
    /// `patientHeight_m`
    pub patient_height_m: Option<f32>,
    /// `patientID`
    pub patient_id: Option<String>,
    /// `patientBirthdate`
    pub patient_birthdate: Option<String>,
    /// `patientGender`
    pub patient_gender: Option<PatientGender>,
}

/// `studyInformation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyInformation {
    /// `studyDate`
    pub study_date: Option<String>,
    /// `studyTime`
    pub study_time: Option<String>,
    /// `studyID`
    pub study_id: Option<String>,
    /// `accessionNumber`
    pub accession_number: Option<i64>,
    /// `referringPhysicianName`
    pub referring_physician_name: Option<String>,
    /// `studyDescription`
    pub study_description: Option<String>,
    /// `studyInstanceUID`
    pub study_instance_uid: Option<String>,
    /// `bodyPartExamined`
    pub body_part_examined: Option<String>,
}

/// `measurementInformation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementInformation {
    /// `measurementID`
    pub measurement_id: Option<String>,
    /// `seriesDate`
    pub series_date: Option<String>,
    /// `seriesTime`
    pub series_time: Option<String>,
    /// `patientPosition`, mandatory inside this group
    pub patient_position: PatientPosition,
    /// `initialSeriesNumber`
    pub initial_series_number: Option<i64>,
    /// `protocolName`
    pub protocol_name: Option<String>,
    /// `sequenceName`
    pub sequence_name: Option<String>,
    /// `seriesDescription`
    pub series_description: Option<String>,
    /// `measurementDependency` entries
    pub measurement_dependency: Vec<MeasurementDependency>,
    /// `seriesInstanceUIDRoot`
    pub series_instance_uid_root: Option<String>,
    /// `frameOfReferenceUID`
    pub frame_of_reference_uid: Option<String>,
    /// `referencedImageSequence/referencedSOPInstanceUID` values
    pub referenced_image_sequence: Vec<String>,
}

impl MeasurementInformation {
    /// Create a measurement description with only the mandatory position
    pub fn new(patient_position: PatientPosition) -> Self {
        Self {
            measurement_id: None,
            series_date: None,
            series_time: None,
            patient_position,
            initial_series_number: None,
            protocol_name: None,
            sequence_name: None,
            series_description: None,
            measurement_dependency: Vec::new(),
            series_instance_uid_root: None,
            frame_of_reference_uid: None,
            referenced_image_sequence: Vec::new(),
        }
    }
}

/// `measurementDependency`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementDependency {
    /// `dependencyType`, e.g. "noise" or "calibration"
    pub dependency_type: String,
    /// `measurementID` of the referenced measurement
    pub measurement_id: String,
}

/// `acquisitionSystemInformation`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionSystemInformation {
    /// `systemVendor`
    pub system_vendor: Option<String>,
    /// `systemModel`
    pub system_model: Option<String>,
    /// `systemFieldStrength_T`
    pub system_field_strength_t: Option<f32>,
    /// `relativeReceiverNoiseBandwidth`
    pub relative_receiver_noise_bandwidth: Option<f32>,
    /// `receiverChannels`
    pub receiver_channels: Option<u16>,
    /// `coilLabel` entries
    pub coil_label: Vec<CoilLabel>,
    /// `institutionName`
    pub institution_name: Option<String>,
    /// `stationName`
    pub station_name: Option<String>,
    /// `deviceID`
    pub device_id: Option<String>,
}

/// `coilLabel`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoilLabel {
    /// `coilNumber`
    pub coil_number: u16,
    /// `coilName`
    pub coil_name: String,
}

/// `experimentalConditions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalConditions {
    /// `H1resonanceFrequency_Hz`
    pub h1_resonance_frequency_hz: i64,
}

/// `encoding`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    /// `encodedSpace`
    pub encoded_space: EncodingSpace,
    /// `reconSpace`
    pub recon_space: EncodingSpace,
    /// `encodingLimits`
    pub encoding_limits: EncodingLimits,
    /// `trajectory`
    pub trajectory: Trajectory,
    /// `trajectoryDescription`
    pub trajectory_description: Option<TrajectoryDescription>,
    /// `parallelImaging`
    pub parallel_imaging: Option<ParallelImaging>,
    /// `echoTrainLength`
    pub echo_train_length: Option<i64>,
}

impl Encoding {
    /// Encoding with identical encoded and reconstructed spaces and no limits
    pub fn new(space: EncodingSpace, trajectory: Trajectory) -> Self {
        Self {
            encoded_space: space,
            recon_space: space,
            encoding_limits: EncodingLimits::default(),
            trajectory,
            trajectory_description: None,
            parallel_imaging: None,
            echo_train_length: None,
        }
    }
}

/// `encodedSpace` / `reconSpace`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingSpace {
    /// `matrixSize`
    pub matrix_size: MatrixSize,
    /// `fieldOfView_mm`
    pub field_of_view_mm: FieldOfView,
}

/// `matrixSize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSize {
    /// Readout direction
    pub x: u16,
    /// Phase encoding direction
    pub y: u16,
    /// Slice / partition direction
    pub z: u16,
}

impl Default for MatrixSize {
    fn default() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }
}

/// `fieldOfView_mm`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    /// Readout extent in mm
    pub x: f32,
    /// Phase extent in mm
    pub y: f32,
    /// Slice extent in mm
    pub z: f32,
}

/// `encodingLimits`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingLimits {
    /// `kspace_encoding_step_0`
    pub kspace_encoding_step_0: Option<Limit>,
    /// `kspace_encoding_step_1`
    pub kspace_encoding_step_1: Option<Limit>,
    /// `kspace_encoding_step_2`
    pub kspace_encoding_step_2: Option<Limit>,
    /// `average`
    pub average: Option<Limit>,
    /// `slice`
    pub slice: Option<Limit>,
    /// `contrast`
    pub contrast: Option<Limit>,
    /// `phase`
    pub phase: Option<Limit>,
    /// `repetition`
    pub repetition: Option<Limit>,
    /// `set`
    pub set: Option<Limit>,
    /// `segment`
    pub segment: Option<Limit>,
}

/// XML element names of the encoding limits, in schema order
pub(crate) const LIMIT_NAMES: [&str; 10] = [
    "kspace_encoding_step_0",
    "kspace_encoding_step_1",
    "kspace_encoding_step_2",
    "average",
    "slice",
    "contrast",
    "phase",
    "repetition",
    "set",
    "segment",
];

impl EncodingLimits {
    /// Limits paired with their element names, in schema order
    pub fn entries(&self) -> [(&'static str, Option<&Limit>); 10] {
        [
            (LIMIT_NAMES[0], self.kspace_encoding_step_0.as_ref()),
            (LIMIT_NAMES[1], self.kspace_encoding_step_1.as_ref()),
            (LIMIT_NAMES[2], self.kspace_encoding_step_2.as_ref()),
            (LIMIT_NAMES[3], self.average.as_ref()),
            (LIMIT_NAMES[4], self.slice.as_ref()),
            (LIMIT_NAMES[5], self.contrast.as_ref()),
            (LIMIT_NAMES[6], self.phase.as_ref()),
            (LIMIT_NAMES[7], self.repetition.as_ref()),
            (LIMIT_NAMES[8], self.set.as_ref()),
            (LIMIT_NAMES[9], self.segment.as_ref()),
        ]
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut Option<Limit>> {
        Some(match name {
            "kspace_encoding_step_0" => &mut self.kspace_encoding_step_0,
            "kspace_encoding_step_1" => &mut self.kspace_encoding_step_1,
            "kspace_encoding_step_2" => &mut self.kspace_encoding_step_2,
            "average" => &mut self.average,
            "slice" => &mut self.slice,
            "contrast" => &mut self.contrast,
            "phase" => &mut self.phase,
            "repetition" => &mut self.repetition,
            "set" => &mut self.set,
            "segment" => &mut self.segment,
            _ => return None,
        })
    }
}

/// One encoding limit: `minimum`, `maximum`, `center`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    /// Lowest counter value
    pub minimum: u16,
    /// Highest counter value
    pub maximum: u16,
    /// Counter value at the k-space center
    pub center: u16,
}

impl Limit {
    /// Create a limit
    pub fn new(minimum: u16, maximum: u16, center: u16) -> Self {
        Self {
            minimum,
            maximum,
            center,
        }
    }

    /// True when `value` lies inside `[minimum, maximum]`
    pub fn contains(&self, value: u16) -> bool {
        value >= self.minimum && value <= self.maximum
    }
}

/// `trajectoryDescription`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryDescription {
    /// `identifier`
    pub identifier: String,
    /// `userParameterLong` entries
    pub user_parameter_long: Vec<UserParameterLong>,
    /// `userParameterDouble` entries
    pub user_parameter_double: Vec<UserParameterDouble>,
    /// `userParameterString` entries
    pub user_parameter_string: Vec<UserParameterString>,
    /// `comment`
    pub comment: Option<String>,
}

/// `parallelImaging`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelImaging {
    /// `accelerationFactor`
    pub acceleration_factor: AccelerationFactor,
    /// `calibrationMode`
    pub calibration_mode: Option<CalibrationMode>,
    /// `interleavingDimension`
    pub interleaving_dimension: Option<InterleavingDimension>,
}

/// `accelerationFactor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerationFactor {
    /// Acceleration along the first phase encoding direction
    pub kspace_encoding_step_1: u16,
    /// Acceleration along the second phase encoding direction
    pub kspace_encoding_step_2: u16,
}

/// `sequenceParameters`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceParameters {
    /// `TR` values in ms
    pub tr: Vec<f32>,
    /// `TE` values in ms
    pub te: Vec<f32>,
    /// `TI` values in ms
    pub ti: Vec<f32>,
    /// `flipAngle_deg` values
    pub flip_angle_deg: Vec<f32>,
    /// `sequence_type`
    pub sequence_type: Option<String>,
    /// `echo_spacing` values in ms
    pub echo_spacing: Vec<f32>,
}

/// `userParameterLong`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserParameterLong {
    /// Key, unique among long parameters
    pub name: String,
    /// Value
    pub value: i64,
}

/// `userParameterDouble`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserParameterDouble {
    /// Key, unique among double parameters
    pub name: String,
    /// Value
    pub value: f64,
}

/// `userParameterString` / `userParameterBase64`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserParameterString {
    /// Key, unique among parameters of the same type
    pub name: String,
    /// Value
    pub value: String,
}

/// `userParameters`
///
/// Keys are unique within one value type. Equality ignores ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserParameters {
    /// `userParameterLong` entries
    pub user_parameter_long: Vec<UserParameterLong>,
    /// `userParameterDouble` entries
    pub user_parameter_double: Vec<UserParameterDouble>,
    /// `userParameterString` entries
    pub user_parameter_string: Vec<UserParameterString>,
    /// `userParameterBase64` entries (value kept as encoded text)
    pub user_parameter_base64: Vec<UserParameterString>,
    /// Unrecognized entries, kept verbatim
    pub extensions: Vec<Element>,
}

macro_rules! typed_parameter {
    ($get:ident, $set:ident, $field:ident, $ty:ty, $entry:ident, $doc:literal) => {
        #[doc = concat!("Look up a ", $doc, " parameter by name")]
        pub fn $get(&self, name: &str) -> Option<&$ty> {
            self.$field.iter().find(|p| p.name == name).map(|p| &p.value)
        }

        #[doc = concat!("Insert or replace a ", $doc, " parameter")]
        pub fn $set(&mut self, name: impl Into<String>, value: impl Into<$ty>) {
            let name = name.into();
            let value = value.into();
            match self.$field.iter_mut().find(|p| p.name == name) {
                Some(existing) => existing.value = value,
                None => self.$field.push($entry { name, value }),
            }
        }
    };
}

impl UserParameters {
    typed_parameter!(long, set_long, user_parameter_long, i64, UserParameterLong, "long");
    typed_parameter!(double, set_double, user_parameter_double, f64, UserParameterDouble, "double");
    typed_parameter!(string, set_string, user_parameter_string, String, UserParameterString, "string");
    typed_parameter!(base64, set_base64, user_parameter_base64, String, UserParameterString, "base64");

    /// True when no parameter of any kind is present
    pub fn is_empty(&self) -> bool {
        self.user_parameter_long.is_empty()
            && self.user_parameter_double.is_empty()
            && self.user_parameter_string.is_empty()
            && self.user_parameter_base64.is_empty()
            && self.extensions.is_empty()
    }

    /// First key that appears twice within one value type, if any
    pub fn duplicate_key(&self) -> Option<(&'static str, &str)> {
        fn first_dup<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
            let mut seen = std::collections::HashSet::new();
            names.into_iter().find(|n| !seen.insert(*n))
        }

        first_dup(self.user_parameter_long.iter().map(|p| p.name.as_str()))
            .map(|n| ("userParameterLong", n))
            .or_else(|| {
                first_dup(self.user_parameter_double.iter().map(|p| p.name.as_str()))
                    .map(|n| ("userParameterDouble", n))
            })
            .or_else(|| {
                first_dup(self.user_parameter_string.iter().map(|p| p.name.as_str()))
                    .map(|n| ("userParameterString", n))
            })
            .or_else(|| {
                first_dup(self.user_parameter_base64.iter().map(|p| p.name.as_str()))
                    .map(|n| ("userParameterBase64", n))
            })
    }
}

/// Same entries regardless of order; keys are unique so a membership check suffices
fn same_entries<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}

impl PartialEq for UserParameters {
    fn eq(&self, other: &Self) -> bool {
        same_entries(&self.user_parameter_long, &other.user_parameter_long)
            && same_entries(&self.user_parameter_double, &other.user_parameter_double)
            && same_entries(&self.user_parameter_string, &other.user_parameter_string)
            && same_entries(&self.user_parameter_base64, &other.user_parameter_base64)
            && same_entries(&self.extensions, &other.extensions)
    }
}

/// `waveformInformation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformInformation {
    /// `waveformName`
    pub waveform_name: String,
    /// `waveformType`
    pub waveform_type: WaveformType,
    /// `userParameters`
    pub user_parameters: Option<UserParameters>,
}

/// Error returned when an enumeration literal is not part of the schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct InvalidEnumValue {
    /// Enumeration name
    pub kind: &'static str,
    /// Rejected literal
    pub value: String,
}

macro_rules! schema_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Literal used in the XML document
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(InvalidEnumValue {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

schema_enum! {
    /// `patientGender`
    PatientGender, "patientGender" {
        /// Male
        Male => "M",
        /// Female
        Female => "F",
        /// Other
        Other => "O",
    }
}

schema_enum! {
    /// `patientPosition`
    PatientPosition, "patientPosition" {
        /// Head first prone
        Hfp => "HFP",
        /// Head first supine
        Hfs => "HFS",
        /// Head first decubitus right
        Hfdr => "HFDR",
        /// Head first decubitus left
        Hfdl => "HFDL",
        /// Feet first prone
        Ffp => "FFP",
        /// Feet first supine
        Ffs => "FFS",
        /// Feet first decubitus right
        Ffdr => "FFDR",
        /// Feet first decubitus left
        Ffdl => "FFDL",
    }
}

schema_enum! {
    /// `trajectory`
    Trajectory, "trajectory" {
        /// Cartesian sampling
        Cartesian => "cartesian",
        /// Echo planar imaging
        Epi => "epi",
        /// Radial spokes
        Radial => "radial",
        /// Golden angle radial
        GoldenAngle => "goldenangle",
        /// Spiral interleaves
        Spiral => "spiral",
        /// Anything else
        Other => "other",
    }
}

schema_enum! {
    /// `calibrationMode`
    CalibrationMode, "calibrationMode" {
        /// Calibration lines embedded in the accelerated acquisition
        Embedded => "embedded",
        /// Interleaved calibration
        Interleaved => "interleaved",
        /// Separate calibration scan
        Separate => "separate",
        /// External calibration source
        External => "external",
        /// Anything else
        Other => "other",
    }
}

schema_enum! {
    /// `interleavingDimension`
    InterleavingDimension, "interleavingDimension" {
        /// Cardiac phase
        Phase => "phase",
        /// Repetition
        Repetition => "repetition",
        /// Contrast / echo
        Contrast => "contrast",
        /// Average
        Average => "average",
        /// Anything else
        Other => "other",
    }
}

schema_enum! {
    /// `waveformType`
    WaveformType, "waveformType" {
        /// Electrocardiogram
        Ecg => "ecg",
        /// Pulse oximetry
        Pulse => "pulse",
        /// Respiratory belt
        Respiratory => "respiratory",
        /// External trigger
        Trigger => "trigger",
        /// Gradient waveform
        GradientWaveform => "gradientwaveform",
        /// Anything else
        Other => "other",
    }
}
