use super::*;
use num_complex::Complex32;

fn magnitude_image() -> Image {
    let mut image = Image::new(DataType::Float, [4, 3, 1], 2);
    image.update_head(|h| {
        h.field_of_view = [240.0, 180.0, 5.0];
        h.slice = 3;
        h.image_index = 7;
        h.image_series_index = 1;
        h.physiology_time_stamp = [10, 20, 30];
        h.user_int[7] = -2;
        h.user_float[0] = 0.25;
    });
    image.set_flag(AcquisitionFlag::User3);
    image.set_attribute_string("<ismrmrdMeta><meta><name>GADGETRON_DataRole</name><value>Image</value></meta></ismrmrdMeta>");
    for (i, p) in image.as_mut_slice::<f32>().unwrap().iter_mut().enumerate() {
        *p = i as f32;
    }
    image
}

#[test]
fn test_new_allocates_pixels() {
    let image = Image::new(DataType::CxFloat, [8, 8, 2], 4);
    assert_eq!(image.data().len(), 8 * 8 * 2 * 4);
    assert_eq!(image.data_type(), DataType::CxFloat);
    assert_eq!(image.head().version, IMAGE_VERSION);
    assert_eq!(image.head().kind(), Some(ImageType::Magnitude));
}

#[test]
fn test_round_trip() {
    let image = magnitude_image();
    let bytes = image.to_bytes().unwrap();
    assert_eq!(
        bytes.len(),
        IMAGE_HEADER_SIZE + image.attribute_string().len() + 24 * 4
    );
    // data_type follows version
    assert_eq!(&bytes[..4], &[1, 0, 5, 0]);
    let back = Image::from_bytes(&bytes).unwrap();
    assert_eq!(back, image);
    assert!(back.is_flag_set(AcquisitionFlag::User3));
}

#[test]
fn test_complex_pixels_round_trip() {
    let mut image = Image::new(DataType::CxFloat, [2, 2, 1], 1);
    image.update_head(|h| h.image_type = ImageType::Complex.code());
    image.as_mut_slice::<Complex32>().unwrap()[3] = Complex32::new(1.0, -1.0);
    let back = Image::from_bytes(&image.to_bytes().unwrap()).unwrap();
    assert_eq!(back.as_slice::<Complex32>().unwrap()[3], Complex32::new(1.0, -1.0));
    assert_eq!(back.head().kind(), Some(ImageType::Complex));
}

#[test]
fn test_channel_slices() {
    let image = magnitude_image();
    let second = image.channel::<f32>(1).unwrap();
    assert_eq!(second.len(), 12);
    assert_eq!(second[0], 12.0);
    assert!(image.channel::<f32>(2).is_none());
    assert!(image.channel::<u16>(0).is_none());
}

#[test]
fn test_update_head_resizes() {
    let mut image = magnitude_image();
    image.update_head(|h| h.matrix_size = [4, 3, 2]);
    assert_eq!(image.data().len(), 48);
    image.set_data_type(DataType::UShort);
    assert_eq!(image.as_slice::<u16>().unwrap().len(), 48);
}

#[test]
fn test_from_parts_checks_length() {
    let head = ImageHeader {
        matrix_size: [2, 2, 1],
        ..Default::default()
    };
    assert!(Image::from_parts(head, "", ArrayData::Int(vec![0; 4])).is_ok());
    assert!(matches!(
        Image::from_parts(head, "", ArrayData::Int(vec![0; 3])),
        Err(AcquisitionError::SizeMismatch { expected: 4, actual: 3, .. })
    ));
}

#[test]
fn test_encode_rejects_unsupported_version() {
    let mut image = magnitude_image();
    image.update_head(|h| h.version = 3);
    let mut sink = Vec::new();
    assert!(matches!(
        image.write_to(&mut sink),
        Err(AcquisitionError::UnsupportedVersion(3))
    ));
    assert!(sink.is_empty());
}

#[test]
fn test_decode_rejects_bad_records() {
    let bytes = magnitude_image().to_bytes().unwrap();

    let mut bad_type = bytes.clone();
    bad_type[2] = 0;
    assert!(matches!(
        Image::from_bytes(&bad_type),
        Err(AcquisitionError::UnsupportedDataType(0))
    ));

    // first attribute byte sits right after the header
    let mut bad_text = bytes.clone();
    bad_text[IMAGE_HEADER_SIZE] = 0xFF;
    assert!(matches!(
        Image::from_bytes(&bad_text),
        Err(AcquisitionError::Malformed(_))
    ));

    assert!(matches!(
        Image::from_bytes(&bytes[..100]),
        Err(AcquisitionError::Truncated { .. })
    ));
    assert!(matches!(
        Image::from_bytes(&bytes[..bytes.len() - 2]),
        Err(AcquisitionError::Truncated { .. })
    ));
    let mut longer = bytes;
    longer.push(0);
    assert!(matches!(
        Image::from_bytes(&longer),
        Err(AcquisitionError::SizeMismatch { .. })
    ));
}
