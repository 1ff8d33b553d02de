#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(acq) = ismrmrd::acquisition::Acquisition::from_bytes(data) {
        assert_eq!(acq.to_bytes().expect("decoded record encodes"), data);
    }
    if let Ok(waveform) = ismrmrd::waveform::Waveform::from_bytes(data) {
        assert_eq!(waveform.to_bytes().expect("decoded record encodes"), data);
    }
    if let Ok(image) = ismrmrd::image::Image::from_bytes(data) {
        assert_eq!(image.to_bytes().expect("decoded record encodes"), data);
    }
    if let Ok(array) = ismrmrd::ndarray::NdArray::from_bytes(data) {
        assert_eq!(array.to_bytes().expect("decoded record encodes"), data);
    }
});
