#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding must fail cleanly on garbage; anything it accepts must
    // re-encode and decode back to the same value.
    if let Ok(header) = ismrmrd::header::decode(text) {
        if let Ok(encoded) = ismrmrd::header::encode(&header) {
            let again = ismrmrd::header::decode(&encoded).expect("canonical encoding decodes");
            assert_eq!(again, header);
        }
    }
});
