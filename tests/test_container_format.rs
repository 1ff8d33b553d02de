//! Byte-level checks of the container file layout

use byteorder::{ByteOrder, LittleEndian};
use ismrmrd::acquisition::{Acquisition, ACQUISITION_HEADER_SIZE};
use ismrmrd::dataset::{Dataset, FORMAT_VERSION, MAGIC, PREAMBLE_SIZE};
use ismrmrd::waveform::{Waveform, WAVEFORM_HEADER_SIZE};
use std::fs;
use tempfile::tempdir;

struct RawBlock {
    kind: u8,
    group: String,
    payload: Vec<u8>,
}

/// Split a container file into its blocks, checking every checksum
fn parse_blocks(bytes: &[u8]) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut pos = PREAMBLE_SIZE as usize;
    while pos < bytes.len() {
        let start = pos;
        let kind = bytes[pos];
        let group_len = LittleEndian::read_u16(&bytes[pos + 1..]) as usize;
        pos += 3;
        let group = String::from_utf8(bytes[pos..pos + group_len].to_vec()).unwrap();
        pos += group_len;
        let payload_len = LittleEndian::read_u64(&bytes[pos..]) as usize;
        pos += 8;
        let payload = bytes[pos..pos + payload_len].to_vec();
        pos += payload_len;

        let crc = LittleEndian::read_u32(&bytes[pos..]);
        assert_eq!(crc, crc32fast::hash(&bytes[start..pos]), "block at {}", start);
        pos += 4;

        blocks.push(RawBlock { kind, group, payload });
    }
    assert_eq!(pos, bytes.len());
    blocks
}

#[test]
fn test_preamble() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preamble.bin");
    Dataset::open(&path, "/dataset").unwrap().close().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"ISMRMRD\0");
    assert_eq!(&bytes[..8], MAGIC);
    assert_eq!(LittleEndian::read_u16(&bytes[8..10]), FORMAT_VERSION);
    assert_eq!(LittleEndian::read_u16(&bytes[10..12]), 0);
}

#[test]
fn test_block_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blocks.bin");

    let mut ds = Dataset::open(&path, "/dataset").unwrap();
    ds.write_header_text("<h/>").unwrap();
    ds.append_acquisition(&Acquisition::new(4, 2, 3)).unwrap();
    ds.append_waveform(&Waveform::new(5, 2)).unwrap();
    ds.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    let blocks = parse_blocks(&bytes);
    let kinds: Vec<u8> = blocks.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![1, 2, 3, 4]);
    assert!(blocks.iter().all(|b| b.group == "/dataset"));

    assert!(blocks[0].payload.is_empty());
    assert_eq!(blocks[1].payload, b"<h/>");
    // header + 4 x 3 trajectory floats + 4 x 2 complex samples
    assert_eq!(blocks[2].payload.len(), ACQUISITION_HEADER_SIZE + 12 * 4 + 8 * 8);
    assert_eq!(blocks[3].payload.len(), WAVEFORM_HEADER_SIZE + 10 * 4);
}

#[test]
fn test_record_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layout.bin");

    let mut acq = Acquisition::new(2, 1, 0);
    acq.update_head(|h| {
        h.measurement_uid = 0xDEAD_BEEF;
        h.scan_counter = 7;
    });
    acq.data_mut()[1] = num_complex::Complex32::new(1.5, -2.0);

    let mut ds = Dataset::open(&path, "/dataset").unwrap();
    ds.append_acquisition(&acq).unwrap();
    ds.close().unwrap();

    let blocks = parse_blocks(&fs::read(&path).unwrap());
    let record = &blocks[1].payload;

    // version u16, flags u64, measurement_uid u32, scan_counter u32
    assert_eq!(LittleEndian::read_u16(&record[0..2]), 1);
    assert_eq!(LittleEndian::read_u64(&record[2..10]), 0);
    assert_eq!(LittleEndian::read_u32(&record[10..14]), 0xDEAD_BEEF);
    assert_eq!(LittleEndian::read_u32(&record[14..18]), 7);

    let samples = &record[ACQUISITION_HEADER_SIZE..];
    assert_eq!(samples.len(), 2 * 8);
    assert_eq!(LittleEndian::read_f32(&samples[8..12]), 1.5);
    assert_eq!(LittleEndian::read_f32(&samples[12..16]), -2.0);
}

#[test]
fn test_append_after_close_leaves_file_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unchanged.bin");

    let mut ds = Dataset::open(&path, "/dataset").unwrap();
    ds.append_acquisition(&Acquisition::new(4, 1, 0)).unwrap();
    let before = fs::read(&path).unwrap();

    ds.close().unwrap();
    assert!(ds.append_acquisition(&Acquisition::new(4, 1, 0)).is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_multiple_groups_interleave() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("interleave.bin");

    let mut a = Dataset::open(&path, "/a").unwrap();
    a.append_acquisition(&Acquisition::new(1, 1, 0)).unwrap();
    a.close().unwrap();
    let mut b = Dataset::open(&path, "/b").unwrap();
    b.append_acquisition(&Acquisition::new(1, 1, 0)).unwrap();
    b.close().unwrap();
    let mut a = Dataset::open(&path, "/a").unwrap();
    a.append_acquisition(&Acquisition::new(1, 1, 0)).unwrap();
    a.close().unwrap();

    let blocks = parse_blocks(&fs::read(&path).unwrap());
    let layout: Vec<(u8, &str)> = blocks.iter().map(|b| (b.kind, b.group.as_str())).collect();
    assert_eq!(
        layout,
        vec![(1, "/a"), (3, "/a"), (1, "/b"), (3, "/b"), (3, "/a")]
    );

    let a = Dataset::open(&path, "/a").unwrap();
    assert_eq!(a.acquisition_count().unwrap(), 2);
}
