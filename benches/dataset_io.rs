use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ismrmrd::acquisition::Acquisition;
use ismrmrd::dataset::Dataset;
use ismrmrd::header::IsmrmrdHeader;
use num_complex::Complex32;
use tempfile::TempDir;

fn create_acquisition(samples: u16, channels: u16, scan: u32) -> Acquisition {
    let mut acq = Acquisition::new(samples, channels, 0);
    acq.update_head(|h| h.scan_counter = scan);
    for (i, z) in acq.data_mut().iter_mut().enumerate() {
        *z = Complex32::new(i as f32, scan as f32);
    }
    acq
}

/// Create a dataset holding `count` acquisitions
fn create_test_file(path: &std::path::Path, count: u32, samples: u16, channels: u16) {
    let mut ds = Dataset::open(path, "/dataset").unwrap();
    ds.write_header(&IsmrmrdHeader::new(128_000_000)).unwrap();
    for scan in 0..count {
        ds.append_acquisition(&create_acquisition(samples, channels, scan))
            .unwrap();
    }
    ds.close().unwrap();
}

/// Benchmark appending readouts of growing channel count
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_acquisition");

    for channels in [1u16, 8, 32] {
        let acq = create_acquisition(256, channels, 0);
        group.throughput(Throughput::Bytes(acq.encoded_len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("256x{}", channels)),
            &acq,
            |b, acq| {
                let temp_dir = TempDir::new().unwrap();
                let mut ds = Dataset::open(temp_dir.path().join("append.bin"), "/dataset").unwrap();
                b.iter(|| ds.append_acquisition(black_box(acq)).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark random access by index
fn bench_random_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_acquisition");

    for count in [100u32, 1000] {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("read.bin");
        create_test_file(&path, count, 256, 8);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut ds = Dataset::open(&path, "/dataset").unwrap();
            let target = u64::from(count / 2);
            b.iter(|| black_box(ds.read_acquisition(black_box(target)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark opening a file, which scans and verifies every block
fn bench_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("open");
    group.sample_size(20);

    for count in [100u32, 1000] {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("open.bin");
        create_test_file(&path, count, 256, 8);

        group.bench_with_input(BenchmarkId::from_parameter(count), &path, |b, path| {
            b.iter(|| black_box(Dataset::open(path, "/dataset").unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_random_read, bench_open);
criterion_main!(benches);
