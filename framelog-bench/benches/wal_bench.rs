//! WAL benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framelog_wal::{FrameCodec, JsonCodec, RawCodec, RecoveryScanner, Wal, WalConfig};
use tempfile::TempDir;

fn create_test_payload(size: usize) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "kind": "bench",
        "data": "x".repeat(size),
    }))
    .unwrap()
}

/// Encodes `count` frames into one buffer without going through the fsync path.
fn create_test_log(count: usize, size: usize) -> Vec<u8> {
    let payload = create_test_payload(size);
    let mut buf = Vec::with_capacity(count * FrameCodec::encoded_len(payload.len()));
    for i in 0..count {
        buf.extend_from_slice(&FrameCodec::encode(&payload, i as u64).unwrap());
    }
    buf
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let payload = create_test_payload(size);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(FrameCodec::encode(payload, 1_700_000_000_000_000).unwrap()));
        });
    }

    group.finish();
}

fn bench_wal_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_append");
    // Every append is fsynced.
    group.sample_size(20);

    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(WalConfig::new(dir.path().join("append.wal")), RawCodec).unwrap();

    for size in [100, 1000, 10000] {
        let payload = create_test_payload(size);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("payload_bytes", size),
            &payload,
            |b, payload| {
                b.iter(|| black_box(wal.append(payload).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_recovery_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery_scan");
    let scanner = RecoveryScanner::default();

    for entry_count in [100, 1000, 10000] {
        let log = create_test_log(entry_count, 100);
        group.throughput(Throughput::Elements(entry_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entry_count),
            &log,
            |b, log| {
                b.iter(|| black_box(scanner.scan(log.as_slice()).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_wal_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_recover");

    for entry_count in [100, 1000, 10000] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recover.wal");
        std::fs::write(&path, create_test_log(entry_count, 100)).unwrap();

        let mut wal = Wal::open(
            WalConfig::new(&path),
            JsonCodec::<serde_json::Value>::new(),
        )
        .unwrap();

        group.throughput(Throughput::Elements(entry_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entry_count),
            &entry_count,
            |b, _| {
                b.iter(|| black_box(wal.recover().unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_wal_append,
    bench_recovery_scan,
    bench_wal_recover,
);

criterion_main!(benches);
