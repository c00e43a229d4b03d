//! Benchmarks for stream transfers and event dispatch

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use loopstream::{EventMask, ReadableStream, RunLoop, StreamConfig, StreamEvent, WritableStream};

const PAYLOAD_SIZE: usize = 64 * 1024;

fn bench_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("loopstream_bench_{}_{}", name, std::process::id()))
        .display()
        .to_string()
}

/// Benchmark draining a file with varying transfer buffer sizes
fn bench_read_chunks(c: &mut Criterion) {
    let path = bench_path("read");
    std::fs::write(&path, vec![b'x'; PAYLOAD_SIZE]).unwrap();

    let mut group = c.benchmark_group("read_chunks");
    group.throughput(Throughput::Bytes(PAYLOAD_SIZE as u64));

    for &capacity in &[256, 1024, 8192] {
        let config = StreamConfig::new().with_buffer_capacity(capacity).unwrap();
        group.bench_function(format!("{}_byte_buffer", capacity), |b| {
            b.iter(|| {
                let mut stream = ReadableStream::new(&path, &config).unwrap();
                stream.open();
                let total: usize = stream.chunks().map(|chunk| chunk.unwrap().len()).sum();
                black_box(total)
            })
        });
    }

    group.finish();
    std::fs::remove_file(&path).ok();
}

/// Benchmark writing a payload larger than one transfer
fn bench_write_all(c: &mut Criterion) {
    let path = bench_path("write");
    let payload = "y".repeat(PAYLOAD_SIZE);
    let config = StreamConfig::default();

    let mut group = c.benchmark_group("write_all");
    group.throughput(Throughput::Bytes(PAYLOAD_SIZE as u64));
    group.bench_function("64k_payload", |b| {
        b.iter(|| {
            let mut stream = WritableStream::new(&path, &config).unwrap();
            stream.open();
            black_box(stream.write(&payload));
        })
    });
    group.finish();

    std::fs::remove_file(&path).ok();
}

/// Benchmark event delivery through the run loop
fn bench_event_dispatch(c: &mut Criterion) {
    let path = bench_path("events");
    std::fs::write(&path, vec![b'z'; PAYLOAD_SIZE]).unwrap();
    let config = StreamConfig::default();

    c.bench_function("dispatch_read_events", |b| {
        b.iter(|| {
            let mut run_loop = RunLoop::new();
            let mut stream = ReadableStream::new(&path, &config).unwrap();
            stream.set_client(EventMask::ALL, Box::new(|event: StreamEvent| {
                black_box(event);
            }));
            stream.schedule(&run_loop);
            stream.open();
            while stream.has_bytes_available() {
                stream.read();
            }
            black_box(run_loop.run_in_mode(config.mode(), Duration::ZERO, true))
        })
    });

    std::fs::remove_file(&path).ok();
}

criterion_group!(benches, bench_read_chunks, bench_write_all, bench_event_dispatch);
criterion_main!(benches);
