//! Throughput benchmarks

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use wsterm_core::core::buffer::{decode_lossy, LineBuffer};
use wsterm_core::{FramedLineAdapter, ReaderConfig, ScriptedTransport};

fn nmea_stream(sentences: usize) -> Vec<u8> {
    (0..sentences)
        .flat_map(|i| format!("$GPGGA,{i:06},4807.038,N,01131.000,E,1,08,0.9,545.4,M*47\r\n").into_bytes())
        .collect()
}

fn buffer_benchmark(c: &mut Criterion) {
    let data = nmea_stream(256);

    let mut group = c.benchmark_group("line_buffer");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("take_lines_64b_frames", |b| {
        b.iter(|| {
            let mut buffer = LineBuffer::new();
            let mut lines = 0;
            for chunk in black_box(&data).chunks(64) {
                buffer.extend(chunk);
                while buffer.take_line().is_some() {
                    lines += 1;
                }
            }
            black_box(lines)
        })
    });

    group.bench_function("decode_lossy", |b| {
        b.iter(|| black_box(decode_lossy(black_box(&data))))
    });

    group.finish();
}

fn adapter_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let data = nmea_stream(64);

    let mut group = c.benchmark_group("adapter");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("read_lines_from_frames", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut device = ScriptedTransport::new("bench");
            for chunk in data.chunks(48) {
                device = device.then(Duration::ZERO, chunk);
            }
            let mut adapter = FramedLineAdapter::new(device, ReaderConfig::default());
            adapter.pull(Duration::from_millis(1)).await.unwrap();

            let mut lines = 0;
            while adapter.buffered() > 0 {
                adapter.read_line(Duration::ZERO).await.unwrap();
                lines += 1;
            }
            black_box(lines)
        })
    });

    group.finish();
}

criterion_group!(benches, buffer_benchmark, adapter_benchmark);
criterion_main!(benches);
