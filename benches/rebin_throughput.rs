//! Rebinning throughput benchmark
//!
//! A full detector readout is ~5160 DOMs, each sending a payload of a few
//! hundred scaler slots. This measures the per-payload rebinning cost, the
//! payload decoder and the staging path.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench rebin_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snrebin::handler::DataHandler;
use snrebin::payload::SnPayload;
use snrebin::rebin::{rebin_scalers, SCALER_UDT};

/// Scalers with the sparse, low-count texture of real SN data
fn scalers(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31) % 11 / 8) as u8).collect()
}

fn bench_rebin_scalers(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebin_scalers");
    for len in [64usize, 512, 4096] {
        let data = scalers(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| rebin_scalers(black_box(0), black_box(SCALER_UDT / 3), black_box(data)));
        });
    }
    group.finish();
}

fn bench_rebin_dense(c: &mut Criterion) {
    let data = vec![255u8; 4096];
    c.bench_function("rebin_scalers_dense_4096", |b| {
        b.iter(|| rebin_scalers(black_box(0), black_box(0), black_box(&data)));
    });
}

fn bench_payload_decode(c: &mut Criterion) {
    let bytes = SnPayload::new(133_620_063_000_000, 0x6a5f_e0c0_1a2b, 42, scalers(512))
        .encode()
        .unwrap();
    c.bench_function("payload_decode_512", |b| {
        b.iter(|| SnPayload::decode(black_box(&bytes)));
    });
}

fn bench_stage_readout(c: &mut Criterion) {
    let payloads: Vec<SnPayload> = (0..5160u64)
        .map(|dom| SnPayload::new(0, dom + 1, 0, scalers(512)))
        .collect();
    c.bench_function("stage_full_readout", |b| {
        b.iter(|| {
            let mut handler = DataHandler::new(5160, 4000);
            for payload in &payloads {
                let _ = handler.ingest(black_box(payload));
            }
            black_box(handler.flush().len())
        });
    });
}

criterion_group!(
    benches,
    bench_rebin_scalers,
    bench_rebin_dense,
    bench_payload_decode,
    bench_stage_readout,
);
criterion_main!(benches);
