//! Criterion microbenches for arrowlabel codecs and batch building.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Bbox format conversion (format_xywh)
//! - Batch encoding annotations to columns (batch_struct)
//! - Batch decoding columns back to annotations (batch_decode)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use arrowlabel::batch::{batch_decode, batch_struct};
use arrowlabel::{Bbox, BboxFormat, CompressedRle, ObjectAnnotation, Pose};

const BATCH_SIZE: usize = 1_000;

fn sample_batch(n: usize) -> Vec<ObjectAnnotation> {
    (0..n)
        .map(|i| {
            let x = (i % 100) as f32;
            ObjectAnnotation::new(format!("ann-{i}"))
                .with_view_id("image")
                .with_bbox(Bbox::new([x, x, x + 10.0, x + 20.0], BboxFormat::Xyxy, false))
                .with_bbox_confidence(0.5)
                .with_mask(CompressedRle::new([480, 640], vec![0x61; 16]))
                .with_pose(Pose::new([1.0; 9], [0.0; 3]))
                .with_category((i % 10) as i32, "person")
        })
        .collect()
}

/// Benchmark pure bbox format conversion.
fn bench_bbox_conversion(c: &mut Criterion) {
    let bbox = Bbox::from_xyxy([0.1, 0.2, 0.5, 0.6]);

    c.bench_function("bbox_format_xywh", |b| {
        b.iter(|| black_box(black_box(&bbox).format_xywh()))
    });
}

/// Benchmark encoding a batch of annotations into a struct array.
fn bench_batch_encode(c: &mut Criterion) {
    let batch = sample_batch(BATCH_SIZE);
    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));

    group.bench_function("encode", |b| {
        b.iter(|| batch_struct(black_box(&batch)).unwrap())
    });

    group.finish();
}

/// Benchmark decoding a struct array back into annotations.
fn bench_batch_decode(c: &mut Criterion) {
    let array = batch_struct(&sample_batch(BATCH_SIZE)).unwrap();
    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));

    group.bench_function("decode", |b| {
        b.iter(|| batch_decode::<ObjectAnnotation>(black_box(&array)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bbox_conversion,
    bench_batch_encode,
    bench_batch_decode
);
criterion_main!(benches);
