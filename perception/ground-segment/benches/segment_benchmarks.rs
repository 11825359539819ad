//! Benchmarks for ground segmentation.
//!
//! Run with: cargo bench -p ground-segment
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p ground-segment -- --save-baseline main
//! 2. After changes: cargo bench -p ground-segment -- --baseline main

#![allow(missing_docs, clippy::cast_precision_loss, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ground_segment::{segment_obstacles_from_ground, ClassifierParams, GroundSegmenter, SegmentationConfig};
use sensor_types::{CloudHeader, PointCloud, Timestamp};

// =============================================================================
// Test Cloud Generation
// =============================================================================

/// A floor grid with a box standing on it, roughly what a depth camera sees
/// in front of the robot.
fn create_scene(side: usize) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(CloudHeader::new(Timestamp::from_nanos(1), "base_link"), side * side * 2);
    let spacing = 0.02;

    for i in 0..side {
        for j in 0..side {
            let x = 0.3 + i as f64 * spacing;
            let y = j as f64 * spacing - side as f64 * spacing / 2.0;
            cloud.push_coords(x, y, -0.4);
        }
    }

    let front = 0.3 + side as f64 * spacing / 2.0;
    for j in 0..side {
        for k in 0..side {
            let y = j as f64 * spacing - side as f64 * spacing / 2.0;
            cloud.push_coords(front, y, -0.4 + k as f64 * spacing);
        }
    }

    cloud
}

// =============================================================================
// Classifier Benchmarks
// =============================================================================

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("Classifier");

    let test_cases = [
        ("scene_800", create_scene(20)),
        ("scene_5000", create_scene(50)),
        ("scene_20000", create_scene(100)),
    ];

    for (name, cloud) in &test_cases {
        group.throughput(Throughput::Elements(cloud.len() as u64));

        group.bench_with_input(BenchmarkId::new("parallel", name), cloud, |b, cloud| {
            let params = ClassifierParams::default();
            b.iter(|| segment_obstacles_from_ground(black_box(cloud), &params));
        });

        group.bench_with_input(BenchmarkId::new("serial", name), cloud, |b, cloud| {
            let params = ClassifierParams::default().with_parallel(false);
            b.iter(|| segment_obstacles_from_ground(black_box(cloud), &params));
        });
    }

    group.finish();
}

// =============================================================================
// Strategy Benchmarks
// =============================================================================

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("Strategy");

    let cloud = create_scene(50);
    let configs = [
        ("simple", SegmentationConfig::simple()),
        ("single_zone", SegmentationConfig::single_zone()),
        ("dual_zone", SegmentationConfig::default()),
    ];

    group.throughput(Throughput::Elements(cloud.len() as u64));
    for (name, config) in configs {
        let segmenter = GroundSegmenter::new(config).unwrap();
        group.bench_function(BenchmarkId::new("segment", name), |b| {
            b.iter(|| segmenter.segment(black_box(&cloud)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classifier, bench_strategies);
criterion_main!(benches);
