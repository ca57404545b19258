//! Motion profiling, synchronization and collision check benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::Point3;
use stagesim::collision::{Collider, CollisionVolume, EnvelopeExtents, detect_collisions};
use stagesim::motion::{MotionProfiler, synchronize};
use stagesim_common::stage::config::Orientation;
use stagesim_common::stage::types::StageId;
use std::hint::black_box;

/// Benchmark a 10 mm move at the default integration step
fn bench_profile_long_move(c: &mut Criterion) {
    let profiler = MotionProfiler::default();

    c.bench_function("profile_10mm_move", |b| {
        b.iter(|| {
            let segment = profiler
                .profile(black_box(0.0), black_box(10_000.0), 2_000.0, 5_000.0)
                .unwrap();
            black_box(segment.len());
        });
    });
}

/// Benchmark synchronizing three axes of different lengths
fn bench_synchronize(c: &mut Criterion) {
    let profiler = MotionProfiler::default();
    let segments = vec![
        profiler.profile(0.0, 10_000.0, 2_000.0, 5_000.0).unwrap(),
        profiler.profile(0.0, 2_500.0, 2_000.0, 5_000.0).unwrap(),
        profiler.profile(100.0, 80.0, 200.0, 500.0).unwrap(),
    ];

    c.bench_function("synchronize_3_axes_decimation_100", |b| {
        b.iter(|| {
            let waypoints = synchronize(black_box(&segments), 100).unwrap();
            black_box(waypoints.len());
        });
    });
}

/// Benchmark the pairwise overlap test of four stages and a chip
fn bench_detect_collisions(c: &mut Criterion) {
    let extents = EnvelopeExtents {
        fiber_diameter: 125.0,
        fiber_length: 10_000.0,
        safety_distance: 125.0,
    };
    let volumes = [
        CollisionVolume::at(Point3::new(0.0, 0.0, 50.0), Orientation::Left, &extents),
        CollisionVolume::at(Point3::new(2_000.0, 0.0, 50.0), Orientation::Right, &extents),
        CollisionVolume::at(Point3::new(1_000.0, 800.0, 50.0), Orientation::Top, &extents),
        CollisionVolume::at(Point3::new(1_000.0, -800.0, 50.0), Orientation::Bottom, &extents),
    ];
    let chip = CollisionVolume::from_center_half_extents(
        Point3::new(1_000.0, 0.0, 0.0),
        nalgebra::Vector3::new(1_010.0, 510.0, 10.0),
    );
    let mut entries: Vec<(Collider, &CollisionVolume)> = volumes
        .iter()
        .enumerate()
        .map(|(i, v)| (Collider::Stage(StageId(i)), v))
        .collect();
    entries.push((Collider::Workpiece, &chip));

    c.bench_function("detect_collisions_4_stages", |b| {
        b.iter(|| black_box(detect_collisions(black_box(&entries))));
    });
}

criterion_group!(
    benches,
    bench_profile_long_move,
    bench_synchronize,
    bench_detect_collisions
);
criterion_main!(benches);
