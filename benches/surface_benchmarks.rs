//! Performance benchmarks for stagefocus
//!
//! Run with: cargo bench
//!
//! Covers the host-side costs of an autofocus run: fitting and evaluating the
//! focal surface, scoring frames, and driving a search against the simulator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stagefocus::quality::{GradientEnergyScorer, LaplacianVarianceScorer};
use stagefocus::testing::{SimulatedStage, SyntheticScorer};
use stagefocus::{
    focus_from_image_stack, focus_from_last_point, grid_points, AdaptiveParams, Frame,
    FullScanParams, SharpnessScorer, StagePosition, SurfaceInterpolator,
};
use std::time::Duration;

/// Gently curved chip with a little per-point noise
fn chip_samples(n: usize) -> Vec<StagePosition> {
    let step = 10_000.0 / (n - 1) as f64;
    (0..n * n)
        .map(|k| {
            let (x, y) = ((k % n) as f64 * step, (k / n) as f64 * step);
            let bow = 2e-7 * (x - 5000.0).powi(2);
            let jitter = ((k * 7919) % 13) as f64 * 0.1;
            StagePosition::new(x, y, 0.003 * x - 0.002 * y + bow + jitter + 400.0)
        })
        .collect()
}

/// Checkerboard frame with a gradient, roughly a focused target
fn test_frame(size: u32) -> Frame {
    let data = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            let checker = if ((x / 4) + (y / 4)) % 2 == 0 { 1500 } else { 500 };
            (checker + x + y) as u16
        })
        .collect();
    Frame::new(size, size, data)
}

fn bench_surface_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Surface Fit");

    for n in [2usize, 3, 4, 8, 16] {
        let samples = chip_samples(n);
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::new("fit", n * n), &samples, |b, samples| {
            b.iter(|| SurfaceInterpolator::fit(black_box(samples)).expect("Fit failed"));
        });
    }

    group.finish();
}

fn bench_surface_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Surface Evaluate");
    let surface = SurfaceInterpolator::fit(&chip_samples(4)).expect("Fit failed");

    group.bench_function("evaluate", |b| {
        b.iter(|| surface.evaluate(black_box(1234.5), black_box(6789.0)));
    });
    group.bench_function("evaluate_checked", |b| {
        b.iter(|| surface.evaluate_checked(black_box(1234.5), black_box(6789.0)));
    });

    group.throughput(Throughput::Elements(100 * 100));
    group.bench_function("dense_grid_100x100", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for j in 0..100 {
                for i in 0..100 {
                    sum += surface.evaluate(i as f64 * 100.0, j as f64 * 100.0);
                }
            }
            black_box(sum)
        });
    });

    group.finish();
}

fn bench_sharpness(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sharpness Scoring");

    for size in [64u32, 256, 1024] {
        if size == 1024 {
            group.sample_size(20);
        }
        let frame = test_frame(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("laplacian", size), &frame, |b, frame| {
            b.iter(|| LaplacianVarianceScorer.score(black_box(frame)).expect("Score failed"));
        });
        group.bench_with_input(BenchmarkId::new("gradient", size), &frame, |b, frame| {
            b.iter(|| GradientEnergyScorer.score(black_box(frame)).expect("Score failed"));
        });
    }

    group.finish();
}

fn bench_simulated_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("Simulated Search");
    group.measurement_time(Duration::from_secs(5));

    let points = grid_points((0.0, 1000.0), (0.0, 1000.0), 5, 5).expect("Grid failed");
    let scorer = SyntheticScorer::from_position(|p| (p.z - (0.01 * p.x - 0.01 * p.y + 100.0)).abs());

    group.bench_function("full_range_5x5", |b| {
        b.iter(|| {
            let mut stage = SimulatedStage::tilted(0.01, -0.01, 100.0).with_start_z(100.0);
            focus_from_image_stack(&points, &mut stage, &scorer, &FullScanParams::default())
                .expect("Search failed")
        });
    });
    group.bench_function("adaptive_5x5", |b| {
        b.iter(|| {
            let mut stage = SimulatedStage::tilted(0.01, -0.01, 100.0).with_start_z(100.0);
            focus_from_last_point(&points, &mut stage, &scorer, &AdaptiveParams::default())
                .expect("Search failed")
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_surface_fit,
    bench_surface_evaluate,
    bench_sharpness,
    bench_simulated_search
);
criterion_main!(benches);
