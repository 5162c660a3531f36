/*
 * Boid Flocking Benchmark
 *
 * This file contains benchmarks for the flocking engine to identify performance bottlenecks.
 * It measures the grid rebuild and neighbor gathering, the rule evaluation of a full step
 * with and without the spatial grid, and the sequential versus parallel step.
 */

use boid_flock::{
    Flock, FlockConfig, FlockParams, NeighborhoodIndex, Neighborhoods, SpatialGrid, Vector,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const WORLD_SIZE: f32 = 1000.0;

fn bench_params() -> FlockParams {
    FlockParams {
        vision_radius: 50.0,
        repulsion_radius: 20.0,
        ..FlockParams::viewer_preset()
    }
}

fn random_positions(n: usize) -> Vec<Vector<2>> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..n)
        .map(|_| Vector::from([rng.gen_range(0.0..WORLD_SIZE), rng.gen_range(0.0..WORLD_SIZE)]))
        .collect()
}

fn flock_with(n: usize, params: FlockParams) -> Flock<2> {
    let config = FlockConfig::new(n, [WORLD_SIZE, WORLD_SIZE])
        .with_params(params)
        .with_seed(0);
    Flock::new(config).expect("benchmark config is valid")
}

// Benchmark the spatial grid rebuild and both radius queries
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    let params = bench_params();

    for num_boids in [100, 500, 1000, 2000].iter() {
        let positions = random_positions(*num_boids);
        group.bench_with_input(BenchmarkId::from_parameter(num_boids), &positions, |b, positions| {
            let mut grid = SpatialGrid::new(params.grid_cell_size());
            b.iter(|| {
                grid.rebuild(black_box(positions), params.grid_cell_size());
                black_box(Neighborhoods::gather(
                    &grid,
                    params.vision_radius,
                    params.repulsion_radius,
                    false,
                ))
            });
        });
    }

    group.finish();
}

// Benchmark a full step with and without the spatial grid
fn bench_force_calculations(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_calculations");

    for num_boids in [100, 500, 1000].iter() {
        for enable_spatial_grid in [true, false] {
            let params = FlockParams {
                enable_spatial_grid,
                enable_parallel: false,
                ..bench_params()
            };
            let label = if enable_spatial_grid { "grid" } else { "brute_force" };
            group.bench_with_input(BenchmarkId::new(label, num_boids), num_boids, |b, &n| {
                let mut flock = flock_with(n, params);
                b.iter(|| black_box(flock.step().expect("step succeeds")));
            });
        }
    }

    group.finish();
}

// Benchmark the overall update loop, sequential against parallel
fn bench_update_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_loop");

    for num_boids in [100, 500, 1000, 2000].iter() {
        for enable_parallel in [false, true] {
            let params = FlockParams {
                enable_parallel,
                ..bench_params()
            };
            let label = if enable_parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, num_boids), num_boids, |b, &n| {
                let mut flock = flock_with(n, params);
                b.iter(|| flock.move_boids(black_box(5)).expect("steps succeed"));
            });
        }
    }

    group.finish();
}

// Configure the benchmarks
criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_spatial_grid, bench_force_calculations, bench_update_loop
}

criterion_main!(benches);
