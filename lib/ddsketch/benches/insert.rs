use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ddsketch::{DDSketch, SketchConfig};
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

fn make_points(size: usize) -> Vec<f64> {
    // Samples that roughly correspond to the latency of a typical web service, in microseconds: a big hump at the
    // beginning with a long tail, bottoming out at 15 milliseconds and tailing off all the way up to 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let seed = 0xC0FFEE;

    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    distribution
        .sample_iter(&mut rng)
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

fn insert_single(ns: &[f64]) -> DDSketch {
    let mut sketch = DDSketch::default();
    for n in ns {
        sketch.add(*n).expect("finite value");
    }
    sketch
}

fn bench_insert(c: &mut Criterion) {
    let sizes = [1, 10, 100, 1_000, 10_000];

    let mut group = c.benchmark_group("DDSketch/insert-single");
    for size in sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let vals = make_points(size);
            b.iter(|| insert_single(&vals));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("DDSketch/insert-n");
    for count in [1u64, 10, 100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut sketch = DDSketch::default();
                sketch.add_n(12345.0, count).expect("finite value");
                sketch
            });
        });
    }
    group.finish();

    // A small bucket limit keeps the store permanently full, so every new bucket exercises the collapse path.
    let mut group = c.benchmark_group("DDSketch/insert-collapsing");
    for size in sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let vals = make_points(size);
            let config = SketchConfig::new(0.01, 32, 1e-9).expect("valid config");
            b.iter(|| {
                let mut sketch = DDSketch::new(config);
                for n in &vals {
                    sketch.add(*n).expect("finite value");
                }
                sketch
            });
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("DDSketch/merge");
    for size in [100, 1_000, 10_000] {
        let left = insert_single(&make_points(size));
        let right = insert_single(&make_points(size * 2)[size..]);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut merged = left.clone();
                merged.merge(&right).expect("compatible sketches");
                merged
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_merge);
criterion_main!(benches);
