//! Benchmark for noise and density field synthesis.
//!
//! TARGET: 128³ field in under one second (initialization budget)
//!
//! Run with: cargo bench --package penumbra_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use penumbra_procedural::{FieldSeed, ImprovedNoise, NoiseFieldSynthesizer};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = ImprovedNoise::new(FieldSeed::new(42));

    c.bench_function("single_noise_sample_3d", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7), black_box(x * 0.3)))
        });
    });
}

fn benchmark_periodic_sample(c: &mut Criterion) {
    let noise = ImprovedNoise::new(FieldSeed::new(42));

    c.bench_function("periodic_noise_sample_3d", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample_periodic(black_box(x), x * 0.7, x * 0.3, 50))
        });
    });
}

fn benchmark_field_synthesis(c: &mut Criterion) {
    let synth = NoiseFieldSynthesizer::new(FieldSeed::new(42));

    let mut group = c.benchmark_group("density_field");
    group.sample_size(10);

    for size in [32u32, 64, 128] {
        group.throughput(Throughput::Elements(u64::from(size).pow(3)));
        group.bench_function(format!("build_{size}"), |b| {
            b.iter(|| black_box(synth.build(size, &[10.0], 5.0)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_periodic_sample,
    benchmark_field_synthesis,
);
criterion_main!(benches);
