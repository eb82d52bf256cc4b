//! Criterion benchmarks for the particle filters.
//!
//! Uses the latent tagger on a fixed synthetic corpus so the cost of one
//! filter run is dominated by proposals, not model growth.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pyp_config::{FilterConfig, HpypConfig, ResampleMethod};
use pyp_core::models::TagSequenceModel;
use pyp_core::{Filter, Model};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn trained() -> (TagSequenceModel, Vec<u32>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    let mut model = TagSequenceModel::new(8, 200, &HpypConfig::default()).expect("valid config");
    for _ in 0..200 {
        let words: Vec<u32> = (0..12).map(|_| rng.random_range(0..200)).collect();
        let tags: Vec<u32> = words.iter().map(|w| w % 8).collect();
        let particle = model.make_particle(&tags, &vec![1; tags.len()]).expect("tags in range");
        model.observe(&particle, &words, &mut rng).expect("observe");
    }
    let sentence = (0..30).map(|i| (i * 7) % 200).collect();
    (model, sentence)
}

fn bench_filters(c: &mut Criterion) {
    let (model, sentence) = trained();
    let mut group = c.benchmark_group("filter");
    group.sample_size(20);

    for particles in [16usize, 128] {
        for method in [ResampleMethod::Multinomial, ResampleMethod::Systematic] {
            let cfg = FilterConfig::default()
                .with_particles(particles)
                .with_resample(method, 0.5);
            let mut filter = Filter::new(cfg, 11).expect("valid filter");
            group.bench_function(BenchmarkId::new(format!("run_{method}"), particles), |b| {
                b.iter(|| filter.run(&model, black_box(&sentence)).expect("run"))
            });
        }

        let cfg = FilterConfig::default()
            .with_particles(particles)
            .with_resample(ResampleMethod::Residual, 0.5);
        let mut filter = Filter::new(cfg, 12).expect("valid filter");
        let reference = filter.sample(&model, &sentence).expect("sample");
        group.bench_function(BenchmarkId::new("conditional_sample", particles), |b| {
            b.iter(|| {
                black_box(
                    filter
                        .conditional_sample(&model, &reference, black_box(&sentence))
                        .expect("conditional"),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);
