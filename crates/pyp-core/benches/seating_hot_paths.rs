//! Criterion benchmarks for seating and hierarchy updates.
//!
//! Observe/remove pairs keep the process at a fixed size, so each
//! iteration measures a steady-state update rather than growth.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pyp_config::{HpypConfig, RestaurantKind};
use pyp_core::base_measure::Uniform;
use pyp_core::hpyp::Hpyp;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const VOCAB: u32 = 500;

fn warmed(kind: RestaurantKind, rng: &mut Xoshiro256PlusPlus) -> Hpyp<u32, u32, Uniform> {
    let cfg = HpypConfig::default().with_restaurant(kind);
    let mut h = Hpyp::new(Uniform::new(VOCAB as usize), &cfg).expect("valid config");
    let mut history = vec![0u32; 5];
    for _ in 0..20_000 {
        // Zipf-ish draws keep some restaurants busy.
        let dish = (rng.random::<f64>().powi(3) * VOCAB as f64) as u32;
        h.observe(&history, &dish, rng).expect("observe");
        history.rotate_left(1);
        history[4] = dish;
    }
    h
}

fn bench_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("hpyp_update");
    for kind in [RestaurantKind::TableList, RestaurantKind::Histogram, RestaurantKind::Trie] {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut h = warmed(kind, &mut rng);
        let ctx = [0u32, 1, 0, 2, 0];
        group.bench_function(BenchmarkId::new("observe_remove", format!("{kind:?}")), |b| {
            b.iter(|| {
                h.observe(black_box(&ctx), &1, &mut rng).expect("observe");
                h.remove(black_box(&ctx), &1, &mut rng).expect("remove");
            })
        });
    }
    group.finish();
}

fn bench_probability(c: &mut Criterion) {
    let mut group = c.benchmark_group("hpyp_probability");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
    let h = warmed(RestaurantKind::Histogram, &mut rng);
    for depth in [0usize, 2, 5] {
        let ctx = vec![0u32; depth];
        group.bench_with_input(BenchmarkId::new("probability", depth), &ctx, |b, ctx| {
            b.iter(|| black_box(h.probability(black_box(ctx), &0)))
        });
    }
    group.bench_function("distribution_full_vocab", |b| {
        b.iter(|| black_box(h.distribution(&[0, 0, 0], 0..VOCAB)))
    });
    group.finish();
}

criterion_group!(benches, bench_updates, bench_probability);
criterion_main!(benches);
