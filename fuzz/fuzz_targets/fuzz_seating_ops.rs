//! Fuzz target for observe/remove sequences on the hierarchy.
//!
//! Arbitrary interleavings of seating and unseating must keep every count
//! consistent; removals of absent customers must fail cleanly.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pyp_config::{HpypConfig, RestaurantKind};
use pyp_core::base_measure::Uniform;
use pyp_core::hpyp::Hpyp;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[derive(Debug, Arbitrary)]
enum Op {
    Observe { context: Vec<u8>, dish: u8 },
    Remove { context: Vec<u8>, dish: u8 },
    UndoLast,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    kind: u8,
    max_depth: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let kind = match input.kind % 3 {
        0 => RestaurantKind::TableList,
        1 => RestaurantKind::Histogram,
        _ => RestaurantKind::Trie,
    };
    let cfg = HpypConfig::default()
        .with_restaurant(kind)
        .with_max_depth(2 + (input.max_depth % 6) as usize);
    let mut h: Hpyp<u8, u8, Uniform> = Hpyp::new(Uniform::new(256), &cfg).expect("valid config");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(input.seed);
    let mut seated: Vec<(Vec<u8>, u8)> = Vec::new();

    for op in input.ops.into_iter().take(256) {
        match op {
            Op::Observe { context, dish } => {
                h.observe(&context, &dish, &mut rng).expect("observe never fails");
                seated.push((context, dish));
            }
            Op::Remove { context, dish } => {
                let before = h.total_customers();
                match h.remove(&context, &dish, &mut rng) {
                    Ok(()) => {
                        assert_eq!(h.total_customers(), before - 1);
                        let limit = h.context_limit();
                        let key = |c: &[u8]| c[c.len().saturating_sub(limit)..].to_vec();
                        if let Some(i) = seated
                            .iter()
                            .position(|(c, d)| *d == dish && key(c) == key(&context))
                        {
                            seated.swap_remove(i);
                        }
                    }
                    Err(_) => assert_eq!(h.total_customers(), before),
                }
            }
            Op::UndoLast => {
                if let Some((context, dish)) = seated.pop() {
                    h.remove(&context, &dish, &mut rng).expect("seated customer");
                }
            }
        }
        assert!(h.check_consistency());
    }

    let total: f64 = h.distribution(&[1, 2, 3], 0..=255u8).iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-6);
});
