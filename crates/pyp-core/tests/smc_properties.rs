//! Particle population properties and conditional SMC scenarios.

use proptest::prelude::*;
use pyp_config::{FilterConfig, ResampleMethod};
use pyp_core::smc::{apply_counts, resample_counts, Filter, ParticleSystem};
use pyp_core::SmcModel;
use pyp_math::log_sum_exp;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn method_strategy() -> impl Strategy<Value = ResampleMethod> {
    prop::sample::select(ResampleMethod::ALL.to_vec())
}

/// Log weights drawn from a model whose increments are given up front.
struct Scripted(Vec<f64>);

impl SmcModel for Scripted {
    type Particle = usize;
    type Observation = ();

    fn init<R: Rng + ?Sized>(&self, p: &mut usize, rng: &mut R) -> f64 {
        *p = rng.random_range(0..self.0.len());
        self.0[*p]
    }

    fn extend<R: Rng + ?Sized>(&self, _p: &mut usize, _obs: &(), _rng: &mut R) -> f64 {
        0.0
    }

    fn score(&self, _p: &mut usize, _obs: &(), _t: usize) -> f64 {
        0.0
    }
}

// ============================================================================
// populations
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// 1 <= ESS <= N for finite weights, and probabilities sum to one.
    #[test]
    fn ess_bounds(weights in prop::collection::vec(-50.0..50.0f64, 1..64), seed in any::<u64>()) {
        let n = weights.len();
        let cfg = FilterConfig::default().with_particles(n);
        let mut filter = Filter::new(cfg, seed).unwrap();
        filter.run(&Scripted(weights), &[]).unwrap();
        let ess = filter.ess();
        prop_assert!(ess >= 1.0 - 1e-9 && ess <= n as f64 + 1e-9, "ess {} for N = {}", ess, n);
        let total: f64 = filter.system().probabilities().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    /// Copy counts sum to N and the population stays N with uniform weights.
    #[test]
    fn resampling_preserves_population(
        method in method_strategy(),
        weights in prop::collection::vec(prop_oneof![Just(f64::NEG_INFINITY), -20.0..5.0f64], 1..48),
        seed in any::<u64>(),
    ) {
        prop_assume!(weights.iter().any(|w| w.is_finite()));
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let n = weights.len();
        let log_z = log_sum_exp(&weights);
        let probs: Vec<f64> = weights.iter().map(|w| (w - log_z).exp()).collect();

        let counts = resample_counts(method, &probs, &mut rng).unwrap();
        prop_assert_eq!(counts.iter().sum::<usize>(), n);
        for (c, p) in counts.iter().zip(&probs) {
            if *p == 0.0 && method != ResampleMethod::None {
                prop_assert_eq!(*c, 0);
            }
        }

        let mut system: ParticleSystem<usize> = ParticleSystem::new(n);
        apply_counts(&mut system, &counts);
        prop_assert_eq!(system.len(), n);
        prop_assert!(system.log_weights().iter().all(|&w| w == 0.0));
        prop_assert!((system.ess() - n as f64).abs() < 1e-9);
    }
}

#[test]
fn multinomial_copies_converge_to_expectation() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
    let probs = [0.7, 0.1, 0.1, 0.1];
    let trials = 50_000;
    let mut sums = [0usize; 4];
    for _ in 0..trials {
        let counts = resample_counts(ResampleMethod::Multinomial, &probs, &mut rng).unwrap();
        for (s, c) in sums.iter_mut().zip(counts) {
            *s += c;
        }
    }
    let expected = [2.8, 0.4, 0.4, 0.4];
    for (s, e) in sums.iter().zip(expected) {
        let mean = *s as f64 / trials as f64;
        assert!((mean - e).abs() < 0.03, "{mean} vs {e}");
    }
}

/// Two particle types: one pays nothing per step, the other pays 5 nats.
struct Costly;

impl SmcModel for Costly {
    type Particle = bool;
    type Observation = ();

    fn init<R: Rng + ?Sized>(&self, p: &mut bool, rng: &mut R) -> f64 {
        *p = rng.random();
        0.0
    }

    fn extend<R: Rng + ?Sized>(&self, p: &mut bool, obs: &(), _rng: &mut R) -> f64 {
        self.score(p, obs, 0)
    }

    fn score(&self, p: &mut bool, _obs: &(), _t: usize) -> f64 {
        if *p {
            -5.0
        } else {
            0.0
        }
    }
}

#[test]
fn log_partition_survives_resampling() {
    // Z = 1/2 + e^-20 / 2, so log Z is ln(1/2) up to sampling noise.
    let estimate = |method, threshold| {
        let cfg = FilterConfig::default()
            .with_particles(4000)
            .with_resample(method, threshold);
        let mut filter = Filter::new(cfg, 17).unwrap();
        let z = filter.estimate_log_partition(&Costly, &[(); 4]).unwrap();
        (z, filter.resamples())
    };
    let (plain, none_resamples) = estimate(ResampleMethod::None, 0.9);
    assert_eq!(none_resamples, 0);
    assert!((plain - 0.5f64.ln()).abs() < 0.06, "{plain}");
    for method in [
        ResampleMethod::Multinomial,
        ResampleMethod::Residual,
        ResampleMethod::Stratified,
        ResampleMethod::Systematic,
    ] {
        let (z, resamples) = estimate(method, 0.9);
        assert!(resamples > 0, "{method}");
        assert!((z - plain).abs() < 0.01, "{method}: {z} vs {plain}");
    }
}

// ============================================================================
// conditional SMC
// ============================================================================

/// Zero-weight model: particles record a marker per step.
struct Zero;

impl SmcModel for Zero {
    type Particle = Vec<u8>;
    type Observation = u8;

    fn init<R: Rng + ?Sized>(&self, p: &mut Vec<u8>, _rng: &mut R) -> f64 {
        p.clear();
        0.0
    }

    fn extend<R: Rng + ?Sized>(&self, p: &mut Vec<u8>, _obs: &u8, rng: &mut R) -> f64 {
        p.push(rng.random());
        0.0
    }

    fn score(&self, _p: &mut Vec<u8>, _obs: &u8, _t: usize) -> f64 {
        0.0
    }
}

#[test]
fn single_particle_conditional_run_returns_reference() {
    let fixed = vec![7u8, 3, 250, 0, 42];
    for &method in ResampleMethod::ALL {
        let cfg = FilterConfig::default().with_particles(1).with_resample(method, 0.5);
        let mut filter = Filter::new(cfg, 5).unwrap();
        filter.run_conditional(&Zero, &fixed, &[0; 5]).unwrap();
        assert_eq!(filter.system().log_weights(), &[0.0]);
        let drawn = filter.conditional_sample(&Zero, &fixed, &[0; 5]).unwrap();
        assert_eq!(drawn, fixed);
    }
}

/// The reference scores badly while free particles score 0.
struct Outvoted;

impl SmcModel for Outvoted {
    type Particle = Vec<u8>;
    type Observation = ();

    fn init<R: Rng + ?Sized>(&self, p: &mut Vec<u8>, _rng: &mut R) -> f64 {
        p.clear();
        0.0
    }

    fn extend<R: Rng + ?Sized>(&self, p: &mut Vec<u8>, _obs: &(), _rng: &mut R) -> f64 {
        p.push(1);
        0.0
    }

    fn score(&self, p: &mut Vec<u8>, _obs: &(), t: usize) -> f64 {
        match p.get(t).copied() {
            Some(0) => -1000.0,
            Some(_) => 0.0,
            None => {
                p.push(1);
                0.0
            }
        }
    }
}

#[test]
fn reference_trajectory_can_be_resampled_away() {
    // Slot 0 takes part in resampling like every other slot, so a poor
    // reference does not survive the run.
    let fixed = vec![0u8; 4];
    let cfg = FilterConfig::default()
        .with_particles(8)
        .with_resample(ResampleMethod::Multinomial, 0.9);
    let mut filter = Filter::new(cfg, 13).unwrap();
    filter.run_conditional(&Outvoted, &fixed, &[(); 4]).unwrap();
    assert!(filter.resamples() > 0);
    assert_ne!(filter.system().particle(0), &fixed);
    assert!(filter.system().particles().iter().all(|p| p == &vec![1u8; 4]));
}

#[test]
fn filter_results_do_not_depend_on_thread_count() {
    let run = |threads| {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        pool.install(|| {
            let cfg = FilterConfig {
                streams: 3,
                ..FilterConfig::default()
                    .with_particles(50)
                    .with_resample(ResampleMethod::Residual, 0.6)
            };
            let mut filter = Filter::new(cfg, 99).unwrap();
            filter.sample(&Zero, &[1, 2, 3, 4, 5, 6]).unwrap()
        })
    };
    assert_eq!(run(1), run(4));
}
