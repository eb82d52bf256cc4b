//! Per-node hyperparameter resampling.
//!
//! Each node's discount and concentration are slice-sampled against the
//! exchangeable probability of its current seating arrangement:
//!
//! ```text
//! ln p(seating | d, a) = Σ_{t=1}^{T-1} ln(a + t·d)
//!                      - [lnΓ(a + C) - lnΓ(a + 1)]
//!                      + Σ_k [lnΓ(n_k - d) - lnΓ(1 - d)]
//! ```
//!
//! with `C` customers, `T` tables and table sizes `n_k`. Nodes are
//! independent given the seating, so they are processed in parallel.

use pyp_config::HyperPrior;
use pyp_math::{gamma_log_pdf, log_beta_pdf, log_gamma, SliceSampler};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use std::fmt::Debug;
use tracing::debug;

use super::{Domain, Hpyp};
use crate::base_measure::BaseMeasure;
use crate::context_tree::Hyperparameters;
use crate::logging::event_names;
use crate::seating::{Dish, SeatingArrangement};

/// Log probability of a restaurant's seating under `(discount, concentration)`.
///
/// The base measure's contribution is excluded. An empty restaurant scores 0.
pub fn seating_log_likelihood<D, S>(restaurant: &S, discount: f64, concentration: f64) -> f64
where
    D: Dish,
    S: SeatingArrangement<D>,
{
    let customers = restaurant.customers();
    let tables = restaurant.tables();
    if customers == 0 {
        return 0.0;
    }
    let a = concentration;
    let d = discount;

    let mut ll = 0.0;
    for t in 1..tables {
        ll += (a + t as f64 * d).ln();
    }
    ll -= log_gamma(a + customers as f64) - log_gamma(a + 1.0);
    let unit = log_gamma(1.0 - d);
    for (size, count) in restaurant.size_histogram() {
        ll += count as f64 * (log_gamma(size as f64 - d) - unit);
    }
    ll
}

fn resample_node<D, S, R>(
    restaurant: &S,
    hyper: Hyperparameters,
    prior: &HyperPrior,
    rng: &mut R,
) -> Hyperparameters
where
    D: Dish,
    S: SeatingArrangement<D>,
    R: Rng + ?Sized,
{
    let discount_slice = SliceSampler::new(0.1, 0.0, 1.0);
    let concentration_slice = SliceSampler::new(1.0, 0.0, f64::INFINITY);
    let (beta_a, beta_b) = prior.discount_beta;
    let (shape, rate) = prior.concentration_gamma;

    let mut current = hyper;
    for _ in 0..prior.sweeps {
        let a = current.concentration;
        current.discount = discount_slice.step(
            current.discount,
            |d| {
                log_beta_pdf(d, beta_a, beta_b) + seating_log_likelihood::<D, S>(restaurant, d, a)
            },
            rng,
        );
        let d = current.discount;
        current.concentration = concentration_slice.step(
            current.concentration,
            |a| gamma_log_pdf(a, shape, rate) + seating_log_likelihood::<D, S>(restaurant, d, a),
            rng,
        );
    }
    current
}

impl<C, D, B, A> Hpyp<C, D, B, A>
where
    C: Ord + Clone + Debug + Send,
    D: Dish,
    B: BaseMeasure<D>,
    A: Domain,
{
    /// Whether [`Hpyp::resample_hyperparameters`] does anything.
    pub fn resamples_hyperparameters(&self) -> bool {
        self.hyper_prior.is_some()
    }

    /// Slice-sample every node's discount and concentration.
    ///
    /// One independent stream per node is seeded from `rng`, so the result
    /// depends only on `rng` and not on the rayon thread count. Nodes with
    /// no customers keep their values. Returns the number of nodes visited;
    /// 0 when resampling is disabled.
    pub fn resample_hyperparameters<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let Some(prior) = self.hyper_prior else {
            return 0;
        };
        let nodes = self.tree.nodes_mut();
        let seeds: Vec<u64> = (0..nodes.len()).map(|_| rng.random::<u64>()).collect();
        nodes.par_iter_mut().zip(seeds).for_each(|(node, seed)| {
            if node.restaurant.customers() == 0 {
                return;
            }
            let mut stream = Xoshiro256PlusPlus::seed_from_u64(seed);
            node.hyper = resample_node(&node.restaurant, node.hyper, &prior, &mut stream);
        });

        let updated = nodes.len();
        let root = self.tree.node(self.tree.root()).hyper;
        debug!(
            event = event_names::HPYP_HYPER_RESAMPLED,
            nodes = updated,
            root_discount = root.discount,
            root_concentration = root.concentration,
            "resampled hyperparameters"
        );
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_measure::Uniform;
    use crate::seating::{Restaurant, SeatingArrangement};
    use pyp_config::{HpypConfig, RestaurantKind};

    fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    #[test]
    fn test_single_table_likelihood_matches_sequential_product() {
        let (d, a) = (0.4, 2.5);
        let mut r: Restaurant<u32> = Restaurant::new(RestaurantKind::TableList);
        let mut g = rng(1);
        // A zero parent probability forces every later customer to join.
        r.add(&7, 0.0, d, a, &mut g).unwrap();
        for _ in 0..4 {
            r.add(&7, 0.0, d, a, &mut g).unwrap();
        }
        assert_eq!(r.tables(), 1);
        let mut direct = 0.0;
        for k in 1..5 {
            direct += ((k as f64 - d) / (a + k as f64)).ln();
        }
        assert!((seating_log_likelihood(&r, d, a) - direct).abs() < 1e-10);
    }

    #[test]
    fn test_two_singleton_tables() {
        let (d, a) = (0.3, 1.5);
        let mut r: Restaurant<u32> = Restaurant::default();
        let mut g = rng(2);
        r.add(&1, 0.5, d, a, &mut g).unwrap();
        r.add(&2, 0.5, d, a, &mut g).unwrap();
        let expected = (a + d).ln() - (a + 1.0).ln();
        assert!((seating_log_likelihood(&r, d, a) - expected).abs() < 1e-10);
        let empty: Restaurant<u32> = Restaurant::default();
        assert_eq!(seating_log_likelihood(&empty, d, a), 0.0);
    }

    fn trained(config: &HpypConfig) -> Hpyp<u32, u32, Uniform> {
        let mut lm = Hpyp::new(Uniform::new(4), config).unwrap();
        let mut g = rng(3);
        for i in 0..60u32 {
            let ctx = [i % 3, (i * 7) % 4];
            lm.observe(&ctx, &((i * i) % 4), &mut g).unwrap();
        }
        lm
    }

    #[test]
    fn test_disabled_resampling_is_a_no_op() {
        let mut lm = trained(&HpypConfig::default());
        let before = lm.clone();
        assert!(!lm.resamples_hyperparameters());
        assert_eq!(lm.resample_hyperparameters(&mut rng(4)), 0);
        assert_eq!(lm, before);
    }

    #[test]
    fn test_resampling_moves_parameters_within_bounds() {
        let config = HpypConfig::default().with_hyper_resampling(HyperPrior::default());
        let mut lm = trained(&config);
        let before = lm.clone();
        assert_eq!(lm.resample_hyperparameters(&mut rng(5)), lm.num_nodes());
        let mut moved = 0;
        for ((_, new), (_, old)) in lm.tree().iter().zip(before.tree().iter()) {
            assert!(new.hyper.is_valid());
            assert!(new.hyper.discount > 0.0 && new.hyper.concentration > 0.0);
            if new.hyper != old.hyper {
                moved += 1;
            }
        }
        assert!(moved > 0);
        // Seating is untouched.
        assert_eq!(lm.total_tables(), before.total_tables());
        assert!(lm.check_consistency());
    }

    #[test]
    fn test_resampling_is_reproducible() {
        let config = HpypConfig::default().with_hyper_resampling(HyperPrior::default());
        let mut a = trained(&config);
        let mut b = trained(&config);
        a.resample_hyperparameters(&mut rng(9));
        b.resample_hyperparameters(&mut rng(9));
        assert_eq!(a, b);
    }
}
