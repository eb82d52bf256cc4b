//! Hierarchical Pitman-Yor process over a context tree.
//!
//! A context is a slice of symbols, oldest first. It is consumed from the
//! most recent symbol backwards: the root (depth 1) ignores the context, its
//! child for `context[n-1]` sits at depth 2, and so on. At most
//! `max_depth - 2` symbols are used, since level 0 is the base measure and
//! tree nodes occupy levels `1..max_depth`.
//!
//! # Predictive probability
//!
//! ```text
//! p_0 = H(dish)
//! p_d = (cw_d - d_d·tw_d + (a_d + d_d·t_d)·p_{d-1}) / (c_d + a_d)
//! ```
//!
//! Levels whose node does not exist contribute nothing: with no customers
//! the rule returns its parent probability.
//!
//! # Observation
//!
//! `observe` seats the customer at the deepest node. A new table there sends
//! a customer to the parent, and so on while tables keep opening. `remove`
//! mirrors this while tables keep closing.
//!
//! # Usage
//!
//! ```
//! use pyp_config::HpypConfig;
//! use pyp_core::base_measure::Uniform;
//! use pyp_core::hpyp::Hpyp;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
//! let mut lm: Hpyp<u32, u32, Uniform> = Hpyp::new(Uniform::new(3), &HpypConfig::default()).unwrap();
//! lm.observe(&[0, 1], &2, &mut rng).unwrap();
//! assert_eq!(lm.total_customers(), 1);
//! assert!(lm.probability(&[0, 1], &2) > 1.0 / 3.0);
//! ```

pub mod domain;
pub mod hyper;
pub mod schedule;

use pyp_config::validate::{validate_cardinality, validate_hpyp};
use pyp_config::{ArithmeticDomain, HpypConfig, HyperPrior, RestaurantKind, ValidationError};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::trace;

use crate::base_measure::BaseMeasure;
use crate::context_tree::{ContextTree, Hyperparameters, NodeId};
use crate::logging::event_names;
use crate::seating::{Dish, Restaurant, SeatingArrangement, SeatingError};

pub use domain::{Domain, Linear, Log};
pub use schedule::DepthSchedule;

/// Errors from the hierarchical process.
#[derive(Debug, Error)]
pub enum HpypError {
    #[error("invalid hierarchy configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("configured domain {configured:?} does not match the {expected:?} process type")]
    DomainMismatch {
        configured: ArithmeticDomain,
        expected: ArithmeticDomain,
    },

    #[error("no customer of {dish} in context {context}")]
    NoSuchCustomer { context: String, dish: String },

    #[error(transparent)]
    Seating(#[from] SeatingError),
}

impl HpypError {
    pub fn code(&self) -> u32 {
        match self {
            HpypError::Config(e) => e.code(),
            HpypError::DomainMismatch { .. } => 20,
            HpypError::NoSuchCustomer { .. } => 21,
            HpypError::Seating(e) => e.code(),
        }
    }
}

/// Hierarchical Pitman-Yor process with context symbols `C` and dishes `D`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, B: Serialize",
    deserialize = "C: DeserializeOwned + Ord, B: DeserializeOwned"
))]
pub struct Hpyp<C, D: Dish, B, A: Domain = Linear> {
    tree: ContextTree<C, Restaurant<D>>,
    schedule: DepthSchedule,
    base: B,
    restaurant: RestaurantKind,
    total_customers: usize,
    total_tables: usize,
    /// Present when per-node hyperparameters are resampled.
    hyper_prior: Option<HyperPrior>,
    #[serde(skip)]
    domain: PhantomData<A>,
}

impl<C, D, B, A> Hpyp<C, D, B, A>
where
    C: Ord + Clone + Debug,
    D: Dish,
    B: BaseMeasure<D>,
    A: Domain,
{
    /// Build an empty process.
    ///
    /// Fails when the configuration is out of bounds, the base measure is
    /// empty or implausibly large, or the configured domain is not `A`.
    pub fn new(base: B, config: &HpypConfig) -> Result<Self, HpypError> {
        validate_hpyp(config)?;
        validate_cardinality(base.cardinality())?;
        if config.domain != A::KIND {
            return Err(HpypError::DomainMismatch {
                configured: config.domain,
                expected: A::KIND,
            });
        }
        let schedule = DepthSchedule::new(config);
        let tree = ContextTree::new(Restaurant::new(config.restaurant), schedule.hyper(1));
        Ok(Hpyp {
            tree,
            schedule,
            base,
            restaurant: config.restaurant,
            total_customers: 0,
            total_tables: 0,
            hyper_prior: config
                .resample_hyperparameters
                .then_some(config.hyper_prior),
            domain: PhantomData,
        })
    }

    pub fn max_depth(&self) -> usize {
        self.schedule.max_depth()
    }

    /// Most context symbols any lookup consumes.
    pub fn context_limit(&self) -> usize {
        self.max_depth().saturating_sub(2)
    }

    pub fn schedule(&self) -> &DepthSchedule {
        &self.schedule
    }

    pub fn tree(&self) -> &ContextTree<C, Restaurant<D>> {
        &self.tree
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn cardinality(&self) -> usize {
        self.base.cardinality()
    }

    /// Observations currently seated.
    pub fn total_customers(&self) -> usize {
        self.total_customers
    }

    /// Occupied tables across every level.
    pub fn total_tables(&self) -> usize {
        self.total_tables
    }

    pub fn root_customers(&self) -> usize {
        self.tree.node(self.tree.root()).restaurant.customers()
    }

    pub fn root_tables(&self) -> usize {
        self.tree.node(self.tree.root()).restaurant.tables()
    }

    pub fn num_nodes(&self) -> usize {
        self.tree.len()
    }

    /// Parameters of the node for `context`, or the schedule's value for
    /// its depth when the node does not exist.
    pub fn hyperparameters(&self, context: &[C]) -> Hyperparameters {
        let path = self.existing_path(context);
        match path.last() {
            Some(&id) if path.len() == self.used(context) + 1 => self.tree.node(id).hyper,
            _ => self.schedule.hyper(self.used(context) + 1),
        }
    }

    fn used(&self, context: &[C]) -> usize {
        context.len().min(self.context_limit())
    }

    /// Node ids from the root down along `context`, stopping at the first
    /// missing node.
    fn existing_path(&self, context: &[C]) -> Vec<NodeId> {
        let mut path = vec![self.tree.root()];
        let mut node = self.tree.root();
        for sym in context.iter().rev().take(self.context_limit()) {
            match self.tree.child(node, sym) {
                Some(child) => {
                    node = child;
                    path.push(child);
                }
                None => break,
            }
        }
        path
    }

    fn path_or_insert(&mut self, context: &[C]) -> Vec<NodeId> {
        let limit = self.context_limit();
        let kind = self.restaurant;
        let schedule = &self.schedule;
        let mut path = vec![self.tree.root()];
        let mut node = self.tree.root();
        for sym in context.iter().rev().take(limit) {
            node = self.tree.child_or_insert(node, sym, |depth| {
                (Restaurant::new(kind), schedule.hyper(depth))
            });
            path.push(node);
        }
        path
    }

    /// Predictive value in the domain of `A`.
    fn predictive(&self, context: &[C], dish: &D) -> f64 {
        let mut p = A::base(&self.base, dish);
        for id in self.existing_path(context) {
            let node = self.tree.node(id);
            p = A::predictive(&node.restaurant, dish, p, node.hyper);
        }
        p
    }

    /// `p(dish | context)`; never creates nodes.
    pub fn probability(&self, context: &[C], dish: &D) -> f64 {
        A::to_linear(self.predictive(context, dish))
    }

    pub fn log_probability(&self, context: &[C], dish: &D) -> f64 {
        A::to_log(self.predictive(context, dish))
    }

    /// Probabilities of each of `dishes` after `context`.
    pub fn distribution<I>(&self, context: &[C], dishes: I) -> Vec<(D, f64)>
    where
        I: IntoIterator<Item = D>,
    {
        dishes
            .into_iter()
            .map(|d| {
                let p = self.probability(context, &d);
                (d, p)
            })
            .collect()
    }

    /// Seat one `dish` customer in `context`, growing the tree as needed.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        context: &[C],
        dish: &D,
        rng: &mut R,
    ) -> Result<(), HpypError> {
        let path = self.path_or_insert(context);

        // parents[i] is the predictive of the level above path[i].
        let mut parents = Vec::with_capacity(path.len());
        let mut p = A::base(&self.base, dish);
        for &id in &path {
            parents.push(p);
            let node = self.tree.node(id);
            p = A::predictive(&node.restaurant, dish, p, node.hyper);
        }

        let mut opened_at = Vec::new();
        for (i, &id) in path.iter().enumerate().rev() {
            let node = self.tree.node_mut(id);
            let opened = A::seat(&mut node.restaurant, dish, parents[i], node.hyper, rng)?;
            if !opened {
                break;
            }
            self.total_tables += 1;
            opened_at.push(i + 1);
        }
        self.total_customers += 1;
        trace!(
            event = event_names::HPYP_OBSERVE,
            dish = ?dish,
            depth = path.len(),
            tables_opened = ?opened_at,
            "seated customer"
        );
        Ok(())
    }

    /// Unseat one `dish` customer from `context`.
    ///
    /// Fails before mutating if the deepest node for `context` does not
    /// exist or has no such customer.
    pub fn remove<R: Rng + ?Sized>(
        &mut self,
        context: &[C],
        dish: &D,
        rng: &mut R,
    ) -> Result<(), HpypError> {
        let path = self.existing_path(context);
        let complete = path.len() == self.used(context) + 1;
        let seated = path
            .last()
            .is_some_and(|&id| self.tree.node(id).restaurant.customers_of(dish) > 0);
        if !(complete && seated) {
            return Err(HpypError::NoSuchCustomer {
                context: format!("{:?}", context),
                dish: format!("{:?}", dish),
            });
        }

        for &id in path.iter().rev() {
            let node = self.tree.node_mut(id);
            let closed = node.restaurant.remove(dish, node.hyper.discount, rng)?;
            if !closed {
                break;
            }
            self.total_tables -= 1;
        }
        self.total_customers -= 1;
        trace!(
            event = event_names::HPYP_REMOVE,
            dish = ?dish,
            depth = path.len(),
            "unseated customer"
        );
        Ok(())
    }

    /// Verify every cached count against the seating data.
    ///
    /// Besides per-restaurant consistency this checks that each parent
    /// seats at least one customer per table its children hold for a dish,
    /// and that customers across the tree equal observations plus
    /// non-root tables.
    pub fn check_consistency(&self) -> bool {
        if !self.tree.is_tree() {
            return false;
        }
        let mut customers = 0;
        let mut tables = 0;
        for (_, node) in self.tree.iter() {
            if !node.restaurant.check_consistency() || !node.hyper.is_valid() {
                return false;
            }
            customers += node.restaurant.customers();
            tables += node.restaurant.tables();
        }
        if tables != self.total_tables
            || customers + self.root_tables() != self.total_customers + self.total_tables
        {
            return false;
        }
        self.children_fed_by_parents()
    }

    fn children_fed_by_parents(&self) -> bool {
        self.tree.iter().all(|(id, node)| {
            let mut owed: BTreeMap<D, usize> = BTreeMap::new();
            for child in self.tree.children(id) {
                let r = &self.tree.node(child).restaurant;
                for dish in r.dishes() {
                    let tw = r.tables_of(&dish);
                    *owed.entry(dish).or_insert(0) += tw;
                }
            }
            owed.iter()
                .all(|(dish, need)| node.restaurant.customers_of(dish) >= *need)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_measure::Uniform;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    type Lm = Hpyp<u32, u32, Uniform>;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(2024)
    }

    fn lm(max_depth: usize) -> Lm {
        Hpyp::new(Uniform::new(3), &HpypConfig::default().with_max_depth(max_depth)).unwrap()
    }

    #[test]
    fn test_empty_process_is_base_measure() {
        let lm = lm(7);
        assert_eq!(lm.probability(&[1, 2, 0], &2), 1.0 / 3.0);
        assert_eq!(lm.num_nodes(), 1);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let err = Lm::new(Uniform::new(3), &HpypConfig::default().with_alpha(0.0)).unwrap_err();
        assert_eq!(err.code(), 65);
        let err = Lm::new(Uniform::new(0), &HpypConfig::default()).unwrap_err();
        assert_eq!(err.code(), 65);
        let log_cfg = HpypConfig::default().with_domain(ArithmeticDomain::Log);
        let err = Lm::new(Uniform::new(3), &log_cfg).unwrap_err();
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_context_is_truncated_to_depth() {
        let mut lm = lm(4);
        let mut rng = rng();
        lm.observe(&[9, 8, 7, 6, 5], &1, &mut rng).unwrap();
        // Root plus the two most recent symbols.
        assert_eq!(lm.num_nodes(), 3);
        assert_eq!(lm.context_limit(), 2);
        assert!(lm.tree().child(lm.tree().root(), &5).is_some());
        // Symbols beyond the limit are ignored for lookup too.
        assert_eq!(lm.probability(&[0, 0, 0, 6, 5], &1), lm.probability(&[6, 5], &1));
    }

    #[test]
    fn test_round_trip_restores_counts() {
        let mut lm = lm(5);
        let mut rng = rng();
        let empty = lm.clone();
        let events: Vec<(Vec<u32>, u32)> = vec![
            (vec![0], 1),
            (vec![0, 1], 1),
            (vec![0, 1, 1], 2),
            (vec![2, 1], 1),
            (vec![0, 1], 1),
            (vec![], 0),
        ];
        for (ctx, dish) in &events {
            lm.observe(ctx, dish, &mut rng).unwrap();
            assert!(lm.check_consistency());
        }
        assert_eq!(lm.total_customers(), events.len());
        for (ctx, dish) in events.iter().rev() {
            lm.remove(ctx, dish, &mut rng).unwrap();
            assert!(lm.check_consistency());
        }
        assert_eq!(lm.total_customers(), 0);
        assert_eq!(lm.total_tables(), 0);
        for (id, node) in lm.tree().iter() {
            assert_eq!(node.restaurant.customers(), 0, "node {}", id.index());
        }
        // Nodes persist; only the seating is undone.
        assert!(lm.num_nodes() > empty.num_nodes());
    }

    #[test]
    fn test_remove_missing_customer_fails_cleanly() {
        let mut lm = lm(5);
        let mut rng = rng();
        lm.observe(&[0, 1], &2, &mut rng).unwrap();
        let before = lm.clone();
        let err = lm.remove(&[0, 1], &1, &mut rng).unwrap_err();
        assert_eq!(err.code(), 21);
        assert!(lm.remove(&[2, 2], &2, &mut rng).is_err());
        assert_eq!(lm, before);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let mut lm = lm(5);
        let mut rng = rng();
        for (ctx, dish) in [(vec![0, 1], 2), (vec![1, 1], 2), (vec![0, 1], 0), (vec![2], 1)] {
            lm.observe(&ctx, &dish, &mut rng).unwrap();
        }
        for ctx in [vec![0, 1], vec![1], vec![], vec![2, 2, 2]] {
            let total: f64 = lm.distribution(&ctx, 0..3).iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-12, "ctx={ctx:?} total={total}");
        }
    }

    #[test]
    fn test_log_domain_matches_linear() {
        let log_cfg = HpypConfig::default().with_domain(ArithmeticDomain::Log);
        let mut log_lm: Hpyp<u32, u32, Uniform, Log> = Hpyp::new(Uniform::new(3), &log_cfg).unwrap();
        let mut lin_lm = lm(7);
        let mut rng = rng();
        // Every customer is the first of its dish at each node, so seating
        // is deterministic and both processes end in the same state.
        for (ctx, dish) in [(vec![0u32], 1u32), (vec![1], 2), (vec![2], 0)] {
            log_lm.observe(&ctx, &dish, &mut rng).unwrap();
            lin_lm.observe(&ctx, &dish, &mut rng).unwrap();
        }
        for ctx in [vec![0u32], vec![1], vec![9]] {
            for dish in 0..3u32 {
                let a = log_lm.log_probability(&ctx, &dish);
                let b = lin_lm.log_probability(&ctx, &dish);
                assert!((a - b).abs() < 1e-12);
            }
        }
        assert_eq!(log_lm.total_tables(), lin_lm.total_tables());
    }

    #[test]
    fn test_hyperparameters_follow_schedule() {
        let mut lm = lm(7);
        let mut rng = rng();
        lm.observe(&[4, 5], &0, &mut rng).unwrap();
        assert_eq!(lm.hyperparameters(&[]).discount, 0.62);
        assert_eq!(lm.hyperparameters(&[5]).discount, 0.69);
        assert_eq!(lm.hyperparameters(&[4, 5]).discount, 0.74);
        assert_eq!(lm.hyperparameters(&[3, 4, 5]).discount, 0.80);
    }
}
