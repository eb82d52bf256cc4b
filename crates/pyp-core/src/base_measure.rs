//! Base measures at the top of the hierarchy (level 0).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::seating::{pairs, Dish};

/// The context-free distribution every restaurant backs off to.
pub trait BaseMeasure<D>: Send + Sync {
    fn probability(&self, dish: &D) -> f64;

    fn log_probability(&self, dish: &D) -> f64 {
        self.probability(dish).ln()
    }

    /// Number of outcomes with nonzero mass.
    fn cardinality(&self) -> usize;
}

/// Uniform distribution over `size` outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uniform {
    pub size: usize,
}

impl Uniform {
    pub fn new(size: usize) -> Self {
        Uniform { size }
    }
}

impl<D> BaseMeasure<D> for Uniform {
    fn probability(&self, _dish: &D) -> f64 {
        1.0 / self.size as f64
    }

    fn log_probability(&self, _dish: &D) -> f64 {
        -(self.size as f64).ln()
    }

    fn cardinality(&self) -> usize {
        self.size
    }
}

/// Finite measure proportional to per-symbol weights.
///
/// Symbols never registered get probability zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct WeightedMeasure<D: Dish> {
    #[serde(with = "pairs")]
    weights: BTreeMap<D, f64>,
    normalizer: f64,
}

impl<D: Dish> Default for WeightedMeasure<D> {
    fn default() -> Self {
        WeightedMeasure {
            weights: BTreeMap::new(),
            normalizer: 0.0,
        }
    }
}

impl<D: Dish> WeightedMeasure<D> {
    /// Every symbol with weight 1.
    pub fn uniform_over(symbols: impl IntoIterator<Item = D>) -> Self {
        let mut m = WeightedMeasure::default();
        for s in symbols {
            m.set_weight(s, 1.0);
        }
        m
    }

    /// Set (or replace) one symbol's weight. Negative weights are clamped to 0.
    pub fn set_weight(&mut self, symbol: D, weight: f64) {
        let weight = weight.max(0.0);
        let old = self.weights.insert(symbol, weight).unwrap_or(0.0);
        self.normalizer += weight - old;
    }

    pub fn weight(&self, symbol: &D) -> f64 {
        self.weights.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn normalizer(&self) -> f64 {
        self.normalizer
    }

    pub fn symbols(&self) -> impl Iterator<Item = &D> {
        self.weights.keys()
    }
}

impl<D: Dish> BaseMeasure<D> for WeightedMeasure<D> {
    fn probability(&self, dish: &D) -> f64 {
        if self.normalizer <= 0.0 {
            return 0.0;
        }
        self.weight(dish) / self.normalizer
    }

    fn cardinality(&self) -> usize {
        self.weights.values().filter(|&&w| w > 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_mass() {
        let u = Uniform::new(4);
        assert_eq!(BaseMeasure::<u32>::probability(&u, &9), 0.25);
        assert!((BaseMeasure::<u32>::log_probability(&u, &9) - 0.25f64.ln()).abs() < 1e-15);
        assert_eq!(BaseMeasure::<u32>::cardinality(&u), 4);
    }

    #[test]
    fn weighted_normalizes_and_updates() {
        let mut m = WeightedMeasure::uniform_over(0u32..3);
        m.set_weight(3, 1.0);
        assert_eq!(m.probability(&0), 0.25);
        m.set_weight(3, 5.0);
        assert_eq!(m.normalizer(), 8.0);
        assert_eq!(m.probability(&3), 5.0 / 8.0);
        assert_eq!(m.probability(&42), 0.0);
        assert_eq!(m.log_probability(&42), f64::NEG_INFINITY);
        assert_eq!(m.cardinality(), 4);
        let total: f64 = m.symbols().map(|s| m.probability(s)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
