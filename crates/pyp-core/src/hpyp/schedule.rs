//! Fixed per-depth hyperparameter schedule.

use pyp_config::HpypConfig;
use serde::{Deserialize, Serialize};

use crate::context_tree::Hyperparameters;

/// Discount and concentration for every level `0..=max_depth`.
///
/// Level 0 is the base measure and carries `-1` sentinels. Level `d >= 1`
/// takes `discounts[d-1]` from the configuration (or the default discount
/// past its end); `concentration[1] = alpha` and
/// `concentration[d] = concentration[d-1] * discount[d-1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSchedule {
    discounts: Vec<f64>,
    concentrations: Vec<f64>,
}

impl DepthSchedule {
    pub fn new(config: &HpypConfig) -> Self {
        let levels = config.max_depth + 1;
        let mut discounts = Vec::with_capacity(levels);
        discounts.push(-1.0);
        for d in 1..levels {
            let discount = config
                .discounts
                .get(d - 1)
                .copied()
                .unwrap_or(config.default_discount);
            discounts.push(discount);
        }

        let mut concentrations = Vec::with_capacity(levels);
        concentrations.push(-1.0);
        if levels > 1 {
            concentrations.push(config.alpha);
        }
        for d in 2..levels {
            concentrations.push(concentrations[d - 1] * discounts[d - 1]);
        }

        DepthSchedule {
            discounts,
            concentrations,
        }
    }

    /// Deepest level covered, including the base measure level.
    pub fn max_depth(&self) -> usize {
        self.discounts.len() - 1
    }

    pub fn discount(&self, depth: usize) -> f64 {
        self.discounts[depth.min(self.max_depth())]
    }

    pub fn concentration(&self, depth: usize) -> f64 {
        self.concentrations[depth.min(self.max_depth())]
    }

    pub fn hyper(&self, depth: usize) -> Hyperparameters {
        Hyperparameters {
            discount: self.discount(depth),
            concentration: self.concentration(depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_values() {
        let s = DepthSchedule::new(&HpypConfig::default());
        assert_eq!(s.max_depth(), 7);
        assert_eq!(s.discount(0), -1.0);
        assert_eq!(s.concentration(0), -1.0);
        assert_eq!(
            (1..=7).map(|d| s.discount(d)).collect::<Vec<_>>(),
            vec![0.62, 0.69, 0.74, 0.80, 0.75, 0.75, 0.75]
        );
        assert_eq!(s.concentration(1), 1.0);
        assert!((s.concentration(2) - 0.62).abs() < 1e-15);
        assert!((s.concentration(3) - 0.62 * 0.69).abs() < 1e-15);
        assert!((s.concentration(6) - 0.62 * 0.69 * 0.74 * 0.80 * 0.75).abs() < 1e-15);
    }

    #[test]
    fn every_level_satisfies_parameter_constraints() {
        let s = DepthSchedule::new(&HpypConfig::default().with_alpha(3.0).with_max_depth(12));
        for d in 1..=12 {
            assert!(s.hyper(d).is_valid(), "depth {d}");
        }
    }

    #[test]
    fn short_hierarchy() {
        let s = DepthSchedule::new(&HpypConfig::default().with_max_depth(2));
        assert_eq!(s.max_depth(), 2);
        assert_eq!(s.hyper(1).concentration, 1.0);
        assert_eq!(s.hyper(9), s.hyper(2));
    }
}
