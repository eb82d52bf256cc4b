//! Arithmetic domain used while propagating predictive probabilities.
//!
//! [`Linear`] multiplies plain probabilities and is the fast path for short
//! contexts. [`Log`] keeps every intermediate in log space, which avoids
//! underflow when base probabilities are tiny (large vocabularies, long
//! sequence dishes).

use pyp_config::ArithmeticDomain;
use rand::Rng;
use std::fmt::Debug;

use crate::base_measure::BaseMeasure;
use crate::context_tree::Hyperparameters;
use crate::seating::{Dish, SeatingArrangement, SeatingError};

pub trait Domain: Clone + Copy + Debug + Default + PartialEq + Send + Sync + 'static {
    const KIND: ArithmeticDomain;

    fn base<D, B: BaseMeasure<D>>(base: &B, dish: &D) -> f64;

    fn predictive<D: Dish, S: SeatingArrangement<D>>(
        restaurant: &S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
    ) -> f64;

    fn seat<D: Dish, S: SeatingArrangement<D>, R: Rng + ?Sized>(
        restaurant: &mut S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
        rng: &mut R,
    ) -> Result<bool, SeatingError>;

    fn to_linear(value: f64) -> f64;

    fn to_log(value: f64) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Linear;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Log;

impl Domain for Linear {
    const KIND: ArithmeticDomain = ArithmeticDomain::Linear;

    fn base<D, B: BaseMeasure<D>>(base: &B, dish: &D) -> f64 {
        base.probability(dish)
    }

    fn predictive<D: Dish, S: SeatingArrangement<D>>(
        restaurant: &S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
    ) -> f64 {
        restaurant.probability(dish, parent, hyper.discount, hyper.concentration)
    }

    fn seat<D: Dish, S: SeatingArrangement<D>, R: Rng + ?Sized>(
        restaurant: &mut S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        restaurant.add(dish, parent, hyper.discount, hyper.concentration, rng)
    }

    fn to_linear(value: f64) -> f64 {
        value
    }

    fn to_log(value: f64) -> f64 {
        value.ln()
    }
}

impl Domain for Log {
    const KIND: ArithmeticDomain = ArithmeticDomain::Log;

    fn base<D, B: BaseMeasure<D>>(base: &B, dish: &D) -> f64 {
        base.log_probability(dish)
    }

    fn predictive<D: Dish, S: SeatingArrangement<D>>(
        restaurant: &S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
    ) -> f64 {
        restaurant.log_probability(dish, parent, hyper.discount, hyper.concentration)
    }

    fn seat<D: Dish, S: SeatingArrangement<D>, R: Rng + ?Sized>(
        restaurant: &mut S,
        dish: &D,
        parent: f64,
        hyper: Hyperparameters,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        restaurant.log_add(dish, parent, hyper.discount, hyper.concentration, rng)
    }

    fn to_linear(value: f64) -> f64 {
        value.exp()
    }

    fn to_log(value: f64) -> f64 {
        value
    }
}
