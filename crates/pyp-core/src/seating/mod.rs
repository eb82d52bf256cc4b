//! Chinese-restaurant seating arrangements.
//!
//! A restaurant holds, for every dish served at one context node, the number
//! of customers `cw`, the number of occupied tables `tw`, and the occupancy
//! of each table. Node aggregates `c` and `t` are cached and must always
//! equal the per-dish sums.
//!
//! Three backings implement [`SeatingArrangement`] with identical behavior:
//!
//! - [`TableListRestaurant`]: explicit list of table sizes per dish
//! - [`HistogramRestaurant`]: table size → number of tables per dish
//! - [`TrieRestaurant`]: histogram arrangements indexed by a symbol trie,
//!   for sequence dishes that need prefix queries
//!
//! [`Restaurant`] selects one of them at configuration time.
//!
//! # Example
//!
//! ```
//! use pyp_core::seating::{HistogramRestaurant, SeatingArrangement};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
//! let mut r = HistogramRestaurant::<u32>::default();
//! assert!(r.add(&7, 0.25, 0.5, 1.0, &mut rng).unwrap());
//! assert_eq!(r.customers_of(&7), 1);
//! let p = r.probability(&7, 0.25, 0.5, 1.0);
//! assert!((p - (1.0 - 0.5 + 1.5 * 0.25) / 2.0).abs() < 1e-12);
//! ```

pub mod histogram;
pub mod keyed;
pub mod pairs;
pub mod predictive;
pub mod restaurant;
pub mod table_list;
pub mod trie;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use thiserror::Error;

pub use histogram::Histogram;
pub use keyed::{HistogramRestaurant, KeyedRestaurant, TableListRestaurant};
pub use restaurant::Restaurant;
pub use table_list::TableList;
pub use trie::TrieRestaurant;

/// Errors from seating mutations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeatingError {
    #[error("no customer of dish {dish} is seated here")]
    EmptyDish { dish: String },

    #[error("seating weights are degenerate for dish {dish} (parent = {parent})")]
    DegenerateWeights { dish: String, parent: f64 },
}

impl SeatingError {
    pub fn code(&self) -> u32 {
        match self {
            SeatingError::EmptyDish { .. } => 10,
            SeatingError::DegenerateWeights { .. } => 11,
        }
    }

    pub(crate) fn empty<D: Debug>(dish: &D) -> Self {
        SeatingError::EmptyDish {
            dish: format!("{:?}", dish),
        }
    }
}

/// A discrete outcome served at a restaurant.
///
/// `symbols` decomposes the dish for trie indexing; single-symbol dishes
/// return themselves.
pub trait Dish: Clone + Ord + Debug + Send + Sync + Serialize + DeserializeOwned {
    type Symbol: Clone + Ord + Debug + Send + Sync + Serialize + DeserializeOwned;

    fn symbols(&self) -> Vec<Self::Symbol>;
}

macro_rules! atomic_dish {
    ($($t:ty),*) => {
        $(
            impl Dish for $t {
                type Symbol = $t;

                fn symbols(&self) -> Vec<$t> {
                    vec![*self]
                }
            }
        )*
    };
}

atomic_dish!(u8, u16, u32, u64, usize, char);

impl<T> Dish for Vec<T>
where
    T: Clone + Ord + Debug + Send + Sync + Serialize + DeserializeOwned,
{
    type Symbol = T;

    fn symbols(&self) -> Vec<T> {
        self.clone()
    }
}

/// Seating bookkeeping for one context node.
pub trait SeatingArrangement<D: Dish> {
    /// Total customers `c` over all dishes.
    fn customers(&self) -> usize;

    /// Customers `cw` eating `dish`.
    fn customers_of(&self, dish: &D) -> usize;

    /// Total occupied tables `t` over all dishes.
    fn tables(&self) -> usize;

    /// Tables `tw` serving `dish`.
    fn tables_of(&self, dish: &D) -> usize;

    /// Dishes with at least one customer, in order.
    fn dishes(&self) -> Vec<D>;

    /// Table size → number of tables, over all dishes.
    fn size_histogram(&self) -> BTreeMap<usize, usize>;

    fn probability(&self, dish: &D, parent: f64, discount: f64, concentration: f64) -> f64 {
        predictive::predictive(
            self.customers_of(dish),
            self.tables_of(dish),
            self.customers(),
            self.tables(),
            parent,
            discount,
            concentration,
        )
    }

    fn log_probability(
        &self,
        dish: &D,
        log_parent: f64,
        discount: f64,
        concentration: f64,
    ) -> f64 {
        predictive::log_predictive(
            self.customers_of(dish),
            self.tables_of(dish),
            self.customers(),
            self.tables(),
            log_parent,
            discount,
            concentration,
        )
    }

    /// Log probability of joining one of the existing tables of `dish`.
    fn log_cache_probability(&self, dish: &D, discount: f64, concentration: f64) -> f64 {
        predictive::log_cache_probability(
            self.customers_of(dish),
            self.tables_of(dish),
            self.customers(),
            discount,
            concentration,
        )
    }

    /// Log probability of opening a new table and deferring to the parent.
    fn log_new_table_probability(&self, log_parent: f64, discount: f64, concentration: f64) -> f64 {
        predictive::log_new_table_probability(
            self.customers(),
            self.tables(),
            log_parent,
            discount,
            concentration,
        )
    }

    /// Seat a customer of `dish`. Returns whether a new table was opened.
    fn add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError>;

    /// [`add`](Self::add) with the parent probability in log space.
    fn log_add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        log_parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError>;

    /// Unseat a customer of `dish`. Returns whether a table was closed.
    ///
    /// Fails without mutating anything if `dish` has no customers.
    fn remove<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        discount: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError>;

    /// Recompute aggregates from per-table data and compare with the cache.
    fn check_consistency(&self) -> bool;
}

/// Per-dish table storage shared by the keyed and trie restaurants.
pub trait DishTables: Clone + Default + PartialEq + Debug {
    fn customers(&self) -> usize;

    fn tables(&self) -> usize;

    /// One linear join weight per choice, excluding the new-table choice.
    fn join_weights(&self, discount: f64) -> Vec<f64>;

    fn open_table(&mut self);

    /// Join the table (or bucket) at `choice`.
    fn join(&mut self, choice: usize);

    /// One weight per choice, proportional to occupancy.
    fn vacate_weights(&self) -> Vec<f64>;

    /// Unseat from `choice`. Returns whether a table closed.
    fn vacate(&mut self, choice: usize) -> bool;

    /// Visit (table size, number of tables of that size).
    fn for_each_size(&self, f: &mut dyn FnMut(usize, usize));

    fn is_consistent(&self) -> bool;
}

/// Which domain a parent probability is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentDomain {
    Linear,
    Log,
}

/// Seat one customer in `tables`, given the node's current table count.
///
/// The caller updates node aggregates from the returned flag.
#[allow(clippy::too_many_arguments)]
pub(crate) fn seat<T, D, R>(
    tables: &mut T,
    dish: &D,
    node_tables: usize,
    parent: f64,
    discount: f64,
    concentration: f64,
    domain: ParentDomain,
    rng: &mut R,
) -> Result<bool, SeatingError>
where
    T: DishTables,
    D: Debug,
    R: Rng + ?Sized,
{
    if tables.customers() == 0 {
        tables.open_table();
        return Ok(true);
    }
    let new_weight = concentration + discount * node_tables as f64;
    let mut weights = tables.join_weights(discount);
    let choice = match domain {
        ParentDomain::Linear => {
            weights.push(new_weight * parent);
            pyp_math::sample_unnormalized(&weights, rng)
        }
        ParentDomain::Log => {
            for w in weights.iter_mut() {
                *w = w.ln();
            }
            weights.push(new_weight.ln() + parent);
            pyp_math::sample_unnormalized_log(&weights, rng)
        }
    };
    let choice = choice.ok_or_else(|| SeatingError::DegenerateWeights {
        dish: format!("{:?}", dish),
        parent,
    })?;
    if choice == weights.len() - 1 {
        tables.open_table();
        Ok(true)
    } else {
        tables.join(choice);
        Ok(false)
    }
}

/// Unseat one customer from `tables`, which must be non-empty.
pub(crate) fn unseat<T, D, R>(tables: &mut T, dish: &D, rng: &mut R) -> Result<bool, SeatingError>
where
    T: DishTables,
    D: Debug,
    R: Rng + ?Sized,
{
    let weights = tables.vacate_weights();
    let choice = pyp_math::sample_unnormalized(&weights, rng).ok_or_else(|| SeatingError::empty(dish))?;
    Ok(tables.vacate(choice))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    pub fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    /// Drive a restaurant through a fixed add/remove script and check the
    /// invariants after every step.
    pub fn exercise<D, S>(restaurant: &mut S, dishes: &[D])
    where
        D: Dish,
        S: SeatingArrangement<D> + Clone + PartialEq + Debug,
    {
        let mut rng = rng(99);
        let empty = restaurant.clone();
        for (i, dish) in dishes.iter().enumerate() {
            let before_tables = restaurant.tables();
            let opened = restaurant.add(dish, 0.1, 0.5, 1.0, &mut rng).unwrap();
            assert_eq!(restaurant.customers(), i + 1);
            assert_eq!(restaurant.tables(), before_tables + opened as usize);
            assert!(restaurant.check_consistency());
        }
        for dish in dishes.iter().rev() {
            let before_tables = restaurant.tables();
            let closed = restaurant.remove(dish, 0.5, &mut rng).unwrap();
            assert_eq!(restaurant.tables() + closed as usize, before_tables);
            assert!(restaurant.check_consistency());
        }
        assert_eq!(*restaurant, empty);
    }
}
