//! Restaurants keyed by dish in an ordered map.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    pairs, seat, unseat, Dish, DishTables, Histogram, ParentDomain, SeatingArrangement,
    SeatingError, TableList,
};

/// A restaurant with one [`DishTables`] entry per dish being served.
///
/// A dish entry exists exactly while it has customers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + serde::de::DeserializeOwned")]
pub struct KeyedRestaurant<D: Dish, T: DishTables> {
    customers: usize,
    tables: usize,
    #[serde(with = "pairs")]
    dishes: BTreeMap<D, T>,
}

/// Explicit table lists per dish.
pub type TableListRestaurant<D> = KeyedRestaurant<D, TableList>;

/// Table-size histograms per dish.
pub type HistogramRestaurant<D> = KeyedRestaurant<D, Histogram>;

impl<D: Dish, T: DishTables> Default for KeyedRestaurant<D, T> {
    fn default() -> Self {
        KeyedRestaurant {
            customers: 0,
            tables: 0,
            dishes: BTreeMap::new(),
        }
    }
}

impl<D: Dish, T: DishTables> KeyedRestaurant<D, T> {
    pub fn arrangement(&self, dish: &D) -> Option<&T> {
        self.dishes.get(dish)
    }

    fn add_in<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        parent: f64,
        discount: f64,
        concentration: f64,
        domain: ParentDomain,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        let node_tables = self.tables;
        let entry = self.dishes.entry(dish.clone()).or_default();
        let opened = seat(entry, dish, node_tables, parent, discount, concentration, domain, rng);
        match opened {
            Ok(opened) => {
                self.customers += 1;
                self.tables += opened as usize;
                Ok(opened)
            }
            Err(e) => {
                if entry.customers() == 0 {
                    self.dishes.remove(dish);
                }
                Err(e)
            }
        }
    }
}

impl<D: Dish, T: DishTables> SeatingArrangement<D> for KeyedRestaurant<D, T> {
    fn customers(&self) -> usize {
        self.customers
    }

    fn customers_of(&self, dish: &D) -> usize {
        self.dishes.get(dish).map_or(0, |t| t.customers())
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn tables_of(&self, dish: &D) -> usize {
        self.dishes.get(dish).map_or(0, |t| t.tables())
    }

    fn dishes(&self) -> Vec<D> {
        self.dishes.keys().cloned().collect()
    }

    fn size_histogram(&self) -> BTreeMap<usize, usize> {
        let mut hist = BTreeMap::new();
        for tables in self.dishes.values() {
            tables.for_each_size(&mut |size, count| *hist.entry(size).or_insert(0) += count);
        }
        hist
    }

    fn add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        self.add_in(dish, parent, discount, concentration, ParentDomain::Linear, rng)
    }

    fn log_add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        log_parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        self.add_in(dish, log_parent, discount, concentration, ParentDomain::Log, rng)
    }

    fn remove<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        _discount: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        let entry = match self.dishes.get_mut(dish) {
            Some(entry) if entry.customers() > 0 => entry,
            _ => return Err(SeatingError::empty(dish)),
        };
        let closed = unseat(entry, dish, rng)?;
        if entry.customers() == 0 {
            self.dishes.remove(dish);
        }
        self.customers -= 1;
        self.tables -= closed as usize;
        Ok(closed)
    }

    fn check_consistency(&self) -> bool {
        let customers: usize = self.dishes.values().map(|t| t.customers()).sum();
        let tables: usize = self.dishes.values().map(|t| t.tables()).sum();
        customers == self.customers
            && tables == self.tables
            && self
                .dishes
                .values()
                .all(|t| t.customers() > 0 && t.is_consistent())
    }
}
