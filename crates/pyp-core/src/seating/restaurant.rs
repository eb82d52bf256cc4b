//! Restaurant backing chosen at configuration time.

use pyp_config::RestaurantKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    Dish, HistogramRestaurant, SeatingArrangement, SeatingError, TableListRestaurant,
    TrieRestaurant,
};

/// One of the three seating backings, dispatched by variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", tag = "kind", content = "state", rename_all = "snake_case")]
pub enum Restaurant<D: Dish> {
    TableList(TableListRestaurant<D>),
    Histogram(HistogramRestaurant<D>),
    Trie(TrieRestaurant<D>),
}

impl<D: Dish> Restaurant<D> {
    pub fn new(kind: RestaurantKind) -> Self {
        match kind {
            RestaurantKind::TableList => Restaurant::TableList(Default::default()),
            RestaurantKind::Histogram => Restaurant::Histogram(Default::default()),
            RestaurantKind::Trie => Restaurant::Trie(Default::default()),
        }
    }

    pub fn kind(&self) -> RestaurantKind {
        match self {
            Restaurant::TableList(_) => RestaurantKind::TableList,
            Restaurant::Histogram(_) => RestaurantKind::Histogram,
            Restaurant::Trie(_) => RestaurantKind::Trie,
        }
    }

    pub fn as_trie(&self) -> Option<&TrieRestaurant<D>> {
        match self {
            Restaurant::Trie(t) => Some(t),
            _ => None,
        }
    }
}

impl<D: Dish> Default for Restaurant<D> {
    fn default() -> Self {
        Restaurant::new(RestaurantKind::default())
    }
}

macro_rules! dispatch {
    ($self:ident, $r:ident => $body:expr) => {
        match $self {
            Restaurant::TableList($r) => $body,
            Restaurant::Histogram($r) => $body,
            Restaurant::Trie($r) => $body,
        }
    };
}

impl<D: Dish> SeatingArrangement<D> for Restaurant<D> {
    fn customers(&self) -> usize {
        dispatch!(self, r => r.customers())
    }

    fn customers_of(&self, dish: &D) -> usize {
        dispatch!(self, r => r.customers_of(dish))
    }

    fn tables(&self) -> usize {
        dispatch!(self, r => r.tables())
    }

    fn tables_of(&self, dish: &D) -> usize {
        dispatch!(self, r => r.tables_of(dish))
    }

    fn dishes(&self) -> Vec<D> {
        dispatch!(self, r => r.dishes())
    }

    fn size_histogram(&self) -> BTreeMap<usize, usize> {
        dispatch!(self, r => r.size_histogram())
    }

    fn add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        dispatch!(self, r => r.add(dish, parent, discount, concentration, rng))
    }

    fn log_add<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        log_parent: f64,
        discount: f64,
        concentration: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        dispatch!(self, r => r.log_add(dish, log_parent, discount, concentration, rng))
    }

    fn remove<R: Rng + ?Sized>(
        &mut self,
        dish: &D,
        discount: f64,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        dispatch!(self, r => r.remove(dish, discount, rng))
    }

    fn check_consistency(&self) -> bool {
        dispatch!(self, r => r.check_consistency())
    }
}
