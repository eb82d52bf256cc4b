//! Compressed table-size histogram.
//!
//! Tables of equal size are interchangeable for every seating decision, so
//! only the number of tables of each size is stored. A bucket whose count
//! drops to zero is removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{pairs, DishTables};

/// Tables serving one dish, stored as size → number of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    customers: usize,
    tables: usize,
    #[serde(with = "pairs")]
    buckets: BTreeMap<usize, usize>,
}

impl Histogram {
    pub fn buckets(&self) -> &BTreeMap<usize, usize> {
        &self.buckets
    }

    fn bucket_size(&self, choice: usize) -> usize {
        self.buckets.keys().nth(choice).copied().unwrap_or(1)
    }

    fn move_table(&mut self, from: usize, to: Option<usize>) {
        if let Some(count) = self.buckets.get_mut(&from) {
            *count -= 1;
            if *count == 0 {
                self.buckets.remove(&from);
            }
        }
        if let Some(to) = to {
            *self.buckets.entry(to).or_insert(0) += 1;
        }
    }
}

impl DishTables for Histogram {
    fn customers(&self) -> usize {
        self.customers
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn join_weights(&self, discount: f64) -> Vec<f64> {
        self.buckets
            .iter()
            .map(|(&size, &count)| (size as f64 - discount) * count as f64)
            .collect()
    }

    fn open_table(&mut self) {
        self.customers += 1;
        self.tables += 1;
        *self.buckets.entry(1).or_insert(0) += 1;
    }

    fn join(&mut self, choice: usize) {
        let size = self.bucket_size(choice);
        self.customers += 1;
        self.move_table(size, Some(size + 1));
    }

    fn vacate_weights(&self) -> Vec<f64> {
        self.buckets
            .iter()
            .map(|(&size, &count)| (size * count) as f64)
            .collect()
    }

    fn vacate(&mut self, choice: usize) -> bool {
        let size = self.bucket_size(choice);
        self.customers -= 1;
        if size == 1 {
            self.move_table(1, None);
            self.tables -= 1;
            true
        } else {
            self.move_table(size, Some(size - 1));
            false
        }
    }

    fn for_each_size(&self, f: &mut dyn FnMut(usize, usize)) {
        for (&size, &count) in &self.buckets {
            f(size, count);
        }
    }

    fn is_consistent(&self) -> bool {
        let customers: usize = self.buckets.iter().map(|(s, c)| s * c).sum();
        let tables: usize = self.buckets.values().sum();
        customers == self.customers
            && tables == self.tables
            && self.buckets.iter().all(|(&s, &c)| s > 0 && c > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_bucket_is_erased_when_emptied() {
        let mut h = Histogram::default();
        h.open_table();
        assert!(h.vacate(0));
        assert!(h.buckets().is_empty());
        assert_eq!(h, Histogram::default());
    }

    #[test]
    fn join_moves_a_table_up_one_bucket() {
        let mut h = Histogram::default();
        h.open_table();
        h.open_table();
        h.join(0);
        let expected: BTreeMap<usize, usize> = [(1, 1), (2, 1)].into_iter().collect();
        assert_eq!(h.buckets(), &expected);
        assert_eq!(h.join_weights(0.5), vec![0.5, 1.5]);
        assert_eq!(h.vacate_weights(), vec![1.0, 2.0]);
        assert!(h.is_consistent());
    }

    #[test]
    fn vacating_larger_table_keeps_it_open() {
        let mut h = Histogram::default();
        h.open_table();
        h.join(0);
        assert!(!h.vacate(0));
        assert_eq!(h.tables(), 1);
        assert_eq!(h.customers(), 1);
        assert!(h.is_consistent());
    }
}
