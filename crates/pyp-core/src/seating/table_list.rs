//! Explicit per-table occupancy list.

use serde::{Deserialize, Serialize};

use super::DishTables;

/// Tables serving one dish, one entry per occupied table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableList {
    customers: usize,
    sizes: Vec<usize>,
}

impl TableList {
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

impl DishTables for TableList {
    fn customers(&self) -> usize {
        self.customers
    }

    fn tables(&self) -> usize {
        self.sizes.len()
    }

    fn join_weights(&self, discount: f64) -> Vec<f64> {
        self.sizes
            .iter()
            .map(|&n| (n as f64 - discount).max(0.0))
            .collect()
    }

    fn open_table(&mut self) {
        self.customers += 1;
        self.sizes.push(1);
    }

    fn join(&mut self, choice: usize) {
        self.customers += 1;
        self.sizes[choice] += 1;
    }

    fn vacate_weights(&self) -> Vec<f64> {
        self.sizes.iter().map(|&n| n as f64).collect()
    }

    fn vacate(&mut self, choice: usize) -> bool {
        self.customers -= 1;
        self.sizes[choice] -= 1;
        if self.sizes[choice] == 0 {
            self.sizes.remove(choice);
            true
        } else {
            false
        }
    }

    fn for_each_size(&self, f: &mut dyn FnMut(usize, usize)) {
        for &n in &self.sizes {
            f(n, 1);
        }
    }

    fn is_consistent(&self) -> bool {
        self.sizes.iter().all(|&n| n > 0) && self.sizes.iter().sum::<usize>() == self.customers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptied_table_is_dropped() {
        let mut t = TableList::default();
        t.open_table();
        t.open_table();
        t.join(1);
        assert_eq!(t.sizes(), &[1, 2]);
        assert!(t.vacate(0));
        assert_eq!(t.sizes(), &[2]);
        assert!(!t.vacate(0));
        assert_eq!(t.customers(), 1);
        assert!(t.is_consistent());
    }

    #[test]
    fn join_weights_are_discounted_sizes() {
        let mut t = TableList::default();
        t.open_table();
        t.join(0);
        t.join(0);
        t.open_table();
        assert_eq!(t.join_weights(0.5), vec![2.5, 0.5]);
        assert_eq!(t.vacate_weights(), vec![3.0, 1.0]);
    }
}
