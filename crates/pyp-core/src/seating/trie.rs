//! Prefix-trie restaurant for sequence dishes.
//!
//! Dishes are decomposed with [`Dish::symbols`] and stored along a path of
//! trie nodes; the terminal node keeps the dish and its table histogram.
//! Besides the usual seating operations this supports enumerating every
//! served dish that starts with a given prefix, which a segmental model uses
//! to score partial words. Empty branches are pruned on removal, so an
//! add/remove round trip restores the exact trie shape.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::predictive::log_cache_probability;
use super::{
    pairs, seat, unseat, Dish, DishTables, Histogram, ParentDomain, SeatingArrangement,
    SeatingError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
struct TrieNode<D: Dish> {
    #[serde(with = "pairs")]
    children: BTreeMap<D::Symbol, TrieNode<D>>,
    #[serde(default)]
    terminal: Option<(D, Histogram)>,
}

impl<D: Dish> Default for TrieNode<D> {
    fn default() -> Self {
        TrieNode {
            children: BTreeMap::new(),
            terminal: None,
        }
    }
}

impl<D: Dish> TrieNode<D> {
    fn find(&self, path: &[D::Symbol]) -> Option<&TrieNode<D>> {
        let mut node = self;
        for sym in path {
            node = node.children.get(sym)?;
        }
        Some(node)
    }

    fn find_or_insert(&mut self, path: &[D::Symbol]) -> &mut TrieNode<D> {
        let mut node = self;
        for sym in path {
            node = node.children.entry(sym.clone()).or_default();
        }
        node
    }

    fn is_empty(&self) -> bool {
        self.terminal.is_none() && self.children.is_empty()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a (D, Histogram)>) {
        if let Some(t) = &self.terminal {
            out.push(t);
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }

    /// Unseat along `path`, pruning branches left without dishes.
    fn unseat_at<R: Rng + ?Sized>(
        &mut self,
        path: &[D::Symbol],
        dish: &D,
        rng: &mut R,
    ) -> Result<bool, SeatingError> {
        match path.split_first() {
            None => {
                let tables = match &mut self.terminal {
                    Some((_, tables)) if tables.customers() > 0 => tables,
                    _ => return Err(SeatingError::empty(dish)),
                };
                let closed = unseat(tables, dish, rng)?;
                if tables.customers() == 0 {
                    self.terminal = None;
                }
                Ok(closed)
            }
            Some((head, rest)) => {
                let child = self
                    .children
                    .get_mut(head)
                    .ok_or_else(|| SeatingError::empty(dish))?;
                let closed = child.unseat_at(rest, dish, rng)?;
                if child.is_empty() {
                    self.children.remove(head);
                }
                Ok(closed)
            }
        }
    }
}

/// Histogram arrangements indexed by a symbol trie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TrieRestaurant<D: Dish> {
    customers: usize,
    tables: usize,
    num_dishes: usize,
    root: TrieNode<D>,
}

impl<D: Dish> Default for TrieRestaurant<D> {
    fn default() -> Self {
        TrieRestaurant {
            customers: 0,
            tables: 0,
            num_dishes: 0,
            root: TrieNode::default(),
        }
    }
}

impl<D: Dish> TrieRestaurant<D> {
    fn tables_for(&self, dish: &D) -> Option<&Histogram> {
        self.root
            .find(&dish.symbols())
            .and_then(|n| n.terminal.as_ref())
            .map(|(_, t)| t)
    }

    /// Number of distinct dishes with customers.
    pub fn num_dishes(&self) -> usize {
        self.num_dishes
    }

    pub fn contains(&self, dish: &D) -> bool {
        self.tables_for(dish).is_some()
    }

    /// Every served dish whose symbols start with `prefix`, in trie order.
    pub fn starts_with(&self, prefix: &[D::Symbol]) -> Vec<D> {
        let mut found = Vec::new();
        if let Some(node) = self.root.find(prefix) {
            node.collect(&mut found);
        }
        found.into_iter().map(|(d, _)| d.clone()).collect()
    }

    /// Log cache probability of each served dish starting with `prefix`.
    pub fn log_cache_probability_matching(
        &self,
        prefix: &[D::Symbol],
        discount: f64,
        concentration: f64,
    ) -> Vec<(D, f64)> {
        let mut found = Vec::new();
        if let Some(node) = self.root.find(prefix) {
            node.collect(&mut found);
        }
        found
            .into_iter()
            .map(|(d, t)| {
                let lp = log_cache_probability(
                    t.customers(),
                    t.tables(),
                    self.customers,
                    discount,
                    concentration,
                );
                (d.clone(), lp)
            })
            .collect()
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
        let symbols = dish.symbols();
        let node_tables = self.tables;
        let node = self.root.find_or_insert(&symbols);
        let (_, tables) = node
            .terminal
            .get_or_insert_with(|| (dish.clone(), Histogram::default()));
        let first = tables.customers() == 0;
        let result = seat(tables, dish, node_tables, parent, discount, concentration, domain, rng);
        if result.is_err() && first {
            // Undo the speculative path so a failed add leaves no trace.
            node.terminal = None;
            self.prune(&symbols);
        }
        let opened = result?;
        self.customers += 1;
        self.tables += opened as usize;
        self.num_dishes += first as usize;
        Ok(opened)
    }

    fn prune(&mut self, path: &[D::Symbol]) {
        fn go<D: Dish>(node: &mut TrieNode<D>, path: &[D::Symbol]) {
            if let Some((head, rest)) = path.split_first() {
                if let Some(child) = node.children.get_mut(head) {
                    go(child, rest);
                    if child.is_empty() {
                        node.children.remove(head);
                    }
                }
            }
        }
        go(&mut self.root, path);
    }
}

impl<D: Dish> SeatingArrangement<D> for TrieRestaurant<D> {
    fn customers(&self) -> usize {
        self.customers
    }

    fn customers_of(&self, dish: &D) -> usize {
        self.tables_for(dish).map_or(0, |t| t.customers())
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn tables_of(&self, dish: &D) -> usize {
        self.tables_for(dish).map_or(0, |t| t.tables())
    }

    fn dishes(&self) -> Vec<D> {
        self.starts_with(&[])
    }

    fn size_histogram(&self) -> BTreeMap<usize, usize> {
        let mut found = Vec::new();
        self.root.collect(&mut found);
        let mut hist = BTreeMap::new();
        for (_, tables) in found {
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
        let had = self.customers_of(dish);
        if had == 0 {
            return Err(SeatingError::empty(dish));
        }
        let closed = self.root.unseat_at(&dish.symbols(), dish, rng)?;
        self.customers -= 1;
        self.tables -= closed as usize;
        if had == 1 {
            self.num_dishes -= 1;
        }
        Ok(closed)
    }

    fn check_consistency(&self) -> bool {
        let mut found = Vec::new();
        self.root.collect(&mut found);
        let customers: usize = found.iter().map(|(_, t)| t.customers()).sum();
        let tables: usize = found.iter().map(|(_, t)| t.tables()).sum();
        customers == self.customers
            && tables == self.tables
            && found.len() == self.num_dishes
            && found
                .iter()
                .all(|(d, t)| t.customers() > 0 && t.is_consistent() && self.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::test_support::{exercise, rng};

    fn word(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn round_trip_restores_trie_shape() {
        let mut r = TrieRestaurant::<Vec<char>>::default();
        let dishes: Vec<_> = ["the", "then", "the", "a", "them", "then", "a"]
            .iter()
            .map(|w| word(w))
            .collect();
        exercise(&mut r, &dishes);
    }

    #[test]
    fn starts_with_lists_matching_dishes() {
        let mut rng = rng(1);
        let mut r = TrieRestaurant::<Vec<char>>::default();
        for w in ["cat", "car", "cart", "dog"] {
            r.add(&word(w), 0.01, 0.5, 1.0, &mut rng).unwrap();
        }
        assert_eq!(
            r.starts_with(&word("ca")),
            vec![word("car"), word("cart"), word("cat")]
        );
        assert_eq!(r.starts_with(&word("x")), Vec::<Vec<char>>::new());
        assert_eq!(r.num_dishes(), 4);
        assert!(r.contains(&word("car")));
        assert!(!r.contains(&word("ca")));
        assert_eq!(r.dishes().len(), 4);
    }

    #[test]
    fn cache_probability_matching_uses_node_total() {
        let mut rng = rng(2);
        let mut r = TrieRestaurant::<Vec<char>>::default();
        for w in ["ab", "ab", "abc", "b"] {
            r.add(&word(w), 0.0, 0.5, 1.0, &mut rng).unwrap();
        }
        let matches = r.log_cache_probability_matching(&word("ab"), 0.5, 1.0);
        assert_eq!(matches.len(), 2);
        for (dish, lp) in matches {
            let expected = r.log_cache_probability(&dish, 0.5, 1.0);
            assert!((lp - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn remove_prefix_that_is_not_a_dish_fails() {
        let mut rng = rng(3);
        let mut r = TrieRestaurant::<Vec<char>>::default();
        r.add(&word("abc"), 0.1, 0.5, 1.0, &mut rng).unwrap();
        let before = r.clone();
        assert!(r.remove(&word("ab"), 0.5, &mut rng).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn agrees_with_histogram_backing() {
        use crate::seating::HistogramRestaurant;
        let mut rng = rng(4);
        let mut a = TrieRestaurant::<u32>::default();
        let mut b = HistogramRestaurant::<u32>::default();
        for dish in [5, 5, 1, 5, 2] {
            a.add(&dish, 0.0, 0.5, 1.0, &mut rng).unwrap();
            b.add(&dish, 0.0, 0.5, 1.0, &mut rng).unwrap();
        }
        for dish in 0..7 {
            assert_eq!(
                a.log_probability(&dish, 0.1f64.ln(), 0.5, 1.0),
                b.log_probability(&dish, 0.1f64.ln(), 0.5, 1.0)
            );
        }
    }

    #[test]
    fn serde_round_trip() {
        let mut rng = rng(5);
        let mut r = TrieRestaurant::<Vec<char>>::default();
        for w in ["ab", "abc", "ab"] {
            r.add(&word(w), 0.2, 0.5, 1.0, &mut rng).unwrap();
        }
        let json = serde_json::to_string(&r).unwrap();
        let back: TrieRestaurant<Vec<char>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
