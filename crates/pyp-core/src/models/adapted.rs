//! Pitman-Yor adaptor over whole symbol sequences.
//!
//! Framed sequences `BOS s_1 ... s_n EOS` are dishes of one trie-indexed
//! restaurant. A customer that opens a new table draws its sequence from a
//! [`SequenceModel`] base, and only then is the sequence observed in the
//! base; joining an existing table leaves the base untouched. Removal
//! mirrors this: the base forgets a sequence only when its table closes.
//!
//! The trie index answers prefix queries: [`AdaptedSequenceModel::log_prefix_prob`]
//! is the total probability of every sequence that extends a given prefix.

use pyp_config::validate::ValidationError;
use pyp_config::HpypConfig;
use pyp_math::{log_add_exp, log_sum_exp};
use rand::Rng;
use tracing::trace;

use super::sequence::{SequenceModel, Symbol};
use crate::context_tree::Hyperparameters;
use crate::hpyp::{Domain, HpypError, Linear};
use crate::model::ModelError;
use crate::seating::{SeatingArrangement, TrieRestaurant};

/// Adaptor parameters when none are given.
pub const DEFAULT_ADAPTOR: Hyperparameters = Hyperparameters {
    discount: 0.5,
    concentration: 0.1,
};

#[derive(Debug, Clone)]
pub struct AdaptedSequenceModel<A: Domain = Linear> {
    base: SequenceModel<A>,
    cache: TrieRestaurant<Vec<Symbol>>,
    adaptor: Hyperparameters,
}

impl<A: Domain> AdaptedSequenceModel<A> {
    /// Adaptor with [`DEFAULT_ADAPTOR`] over a base on `0..num_symbols`.
    pub fn new(num_symbols: u32, bos: Symbol, eos: Symbol, config: &HpypConfig) -> Result<Self, ModelError> {
        Self::with_adaptor(SequenceModel::new(num_symbols, bos, eos, config)?, DEFAULT_ADAPTOR)
    }

    pub fn with_adaptor(base: SequenceModel<A>, adaptor: Hyperparameters) -> Result<Self, ModelError> {
        check_adaptor(adaptor)?;
        Ok(AdaptedSequenceModel {
            base,
            cache: TrieRestaurant::default(),
            adaptor,
        })
    }

    pub fn base(&self) -> &SequenceModel<A> {
        &self.base
    }

    pub fn cache(&self) -> &TrieRestaurant<Vec<Symbol>> {
        &self.cache
    }

    pub fn adaptor(&self) -> Hyperparameters {
        self.adaptor
    }

    pub fn set_adaptor(&mut self, adaptor: Hyperparameters) -> Result<(), ModelError> {
        check_adaptor(adaptor)?;
        self.adaptor = adaptor;
        Ok(())
    }

    pub fn num_customers(&self) -> usize {
        self.cache.customers()
    }

    pub fn num_tables(&self) -> usize {
        self.cache.tables()
    }

    fn check_framed(&self, seq: &[Symbol]) -> Result<(), ModelError> {
        let (bos, eos) = (self.base.bos(), self.base.eos());
        if seq.len() < 2 || seq[0] != bos || seq[seq.len() - 1] != eos {
            return Err(ModelError::Framing("sequence must run from BOS to EOS"));
        }
        Ok(())
    }

    /// Seat `seq`; the base observes it only if a new table opens.
    pub fn observe<R: Rng + ?Sized>(&mut self, seq: &[Symbol], rng: &mut R) -> Result<bool, ModelError> {
        self.check_framed(seq)?;
        let log_p0 = self.base.log_prob(seq)?;
        let Hyperparameters { discount, concentration } = self.adaptor;
        let opened = self
            .cache
            .log_add(&seq.to_vec(), log_p0, discount, concentration, rng)
            .map_err(HpypError::from)?;
        if opened {
            self.base.observe(seq, rng)?;
        }
        trace!(len = seq.len(), opened, tables = self.cache.tables(), "adapted observe");
        Ok(opened)
    }

    /// Unseat `seq`; the base forgets it only if its table closes.
    pub fn remove<R: Rng + ?Sized>(&mut self, seq: &[Symbol], rng: &mut R) -> Result<bool, ModelError> {
        self.check_framed(seq)?;
        let closed = self
            .cache
            .remove(&seq.to_vec(), self.adaptor.discount, rng)
            .map_err(HpypError::from)?;
        if closed {
            self.base.remove(seq, rng)?;
        }
        Ok(closed)
    }

    /// Predictive log probability of the framed sequence `seq`.
    pub fn log_prob(&self, seq: &[Symbol]) -> Result<f64, ModelError> {
        self.check_framed(seq)?;
        let log_p0 = self.base.log_prob(seq)?;
        let Hyperparameters { discount, concentration } = self.adaptor;
        Ok(self.cache.log_probability(&seq.to_vec(), log_p0, discount, concentration))
    }

    /// Log probability of joining an existing table of `seq`.
    pub fn log_cached_prob(&self, seq: &[Symbol]) -> f64 {
        let Hyperparameters { discount, concentration } = self.adaptor;
        self.cache.log_cache_probability(&seq.to_vec(), discount, concentration)
    }

    /// Log probability of opening a new table and drawing `seq` from the base.
    ///
    /// `seq` must start with `BOS`; it need not end with `EOS`.
    pub fn log_new_prob(&self, seq: &[Symbol]) -> Result<f64, ModelError> {
        let log_p0 = self.base.log_prob(seq)?;
        let Hyperparameters { discount, concentration } = self.adaptor;
        Ok(self.cache.log_new_table_probability(log_p0, discount, concentration))
    }

    /// Total log probability of every sequence that strictly extends `prefix`.
    ///
    /// Sums the cache mass of served sequences that continue past `prefix`
    /// with the mass of a new table whose base draw produces `prefix` and
    /// then does not stop. `prefix` must start with `BOS` and not contain
    /// `EOS`.
    pub fn log_prefix_prob(&self, prefix: &[Symbol]) -> Result<f64, ModelError> {
        if prefix.first() != Some(&self.base.bos()) {
            return Err(ModelError::Framing("prefix must start with BOS"));
        }
        let eos = self.base.eos();
        if prefix.contains(&eos) {
            return Err(ModelError::Framing("prefix must not contain EOS"));
        }
        let Hyperparameters { discount, concentration } = self.adaptor;
        let cached: Vec<f64> = self
            .cache
            .log_cache_probability_matching(prefix, discount, concentration)
            .into_iter()
            .filter(|(seq, _)| seq.get(prefix.len()) != Some(&eos))
            .map(|(_, lp)| lp)
            .collect();
        let fresh = self.log_new_prob(prefix)? + self.base.log_prob_continue(prefix);
        Ok(log_add_exp(log_sum_exp(&cached), fresh))
    }

    /// Served sequences that start with `prefix`, in trie order.
    pub fn completions(&self, prefix: &[Symbol]) -> Vec<Vec<Symbol>> {
        self.cache.starts_with(prefix)
    }

    /// Both layers are internally consistent, and the base holds exactly
    /// one observation per cache table.
    pub fn consistent(&self) -> bool {
        let expected: usize = self
            .cache
            .dishes()
            .iter()
            .map(|seq| self.cache.tables_of(seq) * (seq.len() - 1))
            .sum();
        self.cache.check_consistency()
            && self.base.consistent()
            && self.base.hierarchy().total_customers() == expected
    }
}

fn check_adaptor(adaptor: Hyperparameters) -> Result<(), ModelError> {
    if !adaptor.is_valid() {
        return Err(HpypError::Config(ValidationError::InvalidValue {
            field: "adaptor".to_string(),
            message: format!(
                "Need 0 <= discount < 1 and concentration > -discount, got ({}, {})",
                adaptor.discount, adaptor.concentration
            ),
        })
        .into());
    }
    Ok(())
}
