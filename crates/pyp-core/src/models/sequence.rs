//! Symbol language model with begin and end markers.
//!
//! Sequences are framed as `BOS s_1 ... s_n EOS`. Each symbol is predicted
//! from its whole prefix; the hierarchy only looks at the most recent
//! `max_depth - 2` symbols of it. `BOS` is never predicted, so it is left
//! out of the base measure.

use pyp_config::HpypConfig;
use rand::Rng;

use crate::base_measure::WeightedMeasure;
use crate::hpyp::{Domain, Hpyp, Linear};
use crate::model::ModelError;

pub type Symbol = u32;

#[derive(Debug, Clone)]
pub struct SequenceModel<A: Domain = Linear> {
    bos: Symbol,
    eos: Symbol,
    lm: Hpyp<Symbol, Symbol, WeightedMeasure<Symbol>, A>,
}

impl<A: Domain> SequenceModel<A> {
    /// Model over symbols `0..num_symbols`.
    ///
    /// The end marker weighs `num_symbols / 5` in the base measure, every
    /// other symbol 1.
    pub fn new(num_symbols: u32, bos: Symbol, eos: Symbol, config: &HpypConfig) -> Result<Self, ModelError> {
        Self::with_prior(num_symbols, bos, eos, std::iter::empty(), config)
    }

    /// Like [`SequenceModel::new`], then override individual base weights.
    pub fn with_prior(
        num_symbols: u32,
        bos: Symbol,
        eos: Symbol,
        prior: impl IntoIterator<Item = (Symbol, f64)>,
        config: &HpypConfig,
    ) -> Result<Self, ModelError> {
        if bos == eos {
            return Err(ModelError::Framing("begin and end markers must differ"));
        }
        let mut base = WeightedMeasure::uniform_over((0..num_symbols).filter(|&s| s != bos));
        base.set_weight(eos, num_symbols as f64 / 5.0);
        for (sym, weight) in prior {
            if sym == bos {
                return Err(ModelError::Framing("the begin marker carries no base weight"));
            }
            base.set_weight(sym, weight);
        }
        Ok(SequenceModel {
            bos,
            eos,
            lm: Hpyp::new(base, config)?,
        })
    }

    pub fn bos(&self) -> Symbol {
        self.bos
    }

    pub fn eos(&self) -> Symbol {
        self.eos
    }

    pub fn hierarchy(&self) -> &Hpyp<Symbol, Symbol, WeightedMeasure<Symbol>, A> {
        &self.lm
    }

    fn check_framed(&self, seq: &[Symbol]) -> Result<(), ModelError> {
        if seq.len() < 2 || seq[0] != self.bos || seq[seq.len() - 1] != self.eos {
            return Err(ModelError::Framing("sequence must run from BOS to EOS"));
        }
        Ok(())
    }

    /// Seat every symbol after `BOS` in the context of its prefix.
    pub fn observe<R: Rng + ?Sized>(&mut self, seq: &[Symbol], rng: &mut R) -> Result<(), ModelError> {
        self.check_framed(seq)?;
        for i in 1..seq.len() {
            self.lm.observe(&seq[..i], &seq[i], rng)?;
        }
        Ok(())
    }

    /// Undo [`SequenceModel::observe`] of the same sequence.
    pub fn remove<R: Rng + ?Sized>(&mut self, seq: &[Symbol], rng: &mut R) -> Result<(), ModelError> {
        self.check_framed(seq)?;
        for i in (1..seq.len()).rev() {
            self.lm.remove(&seq[..i], &seq[i], rng)?;
        }
        Ok(())
    }

    /// `Σ ln p(seq[i] | seq[..i])` for `i >= 1`; `seq` must start with `BOS`.
    pub fn log_prob(&self, seq: &[Symbol]) -> Result<f64, ModelError> {
        if seq.first() != Some(&self.bos) {
            return Err(ModelError::Framing("sequence must start with BOS"));
        }
        Ok((1..seq.len())
            .map(|i| self.lm.log_probability(&seq[..i], &seq[i]))
            .sum())
    }

    pub fn probability(&self, context: &[Symbol], sym: Symbol) -> f64 {
        self.lm.probability(context, &sym)
    }

    /// `ln p(EOS | context)`.
    pub fn log_prob_stop(&self, context: &[Symbol]) -> f64 {
        self.lm.log_probability(context, &self.eos)
    }

    /// `ln(1 - p(EOS | context))`.
    pub fn log_prob_continue(&self, context: &[Symbol]) -> f64 {
        (-self.lm.probability(context, &self.eos)).ln_1p()
    }

    /// Probabilities of every symbol after `context`.
    ///
    /// `EOS` is included only when `include_final` is set and `context` is
    /// non-empty.
    pub fn distribution(&self, context: &[Symbol], include_final: bool) -> Vec<(Symbol, f64)> {
        let with_eos = include_final && !context.is_empty();
        let symbols: Vec<Symbol> = self
            .lm
            .base()
            .symbols()
            .copied()
            .filter(|&s| s != self.eos || with_eos)
            .collect();
        self.lm.distribution(context, symbols)
    }

    pub fn consistent(&self) -> bool {
        self.lm.check_consistency()
    }
}
