//! Capabilities a model provides to the filters and the Gibbs sampler.
//!
//! [`SmcModel`] is all a particle filter needs: it proposes and scores
//! particle extensions through `&self`, so one step runs concurrently
//! across particles. [`Model`] adds the mutating side used between filter
//! runs: committing and retracting trajectories in the shared statistics.

use rand::Rng;
use std::fmt::Debug;
use thiserror::Error;

use crate::hpyp::HpypError;

/// Precondition failures reported by models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{what}: expected {expected}, found {found}")]
    Arity {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("sequence framing: {0}")]
    Framing(&'static str),

    #[error(transparent)]
    Hierarchy(#[from] HpypError),
}

impl ModelError {
    pub fn code(&self) -> u32 {
        match self {
            ModelError::Arity { .. } => 40,
            ModelError::UnknownSymbol(_) => 41,
            ModelError::Framing(_) => 42,
            ModelError::Hierarchy(e) => e.code(),
        }
    }

    pub(crate) fn arity(what: &'static str, expected: usize, found: usize) -> Self {
        ModelError::Arity {
            what,
            expected,
            found,
        }
    }
}

/// Proposal and weighting used by the particle filters.
pub trait SmcModel: Sync {
    type Particle: Clone + Send + Sync + Default;
    type Observation: Sync;

    /// Reset `particle` and return its initial log weight.
    fn init<R: Rng + ?Sized>(&self, particle: &mut Self::Particle, rng: &mut R) -> f64;

    /// Extend `particle` by one step and return the incremental log weight.
    fn extend<R: Rng + ?Sized>(
        &self,
        particle: &mut Self::Particle,
        observation: &Self::Observation,
        rng: &mut R,
    ) -> f64;

    /// Incremental log weight of the reference particle at step `t`.
    ///
    /// The particle already carries its choice for step `t`; nothing is
    /// sampled.
    fn score(&self, particle: &mut Self::Particle, observation: &Self::Observation, t: usize) -> f64;

    /// Make `dst` the reference trajectory `src`.
    fn swap(&self, dst: &mut Self::Particle, src: &Self::Particle) {
        dst.clone_from(src);
    }
}

/// Full model surface driven by Particle Gibbs.
pub trait Model: SmcModel {
    type Tag: Clone + Debug + PartialEq + Send + Sync;

    /// Add `particle`'s statistics for `observations`.
    fn observe<R: Rng + ?Sized>(
        &mut self,
        particle: &Self::Particle,
        observations: &[Self::Observation],
        rng: &mut R,
    ) -> Result<(), ModelError>;

    /// Retract statistics previously added by [`Model::observe`].
    fn remove<R: Rng + ?Sized>(
        &mut self,
        particle: &Self::Particle,
        observations: &[Self::Observation],
        rng: &mut R,
    ) -> Result<(), ModelError>;

    /// Particle carrying a given labeling.
    fn make_particle(&self, tags: &[Self::Tag], lens: &[usize]) -> Result<Self::Particle, ModelError>;

    fn tags(&self, particle: &Self::Particle) -> Vec<Self::Tag>;

    fn lens(&self, particle: &Self::Particle) -> Vec<usize>;

    /// Internal counts agree with each other.
    fn consistent(&self) -> bool;

    /// Resample model hyperparameters; returns how many were updated.
    fn resample_hyperparameters<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> usize {
        0
    }
}
