//! Sequential Monte Carlo over a fixed-size particle population.
//!
//! A [`Filter`] owns a [`ParticleSystem`] and a [`RngPool`](crate::rng::RngPool).
//! Per-particle work (`init`, `extend`) runs in parallel with one worker
//! stream per contiguous chunk of particles; normalization, ESS and
//! resampling run sequentially on the main stream.
//!
//! ```
//! use pyp_config::FilterConfig;
//! use pyp_core::model::SmcModel;
//! use pyp_core::smc::Filter;
//! use rand::Rng;
//!
//! /// Counts steps; every particle gets the same weight.
//! struct Steps;
//!
//! impl SmcModel for Steps {
//!     type Particle = usize;
//!     type Observation = ();
//!     fn init<R: Rng + ?Sized>(&self, p: &mut usize, _: &mut R) -> f64 {
//!         *p = 0;
//!         0.0
//!     }
//!     fn extend<R: Rng + ?Sized>(&self, p: &mut usize, _: &(), _: &mut R) -> f64 {
//!         *p += 1;
//!         -1.0
//!     }
//!     fn score(&self, p: &mut usize, _: &(), _: usize) -> f64 {
//!         *p += 1;
//!         -1.0
//!     }
//! }
//!
//! let mut filter = Filter::new(FilterConfig::default().with_particles(10), 7).unwrap();
//! let drawn = filter.sample(&Steps, &[(), (), ()]).unwrap();
//! assert_eq!(drawn, 3);
//! assert!((filter.log_partition() + 3.0).abs() < 1e-12);
//! ```

pub mod conditional;
pub mod filter;
pub mod resample;
pub mod system;

pub use filter::Filter;
pub use resample::{apply_counts, resample_counts};
pub use system::ParticleSystem;

use pyp_config::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmcError {
    #[error("invalid filter configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("degenerate particle population: all {particles} particles have zero weight")]
    Degenerate { particles: usize },
}

impl SmcError {
    pub fn code(&self) -> u32 {
        match self {
            SmcError::Config(e) => e.code(),
            SmcError::Degenerate { .. } => 30,
        }
    }
}
