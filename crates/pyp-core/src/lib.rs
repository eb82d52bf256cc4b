//! Hierarchical Pitman-Yor seating engine.
//!
//! This library provides:
//! - Chinese-restaurant seating arrangements with three backings
//! - A hierarchical Pitman-Yor process over a context tree
//! - Particle filtering, conditional SMC and Particle Gibbs
//! - Reference models, engine snapshots and structured logging

pub mod base_measure;
pub mod context_tree;
pub mod gibbs;
pub mod hpyp;
pub mod logging;
pub mod model;
pub mod models;
pub mod rng;
pub mod seating;
pub mod smc;
pub mod snapshot;

pub use gibbs::{Annotation, GibbsError, Instance, ParticleGibbs, SweepReport};
pub use hpyp::{Hpyp, HpypError};
pub use model::{Model, ModelError, SmcModel};
pub use rng::RngPool;
pub use seating::{Restaurant, SeatingArrangement, SeatingError};
pub use smc::{Filter, ParticleSystem, SmcError};
pub use snapshot::{EngineSnapshot, SnapshotError};
