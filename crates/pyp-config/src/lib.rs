//! Seating-engine configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the hierarchy, filter and sampler settings
//! - Config resolution (CLI → env → config dir → XDG → defaults)
//! - Semantic validation with stable error codes
//! - Config snapshots for run reproducibility

pub mod engine;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::{
    ArithmeticDomain, EngineConfig, FilterConfig, GibbsConfig, HpypConfig, HyperPrior,
    ResampleMethod, RestaurantKind,
};
pub use resolve::{load_config, resolve_config, ConfigSource, ResolvedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
