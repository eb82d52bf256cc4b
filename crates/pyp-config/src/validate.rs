//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::engine::{EngineConfig, FilterConfig, GibbsConfig, HpypConfig, HyperPrior};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest accepted depth-1 concentration.
pub const MAX_ALPHA: f64 = 10_000.0;

/// Largest accepted base-measure cardinality.
pub const MAX_CARDINALITY: usize = 100_000;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }

    fn invalid(field: &str, message: String) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message,
        }
    }
}

/// Validate a complete engine configuration.
pub fn validate_engine(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }
    validate_hpyp(&config.hpyp)?;
    validate_filter(&config.filter)?;
    validate_gibbs(&config.gibbs)?;
    Ok(())
}

/// Validate hierarchy hyperparameters.
///
/// Checks `0 < alpha < 10000`, every discount in `[0, 1)`, and that the
/// hierarchy has at least a root level above the base measure.
///
/// `max_depth` is accepted down to 2, not only from 5 upwards. Depth 2
/// builds a root-only process: every context backs off to the single root
/// restaurant, whose parent is the base measure. Depths 3 and 4 look at
/// one and two context symbols.
pub fn validate_hpyp(config: &HpypConfig) -> ValidationResult<()> {
    if !(config.alpha > 0.0 && config.alpha < MAX_ALPHA) {
        return Err(ValidationError::invalid(
            "hpyp.alpha",
            format!("Must be in (0, {}), got {}", MAX_ALPHA, config.alpha),
        ));
    }
    if config.max_depth < 2 {
        return Err(ValidationError::invalid(
            "hpyp.max_depth",
            format!("Must be at least 2, got {}", config.max_depth),
        ));
    }
    for (i, d) in config.discounts.iter().enumerate() {
        validate_discount(&format!("hpyp.discounts[{}]", i), *d)?;
    }
    validate_discount("hpyp.default_discount", config.default_discount)?;
    if config.resample_hyperparameters {
        validate_hyper_prior(&config.hyper_prior)?;
    }
    Ok(())
}

fn validate_discount(field: &str, d: f64) -> ValidationResult<()> {
    if !(0.0..1.0).contains(&d) {
        return Err(ValidationError::invalid(
            field,
            format!("Must be in [0, 1), got {}", d),
        ));
    }
    Ok(())
}

fn validate_hyper_prior(prior: &HyperPrior) -> ValidationResult<()> {
    let (a, b) = prior.discount_beta;
    if !(a > 0.0 && b > 0.0) {
        return Err(ValidationError::invalid(
            "hpyp.hyper_prior.discount_beta",
            format!("Beta parameters must be positive, got ({}, {})", a, b),
        ));
    }
    let (shape, rate) = prior.concentration_gamma;
    if !(shape > 0.0 && rate > 0.0) {
        return Err(ValidationError::invalid(
            "hpyp.hyper_prior.concentration_gamma",
            format!("Gamma parameters must be positive, got ({}, {})", shape, rate),
        ));
    }
    Ok(())
}

/// Validate particle filter settings.
pub fn validate_filter(config: &FilterConfig) -> ValidationResult<()> {
    if config.num_particles == 0 {
        return Err(ValidationError::invalid(
            "filter.num_particles",
            "Must be at least 1".to_string(),
        ));
    }
    if !(config.resample_threshold.is_finite() && config.resample_threshold >= 0.0) {
        return Err(ValidationError::invalid(
            "filter.resample_threshold",
            format!("Must be finite and non-negative, got {}", config.resample_threshold),
        ));
    }
    if config.resample_threshold >= 1.0
        && config.resample_threshold > config.num_particles as f64
    {
        return Err(ValidationError::SemanticError(format!(
            "Absolute ESS threshold {} exceeds particle count {}",
            config.resample_threshold, config.num_particles
        )));
    }
    if config.streams == 0 {
        return Err(ValidationError::invalid(
            "filter.streams",
            "Must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate sweep settings.
pub fn validate_gibbs(config: &GibbsConfig) -> ValidationResult<()> {
    if config.num_iter == 0 {
        return Err(ValidationError::invalid(
            "gibbs.num_iter",
            "Must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate a base-measure cardinality.
pub fn validate_cardinality(cardinality: usize) -> ValidationResult<()> {
    if cardinality == 0 || cardinality >= MAX_CARDINALITY {
        return Err(ValidationError::invalid(
            "base.cardinality",
            format!("Must be in (0, {}), got {}", MAX_CARDINALITY, cardinality),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        validate_engine(&EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_alpha_bounds() {
        for alpha in [0.0, -1.0, MAX_ALPHA, f64::NAN] {
            let config = HpypConfig::default().with_alpha(alpha);
            let err = validate_hpyp(&config).unwrap_err();
            assert_eq!(err.code(), 65, "alpha={}", alpha);
        }
    }

    #[test]
    fn test_discount_bounds() {
        let mut config = HpypConfig::default();
        config.discounts[2] = 1.0;
        let err = validate_hpyp(&config).unwrap_err();
        assert!(err.to_string().contains("hpyp.discounts[2]"));
    }

    #[test]
    fn test_depth_two_is_smallest_hierarchy() {
        assert!(validate_hpyp(&HpypConfig::default().with_max_depth(1)).is_err());
        for depth in 2..5 {
            assert!(validate_hpyp(&HpypConfig::default().with_max_depth(depth)).is_ok());
        }
    }

    #[test]
    fn test_absolute_threshold_cannot_exceed_particles() {
        let config = FilterConfig::default()
            .with_particles(10)
            .with_resample(crate::ResampleMethod::Systematic, 20.0);
        let err = validate_filter(&config).unwrap_err();
        assert_eq!(err.code(), 63);
    }

    #[test]
    fn test_version_mismatch() {
        let config = EngineConfig {
            schema_version: "0.1".to_string(),
            ..Default::default()
        };
        assert_eq!(validate_engine(&config).unwrap_err().code(), 66);
    }

    #[test]
    fn test_cardinality() {
        assert!(validate_cardinality(0).is_err());
        assert!(validate_cardinality(3).is_ok());
        assert!(validate_cardinality(MAX_CARDINALITY).is_err());
    }
}
