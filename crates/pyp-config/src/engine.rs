//! Engine configuration types.
//!
//! Every field has a serde default so a partial file (or `{}`) yields a
//! runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::ValidationError;

/// Seating-arrangement backing used by every node of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestaurantKind {
    /// Explicit list of table sizes per dish.
    TableList,
    /// Histogram of table size → number of tables.
    #[default]
    Histogram,
    /// Prefix trie over sequence dishes with histogram arrangements.
    Trie,
}

/// Arithmetic domain for predictive propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticDomain {
    #[default]
    Linear,
    Log,
}

/// Particle resampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMethod {
    Multinomial,
    Residual,
    Stratified,
    Systematic,
    #[default]
    None,
}

impl ResampleMethod {
    pub const ALL: &'static [ResampleMethod] = &[
        ResampleMethod::Multinomial,
        ResampleMethod::Residual,
        ResampleMethod::Stratified,
        ResampleMethod::Systematic,
        ResampleMethod::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleMethod::Multinomial => "multinomial",
            ResampleMethod::Residual => "residual",
            ResampleMethod::Stratified => "stratified",
            ResampleMethod::Systematic => "systematic",
            ResampleMethod::None => "none",
        }
    }
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResampleMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multinomial" => Ok(ResampleMethod::Multinomial),
            "residual" => Ok(ResampleMethod::Residual),
            "stratified" => Ok(ResampleMethod::Stratified),
            "systematic" => Ok(ResampleMethod::Systematic),
            "none" | "off" => Ok(ResampleMethod::None),
            _ => Err(format!("unknown resample method: {}", s)),
        }
    }
}

/// Priors used when per-node hyperparameters are resampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperPrior {
    /// Beta(a, b) prior over discounts.
    #[serde(default = "default_discount_beta")]
    pub discount_beta: (f64, f64),
    /// Gamma(shape, rate) prior over concentrations.
    #[serde(default = "default_concentration_gamma")]
    pub concentration_gamma: (f64, f64),
    /// Slice-sampler sweeps per node per call.
    #[serde(default = "default_hyper_sweeps")]
    pub sweeps: usize,
}

fn default_discount_beta() -> (f64, f64) {
    (1.0, 1.0)
}

fn default_concentration_gamma() -> (f64, f64) {
    (10.0, 0.1)
}

fn default_hyper_sweeps() -> usize {
    1
}

impl Default for HyperPrior {
    fn default() -> Self {
        HyperPrior {
            discount_beta: default_discount_beta(),
            concentration_gamma: default_concentration_gamma(),
            sweeps: default_hyper_sweeps(),
        }
    }
}

/// Hierarchical Pitman-Yor process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpypConfig {
    /// Concentration at depth 1; deeper levels scale it by the discounts.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Number of levels including the base measure (level 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Discounts for depths 1, 2, ... in order.
    #[serde(default = "default_discounts")]
    pub discounts: Vec<f64>,

    /// Discount for depths beyond `discounts`.
    #[serde(default = "default_discount")]
    pub default_discount: f64,

    #[serde(default)]
    pub restaurant: RestaurantKind,

    #[serde(default)]
    pub domain: ArithmeticDomain,

    /// Enable slice-sampling of per-node hyperparameters.
    #[serde(default)]
    pub resample_hyperparameters: bool,

    #[serde(default)]
    pub hyper_prior: HyperPrior,
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_depth() -> usize {
    7
}

fn default_discounts() -> Vec<f64> {
    vec![0.62, 0.69, 0.74, 0.80]
}

fn default_discount() -> f64 {
    0.75
}

impl Default for HpypConfig {
    fn default() -> Self {
        HpypConfig {
            alpha: default_alpha(),
            max_depth: default_max_depth(),
            discounts: default_discounts(),
            default_discount: default_discount(),
            restaurant: RestaurantKind::default(),
            domain: ArithmeticDomain::default(),
            resample_hyperparameters: false,
            hyper_prior: HyperPrior::default(),
        }
    }
}

impl HpypConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_restaurant(mut self, restaurant: RestaurantKind) -> Self {
        self.restaurant = restaurant;
        self
    }

    pub fn with_domain(mut self, domain: ArithmeticDomain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_hyper_resampling(mut self, prior: HyperPrior) -> Self {
        self.resample_hyperparameters = true;
        self.hyper_prior = prior;
        self
    }
}

/// Particle filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_num_particles")]
    pub num_particles: usize,

    /// Fraction of N when below 1, absolute ESS otherwise.
    #[serde(default = "default_resample_threshold")]
    pub resample_threshold: f64,

    #[serde(default)]
    pub resample: ResampleMethod,

    /// Independent random streams for particle-parallel steps.
    #[serde(default = "default_streams")]
    pub streams: usize,
}

fn default_num_particles() -> usize {
    100
}

fn default_resample_threshold() -> f64 {
    0.5
}

fn default_streams() -> usize {
    8
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            num_particles: default_num_particles(),
            resample_threshold: default_resample_threshold(),
            resample: ResampleMethod::default(),
            streams: default_streams(),
        }
    }
}

impl FilterConfig {
    pub fn with_particles(mut self, num_particles: usize) -> Self {
        self.num_particles = num_particles;
        self
    }

    pub fn with_resample(mut self, method: ResampleMethod, threshold: f64) -> Self {
        self.resample = method;
        self.resample_threshold = threshold;
        self
    }
}

/// Particle Gibbs sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GibbsConfig {
    /// Iteration count; the first iteration is initialization.
    #[serde(default = "default_num_iter")]
    pub num_iter: usize,

    /// Run the model consistency check after every sweep.
    #[serde(default)]
    pub check_consistency: bool,
}

fn default_num_iter() -> usize {
    100
}

impl Default for GibbsConfig {
    fn default() -> Self {
        GibbsConfig {
            num_iter: default_num_iter(),
            check_consistency: false,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Master seed for every random stream in a run.
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub hpyp: HpypConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub gibbs: GibbsConfig,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema_version: default_schema_version(),
            seed: 0,
            hpyp: HpypConfig::default(),
            filter: FilterConfig::default(),
            gibbs: GibbsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text).map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Canonical JSON form, used for hashing and snapshots.
    pub fn to_json(&self) -> Result<String, ValidationError> {
        serde_json::to_string(self)
            .map_err(|e| ValidationError::ParseError(format!("Unserializable config: {}", e)))
    }
}
