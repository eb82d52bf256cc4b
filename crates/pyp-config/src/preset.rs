//! Configuration presets trading run time for sampler quality.
//!
//! - Quick: few particles and sweeps, for smoke runs and tests
//! - Default: the stock settings
//! - Thorough: many particles, adaptive resampling and hyperparameter moves

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{EngineConfig, FilterConfig, GibbsConfig, ResampleMethod};

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    Quick,
    Default,
    Thorough,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Quick, PresetName::Default, PresetName::Thorough];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Quick => "quick",
            PresetName::Default => "default",
            PresetName::Thorough => "thorough",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "quick" | "fast" | "smoke" => Some(PresetName::Quick),
            "default" | "standard" => Some(PresetName::Default),
            "thorough" | "slow" => Some(PresetName::Thorough),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Quick => "10 particles, 5 iterations, no resampling",
            PresetName::Default => "100 particles, 100 iterations, no resampling",
            PresetName::Thorough => {
                "500 particles, 500 iterations, systematic resampling at ESS < N/2, hyperparameter moves"
            }
        }
    }

    /// Build the configuration for this preset.
    pub fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        match self {
            PresetName::Quick => {
                config.filter = FilterConfig::default().with_particles(10);
                config.gibbs = GibbsConfig {
                    num_iter: 5,
                    check_consistency: true,
                };
            }
            PresetName::Default => {}
            PresetName::Thorough => {
                config.filter = FilterConfig::default()
                    .with_particles(500)
                    .with_resample(ResampleMethod::Systematic, 0.5);
                config.gibbs.num_iter = 500;
                config.hpyp.resample_hyperparameters = true;
            }
        }
        config
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| format!("unknown preset: {}", s))
    }
}
