//! Event names and stages attached to structured log records.

use serde::{Deserialize, Serialize};

/// Phases of an inference run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Drawing the first trajectory of every instance.
    Init,
    /// Particle filter steps and resampling.
    Filter,
    /// One Particle Gibbs pass over every pool.
    Sweep,
    /// Evaluator callbacks.
    Evaluate,
    /// Hyperparameter resampling.
    Hyper,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Filter => "filter",
            Stage::Sweep => "sweep",
            Stage::Evaluate => "evaluate",
            Stage::Hyper => "hyper",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable `event` field values.
pub mod event_names {
    // Particle Gibbs lifecycle
    pub const GIBBS_STARTED: &str = "gibbs.started";
    pub const GIBBS_INITIALIZED: &str = "gibbs.initialized";
    pub const GIBBS_SWEEP_FINISHED: &str = "gibbs.sweep_finished";
    pub const GIBBS_FINISHED: &str = "gibbs.finished";
    pub const GIBBS_INCONSISTENT: &str = "gibbs.inconsistent";

    // Filter
    pub const SMC_RESAMPLED: &str = "smc.resampled";
    pub const SMC_DEGENERATE: &str = "smc.degenerate";
    pub const SMC_SAMPLED: &str = "smc.sampled";

    // Hierarchy
    pub const HPYP_OBSERVE: &str = "hpyp.observe";
    pub const HPYP_REMOVE: &str = "hpyp.remove";
    pub const HPYP_HYPER_RESAMPLED: &str = "hpyp.hyper_resampled";

    // Snapshots
    pub const SNAPSHOT_SAVED: &str = "snapshot.saved";
    pub const SNAPSHOT_LOADED: &str = "snapshot.loaded";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization_matches_display() {
        for stage in [Stage::Init, Stage::Filter, Stage::Sweep, Stage::Evaluate, Stage::Hyper] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names_are_namespaced() {
        for name in [
            event_names::GIBBS_SWEEP_FINISHED,
            event_names::SMC_RESAMPLED,
            event_names::HPYP_HYPER_RESAMPLED,
        ] {
            assert_eq!(name.split('.').count(), 2, "{name}");
        }
    }
}
