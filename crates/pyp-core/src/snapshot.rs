//! JSON snapshots of engine state.
//!
//! Any serializable value (a hierarchy, a model, sampler trajectories) can
//! be wrapped, written and read back with identical counts and per-node
//! hyperparameters.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::logging::{event_names, generate_run_id};

/// Snapshot format version.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot schema {found} (expected {expected})")]
    Schema { found: String, expected: &'static str },
}

impl SnapshotError {
    pub fn code(&self) -> u32 {
        match self {
            SnapshotError::Io(_) => 70,
            SnapshotError::Json(_) => 71,
            SnapshotError::Schema { .. } => 72,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot<T> {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub run_id: String,
    pub state: T,
}

impl<T> EngineSnapshot<T> {
    /// Wrap `state` under a fresh run id.
    pub fn new(state: T) -> Self {
        Self::with_run_id(state, generate_run_id())
    }

    pub fn with_run_id(state: T, run_id: impl Into<String>) -> Self {
        EngineSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            run_id: run_id.into(),
            state,
        }
    }

    pub fn into_state(self) -> T {
        self.state
    }

    /// Same major version as this build.
    fn check_schema(&self) -> Result<(), SnapshotError> {
        let major = |v: &str| v.split('.').next().map(str::to_owned);
        if major(&self.schema_version) != major(SNAPSHOT_SCHEMA_VERSION) {
            return Err(SnapshotError::Schema {
                found: self.schema_version.clone(),
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> EngineSnapshot<T> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_schema()?;
        Ok(snapshot)
    }

    /// Write through a sibling temporary file, then rename into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        info!(
            event = event_names::SNAPSHOT_SAVED,
            run_id = %self.run_id,
            path = %path.display(),
            "snapshot saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let snapshot = Self::from_json(&fs::read_to_string(path)?)?;
        info!(
            event = event_names::SNAPSHOT_LOADED,
            run_id = %snapshot.run_id,
            path = %path.display(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}
