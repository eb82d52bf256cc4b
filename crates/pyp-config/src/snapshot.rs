//! Configuration snapshots for run reproducibility.
//!
//! A snapshot records the exact engine configuration at the start of a run
//! together with a content hash, so two runs can be compared cheaply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::EngineConfig;
use crate::resolve::ResolvedConfig;
use crate::validate::ValidationResult;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    pub source: String,

    /// SHA-256 of the canonical JSON form of the configuration.
    pub config_hash: String,

    pub config: EngineConfig,
}

impl ConfigSnapshot {
    /// Capture a snapshot of a loaded configuration.
    pub fn capture(config: &EngineConfig, resolved: &ResolvedConfig) -> ValidationResult<Self> {
        let json = config.to_json()?;
        Ok(ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            path: resolved.path.as_ref().map(|p| p.display().to_string()),
            source: resolved.source.to_string(),
            config_hash: hash_content(&json),
            config: config.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot has the same configuration as another.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// First 12 hex chars of the hash.
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

/// SHA-256 of content as lowercase hex.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
