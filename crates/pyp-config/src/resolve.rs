//! Configuration resolution and loading.
//!
//! Resolution order: CLI argument → `PYP_CONFIG` → `PYP_CONFIG_DIR/pyp.toml`
//! → XDG config dir → built-in defaults.

use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::preset::PresetName;
use crate::validate::{validate_engine, ValidationResult};

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided path.
    CliArgument,

    /// `PYP_CONFIG` points directly at a file.
    Environment,

    /// Found under `PYP_CONFIG_DIR`.
    ConfigDir,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigDir => write!(f, "config dir"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "PYP_CONFIG";
pub const ENV_CONFIG_DIR: &str = "PYP_CONFIG_DIR";
pub const ENV_PRESET: &str = "PYP_PRESET";

const CONFIG_FILENAME: &str = "pyp.toml";
const APP_NAME: &str = "pyp";

/// A resolved config path and its provenance.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Find the configuration file to load.
///
/// A path that does not exist is skipped and the next source is tried.
pub fn resolve_config(cli_path: Option<&Path>) -> ResolvedConfig {
    if let Some(path) = cli_path {
        if path.exists() {
            return ResolvedConfig {
                path: Some(path.to_path_buf()),
                source: ConfigSource::CliArgument,
            };
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return ResolvedConfig {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(dir).join(CONFIG_FILENAME);
        if path.exists() {
            return ResolvedConfig {
                path: Some(path),
                source: ConfigSource::ConfigDir,
            };
        }
    }

    if let Some(path) = xdg_config_dir().map(|d| d.join(CONFIG_FILENAME)) {
        if path.exists() {
            return ResolvedConfig {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    ResolvedConfig::default()
}

/// Get the XDG config directory for the engine.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Resolve, load and validate the engine configuration.
///
/// With no file found, the `PYP_PRESET` preset (or the default preset) is
/// used.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<(EngineConfig, ResolvedConfig)> {
    let resolved = resolve_config(cli_path);
    let config = match &resolved.path {
        Some(path) => EngineConfig::from_file(path)?,
        None => {
            let preset = std::env::var(ENV_PRESET)
                .ok()
                .and_then(|s| PresetName::parse(&s))
                .unwrap_or(PresetName::Default);
            preset.config()
        }
    };
    validate_engine(&config)?;
    Ok((config, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::ConfigDir), "config dir");
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_missing_cli_path_is_skipped() {
        let resolved = resolve_config(Some(Path::new("/nonexistent/pyp.toml")));
        assert_ne!(resolved.source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(dir) = xdg_config_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }
}
