//! Structured logging for the engine.
//!
//! All output goes to stderr, either human-readable or as JSON lines. Events
//! carry an `event` field from [`event_names`] and, where relevant, a
//! [`Stage`].
//!
//! ```ignore
//! use pyp_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn filter_for(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy()
}

/// Install the global stderr subscriber.
///
/// A second call (or a subscriber installed elsewhere) is left in place and
/// the call returns `false`.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = filter_for(config);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Jsonl => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(std::io::stderr)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_current_span(false);
            registry.with(layer).try_init()
        }
    };
    installed.is_ok()
}

/// Install the subscriber from environment settings alone.
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env(None, None))
}

/// Unique id for one run: `run-` plus 12 hex characters.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}
