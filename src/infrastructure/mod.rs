//! Infrastructure layer: configuration loading, logging setup, and the
//! deterministic generator adapters.

pub mod config;
pub mod generators;
pub mod logging;

pub use config::{ConfigError, ConfigLoader};
pub use generators::{DemoGenerator, ScriptedGenerator};
pub use logging::Logging;
