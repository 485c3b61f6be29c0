//! Configuration loading (figment: defaults → YAML → environment).

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
