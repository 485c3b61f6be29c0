//! Domain layer: pure models, error taxonomy, and port traits.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{ProviderError, ProviderErrorKind, SessionError};
