//! Engine configuration.

pub mod runtime;

pub use runtime::{EngineConfig, GovernorConfig, LogFormat, LoggingConfig, RegistryConfig};
