//! Global subscriber initialization.

use std::sync::OnceLock;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::spec::runtime::{LogFormat, LoggingConfig};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the fmt subscriber once per process.
///
/// `RUST_LOG` wins over `config.filter` when set. Returns `false` when
/// logging is disabled or a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }
    if TRACING_INITIALIZED.get().is_some() {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.with_target))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
    };

    if let Err(error) = result {
        tracing::debug!(error = %error, "Tracing subscriber already initialized");
        let _ = TRACING_INITIALIZED.set(());
        return false;
    }
    let _ = TRACING_INITIALIZED.set(());
    true
}
