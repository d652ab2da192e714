//! Runtime configuration for the registry, governor and logging.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult, DEFAULT_MAX_ERROR_CHARS};
use crate::session::profiles::EnvironmentClass;

/// Session Catalog Registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Sizing class for every per-session engine.
    #[serde(default = "default_profile")]
    pub profile: EnvironmentClass,
    /// Upper bound for a single query. `None` disables the bound.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    /// Cap for error text returned to the agent.
    #[serde(default = "default_max_error_chars")]
    pub max_error_chars: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            query_timeout_ms: None,
            max_error_chars: default_max_error_chars(),
        }
    }
}

/// Tool-Call Governor policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GovernorConfig {
    /// Calls allowed per session before the budget policy denies.
    #[serde(default = "default_max_calls_per_session")]
    pub max_calls_per_session: u32,
    /// Consecutive failures of one tool that trip the cutoff.
    #[serde(default = "default_consecutive_failure_limit")]
    pub consecutive_failure_limit: u32,
    /// Ring-buffer size of the per-session call history.
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_calls_per_session: default_max_calls_per_session(),
            consecutive_failure_limit: default_consecutive_failure_limit(),
            ledger_capacity: default_ledger_capacity(),
        }
    }
}

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logging control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filter: default_log_filter(),
            format: LogFormat::default(),
            with_target: false,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub governor: GovernorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.governor.max_calls_per_session == 0 {
            return Err(EngineError::Config(
                "governor.max_calls_per_session must be at least 1".to_string(),
            ));
        }
        if self.governor.consecutive_failure_limit == 0 {
            return Err(EngineError::Config(
                "governor.consecutive_failure_limit must be at least 1".to_string(),
            ));
        }
        if self.governor.ledger_capacity == 0 {
            return Err(EngineError::Config(
                "governor.ledger_capacity must be at least 1".to_string(),
            ));
        }
        if self.registry.query_timeout_ms == Some(0) {
            return Err(EngineError::Config(
                "registry.query_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_profile() -> EnvironmentClass {
    EnvironmentClass::Small
}

fn default_max_error_chars() -> usize {
    DEFAULT_MAX_ERROR_CHARS
}

fn default_max_calls_per_session() -> u32 {
    25
}

fn default_consecutive_failure_limit() -> u32 {
    3
}

fn default_ledger_capacity() -> usize {
    64
}

fn default_log_filter() -> String {
    "info,datafusion=warn".to_string()
}
