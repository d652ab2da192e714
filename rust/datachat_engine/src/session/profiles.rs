//! Engine sizing profiles for per-session query engines.
//!
//! Every conversation owns its own engine, so these budgets are per session,
//! not per process.

use serde::{Deserialize, Serialize};

/// Sizing class for conversation engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentClass {
    /// A handful of small uploads per conversation.
    Small,
    /// Multi-sheet workbooks with tens of thousands of rows.
    Medium,
    /// Wide exports and joins across several large uploads.
    Large,
}

/// Per-session engine tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    pub class: EnvironmentClass,
    /// Number of target partitions for parallel execution
    pub target_partitions: u32,
    /// Batch size for Arrow record batches
    pub batch_size: u32,
    /// Memory pool size in bytes for one session engine
    pub memory_pool_bytes: u64,
}

impl EnvironmentProfile {
    /// Creates a profile from an environment class with default tuning parameters.
    pub fn from_class(class: EnvironmentClass) -> Self {
        match class {
            EnvironmentClass::Small => Self {
                class,
                target_partitions: 2,
                batch_size: 4096,
                memory_pool_bytes: 256 * 1024 * 1024, // 256 MB
            },
            EnvironmentClass::Medium => Self {
                class,
                target_partitions: 4,
                batch_size: 8192,
                memory_pool_bytes: 1024 * 1024 * 1024, // 1 GB
            },
            EnvironmentClass::Large => Self {
                class,
                target_partitions: 8,
                batch_size: 8192,
                memory_pool_bytes: 4 * 1024 * 1024 * 1024, // 4 GB
            },
        }
    }
}
