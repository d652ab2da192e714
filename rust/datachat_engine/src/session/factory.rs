//! Session factory for isolated per-conversation SessionContext construction.
//!
//! Uses SessionStateBuilder for builder-first session creation. Each
//! conversation gets its own RuntimeEnv, memory pool and catalog list, so
//! nothing registered in one session can be named from another.

use std::sync::Arc;

use datafusion::execution::context::SessionContext;
use datafusion::execution::memory_pool::FairSpillPool;
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use datafusion::execution::session_state::SessionStateBuilder;
use datafusion::prelude::SessionConfig;
use datafusion_common::Result;

use super::profiles::EnvironmentProfile;

/// Name of the single catalog inside every session engine.
pub const DEFAULT_CATALOG: &str = "chatdata";

/// Derive the catalog namespace for a session id.
///
/// `s_` followed by the first 32 hex chars of the BLAKE3 digest: stable for
/// a given id, a valid unquoted SQL identifier, and 128 bits wide so two
/// distinct ids do not share a namespace in practice.
pub fn catalog_namespace(session_id: &str) -> String {
    let digest = blake3::hash(session_id.as_bytes());
    let hex = digest.to_hex();
    format!("s_{}", &hex.as_str()[..32])
}

/// Factory for building isolated DataFusion sessions.
pub struct SessionFactory {
    profile: EnvironmentProfile,
}

impl SessionFactory {
    pub fn new(profile: EnvironmentProfile) -> Self {
        Self { profile }
    }

    /// Builds a SessionContext whose default schema is `namespace`.
    ///
    /// Construction order:
    /// 1. RuntimeEnv with a session-private memory pool
    /// 2. SessionConfig with the namespace as default schema
    /// 3. SessionState via SessionStateBuilder with default functions
    /// 4. SessionContext from state
    pub fn build_context(&self, namespace: &str) -> Result<SessionContext> {
        let pool_bytes = usize::try_from(self.profile.memory_pool_bytes).unwrap_or(usize::MAX);
        let runtime = RuntimeEnvBuilder::default()
            .with_memory_pool(Arc::new(FairSpillPool::new(pool_bytes)))
            .build_arc()?;

        let mut config = SessionConfig::new()
            .with_default_catalog_and_schema(DEFAULT_CATALOG, namespace)
            .with_create_default_catalog_and_schema(true)
            .with_information_schema(true)
            .with_target_partitions(self.profile.target_partitions as usize)
            .with_batch_size(self.profile.batch_size as usize);

        // Sheet names keep their case, so identifiers are matched verbatim.
        config.options_mut().sql_parser.enable_ident_normalization = false;

        let state = SessionStateBuilder::new()
            .with_config(config)
            .with_runtime_env(runtime)
            .with_default_features()
            .build();

        Ok(SessionContext::new_with_state(state))
    }
}
