//! Error taxonomy shared by the registry, loader and tool boundary.
//!
//! `CallDenied` is deliberately absent: a denied tool call is a normal
//! [`GateDecision`](crate::governor::GateDecision), not a fault.

use datafusion::arrow::error::ArrowError;
use datafusion_common::DataFusionError;
use thiserror::Error;

/// Default cap for error text handed back to the agent.
pub const DEFAULT_MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No live session handle exists for the id. Caller bug.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A query referenced a relation that is not registered in the session's catalog.
    #[error("relation not found: {0}")]
    RelationNotFound(String),

    /// A relation with this name is already registered in the catalog. Caller bug.
    #[error("relation '{relation}' already registered in catalog '{catalog}'")]
    NameCollision { catalog: String, relation: String },

    #[error("failed to load tabular source: {0}")]
    Load(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Usage errors indicate a bug in the calling collaborator and are
    /// surfaced as hard failures instead of agent-facing text.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            EngineError::SessionNotFound(_) | EngineError::NameCollision { .. }
        )
    }

    /// Classify a DataFusion error raised while planning or executing a query.
    ///
    /// Unresolvable table references become `RelationNotFound`; everything
    /// else is a `Query` error.
    pub fn from_query_error(error: DataFusionError) -> Self {
        let root = error.find_root();
        let is_resolution = match root {
            DataFusionError::Plan(message) => {
                message.contains("not found") || message.contains("failed to resolve")
            }
            DataFusionError::SchemaError(_, _) => {
                let text = root.to_string();
                text.contains("not found") && text.to_ascii_lowercase().contains("table")
            }
            _ => false,
        };
        if is_resolution {
            EngineError::RelationNotFound(root.to_string())
        } else {
            EngineError::Query(root.to_string())
        }
    }

    /// Bounded, human-readable rendering for the conversation.
    pub fn agent_message(&self, max_chars: usize) -> String {
        truncate_for_agent(&self.to_string(), max_chars)
    }
}

impl From<ArrowError> for EngineError {
    fn from(error: ArrowError) -> Self {
        EngineError::Load(error.to_string())
    }
}

impl From<calamine::Error> for EngineError {
    fn from(error: calamine::Error) -> Self {
        EngineError::Load(error.to_string())
    }
}

impl From<DataFusionError> for EngineError {
    fn from(error: DataFusionError) -> Self {
        EngineError::from_query_error(error)
    }
}

/// Truncate `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Cuts on a char boundary so multi-byte text (sheet names, CJK error
/// messages) never panics.
pub fn truncate_for_agent(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &trimmed[..byte_idx]),
        None => trimmed.to_string(),
    }
}
