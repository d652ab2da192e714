//! Tool boundary.
//!
//! Each tool runs the same sequence: governor check, work, record, string.
//! Recoverable failures come back as `Ok` text the agent can read; usage
//! errors (`SessionNotFound`, `NameCollision`) and a missing datasource
//! binding come back as `Err` for the caller.

pub mod context;
pub mod datasource_tools;
pub mod tabular;

use crate::errors::{EngineError, EngineResult};
use crate::governor::ToolCallGovernor;

pub use context::ToolContext;
pub use datasource_tools::DatasourceTools;
pub use tabular::TabularTools;

/// One governed invocation of a tool.
pub(crate) struct GovernedCall<'a> {
    governor: &'a ToolCallGovernor,
    session_id: &'a str,
    tool: &'static str,
    query: Option<&'a str>,
}

impl<'a> GovernedCall<'a> {
    pub(crate) fn new(
        governor: &'a ToolCallGovernor,
        session_id: &'a str,
        tool: &'static str,
        query: Option<&'a str>,
    ) -> Self {
        Self {
            governor,
            session_id,
            tool,
            query,
        }
    }

    /// `Some(reason)` when the governor denies the call.
    pub(crate) fn denied(&self) -> Option<String> {
        let decision = self
            .governor
            .check_before_call(self.session_id, self.tool, self.query);
        (!decision.allowed).then_some(decision.reason)
    }

    pub(crate) fn succeed(&self, output: String) -> EngineResult<String> {
        self.governor
            .record_call(self.session_id, self.tool, true, self.query);
        Ok(output)
    }

    /// Record a failure with agent-facing text.
    pub(crate) fn fail(&self, message: String) -> EngineResult<String> {
        self.governor
            .record_call(self.session_id, self.tool, false, self.query);
        Ok(message)
    }

    /// Usage errors propagate without touching the ledger; anything else is
    /// recorded as a failure and rendered through `render`.
    pub(crate) fn fail_with(
        &self,
        error: EngineError,
        render: impl FnOnce(&EngineError) -> String,
    ) -> EngineResult<String> {
        if error.is_usage_error() {
            return Err(error);
        }
        tracing::warn!(
            session_id = self.session_id,
            tool = self.tool,
            error = %error,
            "Tool call failed"
        );
        self.fail(render(&error))
    }
}

/// Split a comma-separated name list, dropping blanks.
pub(crate) fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
