//! Gating policies evaluated before every tool invocation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::ledger::{CallLedger, LedgerSnapshot};
use crate::spec::runtime::GovernorConfig;

/// Which policy denied a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    BudgetExhausted,
    ConsecutiveFailures,
    DuplicateSuccess,
}

/// Outcome of [`ToolCallGovernor::check_before_call`]. A denial is a normal
/// return value carrying guidance for the agent, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub allowed: bool,
    /// Empty when allowed.
    pub reason: String,
    pub denial: Option<DenialReason>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
            denial: None,
        }
    }

    fn deny(denial: DenialReason, reason: String) -> Self {
        Self {
            allowed: false,
            reason,
            denial: Some(denial),
        }
    }
}

/// Per-session call budget, failure cutoff and duplicate suppression.
///
/// Ledgers live in a map keyed by session id; each ledger has its own lock so
/// sessions never contend beyond the brief map lookup.
pub struct ToolCallGovernor {
    config: GovernorConfig,
    ledgers: Mutex<HashMap<String, Arc<Mutex<CallLedger>>>>,
}

impl ToolCallGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Evaluate the policies in order; the first violation wins.
    ///
    /// 1. call budget
    /// 2. consecutive failures of `tool_name`
    /// 3. `(tool_name, query)` already succeeded
    ///
    /// A session with no recorded calls is always allowed and does not get a
    /// ledger until its first [`record_call`](Self::record_call).
    pub fn check_before_call(
        &self,
        session_id: &str,
        tool_name: &str,
        query: Option<&str>,
    ) -> GateDecision {
        let Some(ledger) = self.ledger(session_id) else {
            return GateDecision::allow();
        };
        let ledger = ledger.lock();

        let max_calls = self.config.max_calls_per_session;
        if ledger.total_calls() >= max_calls {
            tracing::warn!(session_id, tool = tool_name, max_calls, "Tool call budget exhausted");
            return GateDecision::deny(
                DenialReason::BudgetExhausted,
                format!(
                    "Tool call limit reached: {max_calls} calls already made in this session. \
                     Stop calling tools and answer with the information gathered so far."
                ),
            );
        }

        let limit = self.config.consecutive_failure_limit;
        let failures = ledger.consecutive_failures(tool_name);
        if failures >= limit {
            tracing::warn!(session_id, tool = tool_name, failures, "Consecutive failure cutoff tripped");
            return GateDecision::deny(
                DenialReason::ConsecutiveFailures,
                format!(
                    "Tool '{tool_name}' has failed {failures} times in a row in this session. \
                     Do not retry it; review the earlier error messages and explain the problem \
                     or answer with what is already known."
                ),
            );
        }

        if ledger.has_succeeded(tool_name, query) {
            tracing::info!(session_id, tool = tool_name, "Suppressed duplicate tool call");
            return GateDecision::deny(
                DenialReason::DuplicateSuccess,
                format!(
                    "This '{tool_name}' call already succeeded earlier in this session with the \
                     same input. Reuse that result instead of repeating the call."
                ),
            );
        }

        GateDecision::allow()
    }

    /// Record the outcome of a call, creating the session's ledger on first use.
    pub fn record_call(&self, session_id: &str, tool_name: &str, success: bool, query: Option<&str>) {
        let ledger = {
            let mut ledgers = self.ledgers.lock();
            ledgers
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(CallLedger::new(self.config.ledger_capacity))))
                .clone()
        };
        let mut ledger = ledger.lock();
        ledger.record(tool_name, success, query);
        tracing::debug!(
            session_id,
            tool = tool_name,
            success,
            total_calls = ledger.total_calls(),
            "Recorded tool call"
        );
    }

    /// Drop the session's ledger. Returns `false` if none existed.
    pub fn close(&self, session_id: &str) -> bool {
        self.ledgers.lock().remove(session_id).is_some()
    }

    /// Session ids that currently hold a ledger, sorted.
    pub fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ledgers.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self, session_id: &str) -> Option<LedgerSnapshot> {
        self.ledger(session_id).map(|ledger| ledger.lock().snapshot())
    }

    fn ledger(&self, session_id: &str) -> Option<Arc<Mutex<CallLedger>>> {
        self.ledgers.lock().get(session_id).cloned()
    }
}

impl Default for ToolCallGovernor {
    fn default() -> Self {
        Self::new(GovernorConfig::default())
    }
}
