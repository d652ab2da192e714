//! Per-session call history and the aggregates the policies read.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::normalize::{call_hash, normalize_query};

/// One governed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    pub tool_name: String,
    pub normalized_query: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// Bounded history plus running aggregates for one session.
///
/// Aggregates are kept independently of the ring buffer, so evicting old
/// records never resets the budget or forgets a successful call.
#[derive(Debug)]
pub struct CallLedger {
    capacity: usize,
    records: VecDeque<CallRecord>,
    total_calls: u32,
    consecutive_failures: HashMap<String, u32>,
    successful_hashes: HashSet<[u8; 32]>,
}

impl CallLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
            total_calls: 0,
            consecutive_failures: HashMap::new(),
            successful_hashes: HashSet::new(),
        }
    }

    pub fn record(&mut self, tool_name: &str, success: bool, query: Option<&str>) {
        self.record_at(tool_name, success, query, Utc::now());
    }

    /// Append a record stamped `at`. Timestamps never go backwards: a stamp
    /// older than the newest record is raised to match it.
    pub fn record_at(
        &mut self,
        tool_name: &str,
        success: bool,
        query: Option<&str>,
        at: DateTime<Utc>,
    ) {
        let normalized = query.map(normalize_query);
        let timestamp = match self.records.back() {
            Some(last) if last.timestamp > at => last.timestamp,
            _ => at,
        };

        self.total_calls = self.total_calls.saturating_add(1);
        if success {
            self.consecutive_failures.insert(tool_name.to_string(), 0);
            self.successful_hashes
                .insert(call_hash(tool_name, normalized.as_deref()));
        } else {
            let failures = self
                .consecutive_failures
                .entry(tool_name.to_string())
                .or_insert(0);
            *failures = failures.saturating_add(1);
        }

        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(CallRecord {
            tool_name: tool_name.to_string(),
            normalized_query: normalized,
            timestamp,
            success,
        });
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls
    }

    pub fn consecutive_failures(&self, tool_name: &str) -> u32 {
        self.consecutive_failures.get(tool_name).copied().unwrap_or(0)
    }

    /// Whether the `(tool, query)` pair already succeeded in this session.
    pub fn has_succeeded(&self, tool_name: &str, query: Option<&str>) -> bool {
        let normalized = query.map(normalize_query);
        self.successful_hashes
            .contains(&call_hash(tool_name, normalized.as_deref()))
    }

    pub fn records(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut consecutive_failures: Vec<(String, u32)> = self
            .consecutive_failures
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(tool, count)| (tool.clone(), *count))
            .collect();
        consecutive_failures.sort();
        LedgerSnapshot {
            total_calls: self.total_calls,
            successful_calls: self.successful_hashes.len(),
            consecutive_failures,
            recent: self.records.iter().cloned().collect(),
        }
    }
}

/// Point-in-time copy of a ledger for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub total_calls: u32,
    /// Distinct successful `(tool, query)` pairs.
    pub successful_calls: usize,
    /// Tools with a non-zero failure streak, sorted by name.
    pub consecutive_failures: Vec<(String, u32)>,
    /// Retained records, oldest first.
    pub recent: Vec<CallRecord>,
}
