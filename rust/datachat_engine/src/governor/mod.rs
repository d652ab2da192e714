//! Tool-Call Governor.
//!
//! Every tool entry point calls [`ToolCallGovernor::check_before_call`]
//! before doing work and [`ToolCallGovernor::record_call`] afterwards. The
//! governor shares no state with the session registry; the two are joined
//! only by the session id the caller passes to both.

pub mod gate;
pub mod ledger;
pub mod normalize;

pub use gate::{DenialReason, GateDecision, ToolCallGovernor};
pub use ledger::{CallLedger, CallRecord, LedgerSnapshot};
pub use normalize::{call_hash, normalize_query};
