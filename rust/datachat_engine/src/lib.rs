//! DataChat session engine.
//!
//! Lets a conversational agent query uploaded spreadsheets and CSV files, or
//! a bound external database, while keeping it from looping on repeated or
//! failing tool calls.
//!
//! Design principles:
//! 1. One DataFusion SessionContext per conversation, never shared
//! 2. Relations live under a namespace derived from the session id
//! 3. Builder-first session construction via SessionStateBuilder
//! 4. Every tool call passes through the governor before and after it runs
//! 5. Registry and governor are joined only by the caller's session id

pub mod datasource;
pub mod errors;
pub mod executor;
pub mod governor;
pub mod providers;
pub mod schema;
pub mod session;
pub mod spec;
pub mod tools;

pub use errors::{EngineError, EngineResult};
pub use executor::tracing::init_tracing;
pub use executor::QueryResult;
pub use governor::{DenialReason, GateDecision, ToolCallGovernor};
pub use providers::SourceKind;
pub use schema::{ColumnMeta, RelationMeta};
pub use session::{SessionHandle, SessionRegistry};
pub use spec::EngineConfig;
pub use tools::{DatasourceTools, TabularTools, ToolContext};
