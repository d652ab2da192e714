//! Query execution, result shaping and process-level tracing.

pub mod query;
pub mod render;
pub mod result;
pub mod tracing;

pub use query::{read_only_options, run_query};
pub use render::{render_table, summarize_rows, RenderLimits};
pub use result::QueryResult;
