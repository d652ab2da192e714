//! Tools over the session's uploaded spreadsheets and CSV files.

use std::fmt::Write as _;
use std::sync::Arc;

use super::{split_names, GovernedCall, ToolContext};
use crate::errors::EngineResult;
use crate::executor::{summarize_rows, RenderLimits};
use crate::governor::ToolCallGovernor;
use crate::session::SessionRegistry;

pub const LIST_RELATIONS: &str = "list_relations";
pub const DESCRIBE_RELATIONS: &str = "describe_relations";
pub const QUERY: &str = "query";

pub struct TabularTools {
    registry: Arc<SessionRegistry>,
    governor: Arc<ToolCallGovernor>,
    limits: RenderLimits,
}

impl TabularTools {
    pub fn new(registry: Arc<SessionRegistry>, governor: Arc<ToolCallGovernor>) -> Self {
        Self {
            registry,
            governor,
            limits: RenderLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RenderLimits) -> Self {
        self.limits = limits;
        self
    }

    fn max_error_chars(&self) -> usize {
        self.registry.config().max_error_chars
    }

    /// Qualified names of every relation in the session's catalog.
    pub async fn list_relations(&self, ctx: &ToolContext) -> EngineResult<String> {
        let call = GovernedCall::new(&self.governor, &ctx.session_id, LIST_RELATIONS, None);
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        let Some(handle) = self.registry.get(&ctx.session_id) else {
            return call.succeed("No files have been uploaded in this conversation.".to_string());
        };
        let relations = match self.registry.relations(&ctx.session_id).await {
            Ok(relations) => relations,
            Err(error) => return call.fail_with(error, |e| e.agent_message(self.max_error_chars())),
        };
        if relations.is_empty() {
            return call.succeed("No files have been uploaded in this conversation.".to_string());
        }

        let catalog = handle.catalog_name();
        let mut out = format!("Relations available in catalog {catalog}:\n");
        for (name, meta) in &relations {
            let _ = writeln!(
                out,
                "- {catalog}.{name} ({} rows, {} columns)",
                meta.row_count, meta.column_count
            );
        }
        out.push_str("\nUse describe_relations for column details.");
        call.succeed(out)
    }

    /// Column names and types for a comma-separated list of relations.
    pub async fn describe_relations(&self, ctx: &ToolContext, names: &str) -> EngineResult<String> {
        let call = GovernedCall::new(&self.governor, &ctx.session_id, DESCRIBE_RELATIONS, Some(names));
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        if self.registry.get(&ctx.session_id).is_none() {
            return call.fail("No files have been uploaded in this conversation.".to_string());
        }
        let relations = match self.registry.relations(&ctx.session_id).await {
            Ok(relations) => relations,
            Err(error) => return call.fail_with(error, |e| e.agent_message(self.max_error_chars())),
        };
        let requested = split_names(names);
        if requested.is_empty() {
            return call.fail("No relation names given.".to_string());
        }

        let mut found_any = false;
        let mut out = String::new();
        for name in &requested {
            // Accept both `relation` and `<catalog>.relation`.
            let bare = name.rsplit('.').next().unwrap_or(name);
            let Some(meta) = relations.get(bare) else {
                let _ = writeln!(out, "Relation '{name}' does not exist.");
                continue;
            };
            found_any = true;
            let _ = writeln!(out, "\nRelation '{bare}' ({} rows):", meta.row_count);
            for column in &meta.columns {
                let nullable = if column.nullable { "" } else { ", not null" };
                let _ = writeln!(out, "  - {} ({}{nullable})", column.name, column.data_type);
            }
        }

        if found_any {
            out.push_str("\nSchema retrieved. Write the query from this schema without fetching it again.");
            call.succeed(out)
        } else {
            call.fail(out)
        }
    }

    /// Run read-only SQL against the session's catalog.
    pub async fn query(&self, ctx: &ToolContext, sql: &str) -> EngineResult<String> {
        let call = GovernedCall::new(&self.governor, &ctx.session_id, QUERY, Some(sql));
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        match self.registry.execute(&ctx.session_id, sql).await {
            Ok(result) => call.succeed(summarize_rows(&result.columns, &result.rows, self.limits)),
            Err(error) => call.fail_with(error, |e| {
                format!(
                    "SQL failed: {}\n\nCheck the SQL against the relation schemas.",
                    e.agent_message(self.max_error_chars())
                )
            }),
        }
    }
}
