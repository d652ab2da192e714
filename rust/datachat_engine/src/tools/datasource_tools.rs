//! Tools over a live external database bound to the conversation.

use std::fmt::Write as _;
use std::sync::Arc;

use super::{split_names, GovernedCall, ToolContext};
use crate::datasource::{
    ensure_read_only, hint_for_error, parse_relationships, structural_warnings, ConfigCipher,
    DatasourceRecord, ExternalDatasourceBinding, LiveQueryExecutor, MetadataStore,
};
use crate::errors::{truncate_for_agent, EngineError, EngineResult};
use crate::executor::{summarize_rows, RenderLimits};
use crate::governor::ToolCallGovernor;

pub const LIST_TABLES: &str = "list_tables";
pub const TABLE_SCHEMA: &str = "table_schema";
pub const QUERY: &str = "sql_query";
pub const CHECK_QUERY: &str = "check_query";
pub const TABLE_RELATIONSHIPS: &str = "table_relationships";

pub struct DatasourceTools {
    governor: Arc<ToolCallGovernor>,
    metadata: Arc<dyn MetadataStore>,
    cipher: Arc<dyn ConfigCipher>,
    executor: Arc<dyn LiveQueryExecutor>,
    limits: RenderLimits,
    max_error_chars: usize,
}

impl DatasourceTools {
    /// `max_error_chars` caps database error text handed back to the agent;
    /// pass `RegistryConfig::max_error_chars` so both tool sets agree.
    pub fn new(
        governor: Arc<ToolCallGovernor>,
        metadata: Arc<dyn MetadataStore>,
        cipher: Arc<dyn ConfigCipher>,
        executor: Arc<dyn LiveQueryExecutor>,
        max_error_chars: usize,
    ) -> Self {
        Self {
            governor,
            metadata,
            cipher,
            executor,
            limits: RenderLimits::default(),
            max_error_chars,
        }
    }

    pub fn with_limits(mut self, limits: RenderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn list_tables(&self, ctx: &ToolContext) -> EngineResult<String> {
        let binding = binding(ctx)?;
        let call = GovernedCall::new(&self.governor, &ctx.session_id, LIST_TABLES, None);
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        let record = match self.record(binding).await {
            Ok(record) => record,
            Err(error) => return call.fail_with(error, |e| self.failure("listing tables failed", e)),
        };
        if record.tables.is_empty() {
            return call.succeed("The datasource has no tables enabled.".to_string());
        }

        let mut out = String::from("The datasource has these tables:\n\n");
        for table in &record.tables {
            match non_blank(table.comment.as_deref()) {
                Some(comment) => {
                    let _ = writeln!(out, "- {}: {comment}", table.name);
                }
                None => {
                    let _ = writeln!(out, "- {}", table.name);
                }
            }
        }
        out.push_str("\nTable list retrieved. Use table_schema for column details.");
        call.succeed(out)
    }

    /// Columns of a comma-separated list of tables.
    pub async fn table_schema(&self, ctx: &ToolContext, table_names: &str) -> EngineResult<String> {
        let binding = binding(ctx)?;
        let call = GovernedCall::new(&self.governor, &ctx.session_id, TABLE_SCHEMA, Some(table_names));
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        let record = match self.record(binding).await {
            Ok(record) => record,
            Err(error) => return call.fail_with(error, |e| self.failure("reading table schema failed", e)),
        };

        let mut parts = Vec::new();
        for name in split_names(table_names) {
            let Some(table) = record.tables.iter().find(|t| t.name == name) else {
                parts.push(format!("Table '{name}' does not exist."));
                continue;
            };
            let mut text = format!("\nTable '{}':", table.name);
            if let Some(comment) = non_blank(table.comment.as_deref()) {
                let _ = write!(text, "\nComment: {comment}");
            }
            text.push_str("\nColumns:");
            for column in &table.columns {
                let _ = write!(text, "\n  - {} ({})", column.name, column.field_type);
                if let Some(comment) = non_blank(column.comment.as_deref()) {
                    let _ = write!(text, " - {comment}");
                }
            }
            parts.push(text);
        }

        let mut out = if parts.is_empty() {
            "No table information found.".to_string()
        } else {
            parts.join("\n")
        };
        out.push_str("\n\nSchema retrieved. Write the query from this schema without fetching it again.");
        call.succeed(out)
    }

    /// Run read-only SQL on the external database.
    pub async fn query(&self, ctx: &ToolContext, sql: &str) -> EngineResult<String> {
        let binding = binding(ctx)?;
        let call = GovernedCall::new(&self.governor, &ctx.session_id, QUERY, Some(sql));
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }
        if let Err(violation) = ensure_read_only(sql) {
            return call.fail(format!("Rejected: {violation}"));
        }

        tracing::info!(
            session_id = %ctx.session_id,
            datasource_id = binding.datasource_id,
            datasource_type = %binding.datasource_type,
            sql = %truncate_for_agent(sql, 500),
            "Executing live query"
        );
        let rows = match self.run_live(binding, sql).await {
            Ok(rows) => rows,
            Err(error) => {
                return call.fail_with(error, |e| {
                    let raw = match e {
                        EngineError::Query(text) | EngineError::Connection(text) => text.as_str(),
                        _ => "",
                    };
                    hint_for_error(raw, sql).unwrap_or_else(|| {
                        format!(
                            "SQL failed: {}\n\nCheck the SQL syntax and the table schema. \
                             Reuse schema information you already have.",
                            e.agent_message(self.max_error_chars)
                        )
                    })
                })
            }
        };

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        call.succeed(summarize_rows(&columns, &rows, self.limits))
    }

    /// Screen SQL without running it.
    pub async fn check_query(&self, ctx: &ToolContext, sql: &str) -> EngineResult<String> {
        binding(ctx)?;
        let call = GovernedCall::new(&self.governor, &ctx.session_id, CHECK_QUERY, Some(sql));
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }
        if let Err(violation) = ensure_read_only(sql) {
            return call.fail(format!("Rejected: {violation}"));
        }
        let warnings = structural_warnings(sql);
        if warnings.is_empty() {
            call.succeed("SQL check passed; the query can be executed.".to_string())
        } else {
            call.succeed(format!("SQL warnings: {}", warnings.join(", ")))
        }
    }

    /// Configured join relationships, optionally limited to some tables.
    pub async fn table_relationships(
        &self,
        ctx: &ToolContext,
        table_names: &str,
    ) -> EngineResult<String> {
        let binding = binding(ctx)?;
        let filter = split_names(table_names);
        let key = (!filter.is_empty()).then_some(table_names);
        let call = GovernedCall::new(&self.governor, &ctx.session_id, TABLE_RELATIONSHIPS, key);
        if let Some(reason) = call.denied() {
            return Ok(reason);
        }

        let record = match self.record(binding).await {
            Ok(record) => record,
            Err(error) => {
                return call.fail_with(error, |e| self.failure("reading table relationships failed", e))
            }
        };
        let relationships =
            parse_relationships(&record.table_relation, &record.tables, Some(filter.as_slice()));

        if relationships.is_empty() {
            let text = if filter.is_empty() {
                "No table relationships are configured for this datasource.\n\n\
                 Foreign-key-like columns (such as xxx_id) may still suggest joins."
                    .to_string()
            } else {
                format!(
                    "No relationships configured between {}.\n\n\
                     Column names (such as customer_id and customers.id) may still suggest joins.",
                    filter.join(", ")
                )
            };
            return call.succeed(text);
        }

        let mut out = String::from("Table relationships:\n\n");
        for relationship in &relationships {
            let _ = writeln!(out, "  - {relationship}");
        }
        out.push_str("\nUse these relationships for JOIN conditions.");
        call.succeed(out)
    }

    async fn record(&self, binding: &ExternalDatasourceBinding) -> EngineResult<DatasourceRecord> {
        self.metadata
            .datasource(binding.datasource_id)
            .await?
            .ok_or_else(|| {
                EngineError::Connection(format!("datasource {} not found", binding.datasource_id))
            })
    }

    async fn run_live(
        &self,
        binding: &ExternalDatasourceBinding,
        sql: &str,
    ) -> EngineResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let config = self.cipher.decrypt(&binding.encrypted_config)?;
        self.executor
            .execute(&binding.datasource_type, &config, sql)
            .await
    }

    fn failure(&self, action: &str, error: &EngineError) -> String {
        format!("{action}: {}", error.agent_message(self.max_error_chars))
    }
}

fn binding(ctx: &ToolContext) -> EngineResult<&ExternalDatasourceBinding> {
    ctx.datasource.as_ref().ok_or_else(|| {
        EngineError::Config(format!(
            "tool context for session '{}' has no datasource binding",
            ctx.session_id
        ))
    })
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
