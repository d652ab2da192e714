//! Read-only SQL execution against one session engine.

use std::time::Duration;

use datafusion::execution::context::SQLOptions;
use datafusion::prelude::SessionContext;

use super::result::QueryResult;
use crate::errors::{EngineError, EngineResult};

/// Statement policy for agent SQL: no DDL, no DML, no `SET`.
pub fn read_only_options() -> SQLOptions {
    SQLOptions::new()
        .with_allow_ddl(false)
        .with_allow_dml(false)
        .with_allow_statements(false)
}

/// Plan and collect `sql`, optionally bounded by `timeout`.
///
/// Name resolution happens entirely inside `ctx`, so a reference to a
/// namespace registered in some other session fails at planning time.
pub async fn run_query(
    ctx: &SessionContext,
    sql: &str,
    timeout: Option<Duration>,
) -> EngineResult<QueryResult> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, collect(ctx, sql))
            .await
            .map_err(|_| {
                EngineError::Query(format!(
                    "query exceeded the {} ms execution limit",
                    limit.as_millis()
                ))
            })?,
        None => collect(ctx, sql).await,
    }
}

async fn collect(ctx: &SessionContext, sql: &str) -> EngineResult<QueryResult> {
    let df = ctx
        .sql_with_options(sql, read_only_options())
        .await
        .map_err(EngineError::from_query_error)?;
    let columns = df
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect::<Vec<_>>();
    let batches = df.collect().await.map_err(EngineError::from_query_error)?;
    QueryResult::from_batches(columns, &batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::factory::SessionFactory;
    use crate::session::profiles::{EnvironmentClass, EnvironmentProfile};

    fn ctx() -> SessionContext {
        SessionFactory::new(EnvironmentProfile::from_class(EnvironmentClass::Small))
            .build_context("s_query")
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_literal() {
        let result = run_query(&ctx(), "SELECT 41 + 1 AS answer", None).await.unwrap();
        assert_eq!(result.columns, vec!["answer"]);
        assert_eq!(result.scalar(), Some(&serde_json::Value::from(42)));
    }

    #[tokio::test]
    async fn test_ddl_is_rejected() {
        let result = run_query(&ctx(), "CREATE TABLE t (a INT)", None).await;
        assert!(matches!(result, Err(EngineError::Query(_))));
    }

    #[tokio::test]
    async fn test_unknown_table_is_resolution_error() {
        let result = run_query(&ctx(), "SELECT * FROM s_other.sales", None).await;
        assert!(matches!(result, Err(EngineError::RelationNotFound(_))));
    }
}
