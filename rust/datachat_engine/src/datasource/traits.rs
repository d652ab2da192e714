//! Collaborator seams for live-database mode.
//!
//! Metadata persistence, secret handling and drivers belong to the host
//! service. The engine only sees these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::binding::DatasourceType;
use crate::errors::EngineResult;

/// A column the datasource owner has enabled for the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub field_type: String,
    /// Custom comment if set, otherwise the database comment.
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub columns: Vec<FieldMetadata>,
}

/// Everything the tools need to know about one datasource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceRecord {
    pub id: i64,
    pub datasource_type: DatasourceType,
    /// Only tables (and columns) the owner has enabled.
    pub tables: Vec<TableMetadata>,
    /// Diagram cells from the relationship editor, `Value::Null` when unset.
    #[serde(default)]
    pub table_relation: Value,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// `Ok(None)` when the datasource does not exist.
    async fn datasource(&self, datasource_id: i64) -> EngineResult<Option<DatasourceRecord>>;
}

pub trait ConfigCipher: Send + Sync {
    /// Decrypt stored connection settings. Failures map to `Config`.
    fn decrypt(&self, encrypted: &str) -> EngineResult<Value>;
}

#[async_trait]
pub trait LiveQueryExecutor: Send + Sync {
    /// Run `sql` against the external database and return rows as JSON
    /// objects in column order. Unreachable hosts map to `Connection`,
    /// rejected statements to `Query`.
    async fn execute(
        &self,
        datasource_type: &DatasourceType,
        config: &Value,
        sql: &str,
    ) -> EngineResult<Vec<Map<String, Value>>>;
}
