//! Query result shape returned by the registry.

use arrow::json::writer::{JsonArray, WriterBuilder};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{EngineError, EngineResult};

/// Columns in projection order plus one JSON object per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    /// Convert collected batches into JSON rows. Nulls are kept explicitly so
    /// every row carries every column.
    pub fn from_batches(columns: Vec<String>, batches: &[RecordBatch]) -> EngineResult<Self> {
        let mut buf = Vec::new();
        {
            let mut writer = WriterBuilder::new()
                .with_explicit_nulls(true)
                .build::<_, JsonArray>(&mut buf);
            let refs: Vec<&RecordBatch> = batches.iter().collect();
            writer
                .write_batches(&refs)
                .map_err(|e| EngineError::Query(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| EngineError::Query(e.to_string()))?;
        }
        let rows = if buf.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&buf).map_err(|e| EngineError::Query(e.to_string()))?
        };
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, the usual shape of aggregate lookups.
    pub fn scalar(&self) -> Option<&Value> {
        let column = self.columns.first()?;
        self.rows.first()?.get(column)
    }
}
