//! Relation metadata computed eagerly at registration time.
//!
//! Provides helpers for:
//! - Schema hashing (BLAKE3) so re-uploads of identical layouts are recognisable
//! - Building `RelationMeta` (row/column counts and column schema) from batches

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// One column of a registered relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Arrow type rendered with its `Display` form, e.g. `Int64`, `Utf8`.
    pub data_type: String,
    pub nullable: bool,
}

/// Shape of a registered relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMeta {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnMeta>,
    pub schema_hash: [u8; 32],
}

impl RelationMeta {
    /// Compute metadata from a schema and the batches that will back the relation.
    pub fn from_batches(schema: &Schema, batches: &[RecordBatch]) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|field| ColumnMeta {
                name: field.name().clone(),
                data_type: field.data_type().to_string(),
                nullable: field.is_nullable(),
            })
            .collect::<Vec<_>>();
        Self {
            row_count: batches.iter().map(RecordBatch::num_rows).sum(),
            column_count: columns.len(),
            columns,
            schema_hash: hash_arrow_schema(schema),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Compute a BLAKE3 hash of an Arrow schema.
///
/// The hash includes field names, data types, and nullability flags.
/// Field order is significant - reordering fields produces a different hash.
///
/// # Example
///
/// ```
/// use arrow::datatypes::{Schema, Field, DataType};
/// use datachat_engine::schema::introspection::hash_arrow_schema;
///
/// let schema = Schema::new(vec![
///     Field::new("id", DataType::Int64, false),
///     Field::new("name", DataType::Utf8, true),
/// ]);
///
/// let hash = hash_arrow_schema(&schema);
/// assert_eq!(hash.len(), 32);
/// ```
pub fn hash_arrow_schema(schema: &Schema) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(schema.fields().len() as u32).to_le_bytes());
    for field in schema.fields() {
        hasher.update(field.name().as_bytes());
        hasher.update(&[0]);
        hasher.update(format!("{:?}", field.data_type()).as_bytes());
        hasher.update(&[field.is_nullable() as u8]);
    }
    *hasher.finalize().as_bytes()
}
