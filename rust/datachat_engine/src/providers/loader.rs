//! Tabular Source Loader: uploaded bytes -> named Arrow relations.
//!
//! Parsing is synchronous and CPU bound; the registry runs it on a blocking
//! thread before touching any session state.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::{csv_source, spreadsheet};
use crate::errors::{EngineError, EngineResult};
use crate::schema::RelationMeta;

/// Kind of uploaded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Spreadsheet,
    Csv,
}

impl SourceKind {
    /// Infer the kind from an upload's file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Spreadsheet),
            "csv" => Some(SourceKind::Csv),
            _ => None,
        }
    }
}

/// A parsed relation ready for registration.
#[derive(Debug, Clone)]
pub struct LoadedRelation {
    pub name: String,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl LoadedRelation {
    pub fn meta(&self) -> RelationMeta {
        RelationMeta::from_batches(&self.schema, &self.batches)
    }
}

/// Parse an upload into relations, in source order.
///
/// A spreadsheet yields one relation per sheet; a CSV yields exactly one,
/// named after the upload's file stem.
pub fn load_relations(
    bytes: &[u8],
    logical_name: &str,
    kind: SourceKind,
) -> EngineResult<Vec<LoadedRelation>> {
    if bytes.is_empty() {
        return Err(EngineError::Load(format!("'{logical_name}' is empty")));
    }
    let relations = match kind {
        SourceKind::Csv => vec![csv_source::load_csv(bytes, logical_name)?],
        SourceKind::Spreadsheet => spreadsheet::load_workbook(bytes)?,
    };
    tracing::debug!(
        source = logical_name,
        ?kind,
        relations = relations.len(),
        "Parsed tabular source"
    );
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(SourceKind::from_file_name("a.XLSX"), Some(SourceKind::Spreadsheet));
        assert_eq!(SourceKind::from_file_name("销售数据.csv"), Some(SourceKind::Csv));
        assert_eq!(SourceKind::from_file_name("notes.txt"), None);
        assert_eq!(SourceKind::from_file_name("no_extension"), None);
    }

    #[test]
    fn test_empty_upload_is_load_error() {
        let result = load_relations(&[], "empty.csv", SourceKind::Csv);
        assert!(matches!(result, Err(EngineError::Load(_))));
    }

    #[test]
    fn test_garbage_spreadsheet_is_load_error() {
        let result = load_relations(b"definitely not a zip", "x.xlsx", SourceKind::Spreadsheet);
        assert!(matches!(result, Err(EngineError::Load(_))));
    }
}
