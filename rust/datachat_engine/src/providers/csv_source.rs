//! CSV parsing with Arrow schema inference.

use std::io::Cursor;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use super::loader::LoadedRelation;
use super::naming::{dedupe_headers, file_stem, sanitize_relation_name};
use crate::errors::{EngineError, EngineResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const BATCH_SIZE: usize = 8192;
/// Rows sampled for type inference.
const INFER_RECORDS: usize = 1000;

pub(crate) fn load_csv(bytes: &[u8], logical_name: &str) -> EngineResult<LoadedRelation> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let name = sanitize_relation_name(file_stem(logical_name), "table");

    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(bytes), Some(INFER_RECORDS))?;
    if inferred.fields().is_empty() {
        return Err(EngineError::Load(format!(
            "'{logical_name}' has no header row"
        )));
    }

    let names = dedupe_headers(inferred.fields().iter().map(|f| f.name().clone()).collect());
    let fields = inferred
        .fields()
        .iter()
        .zip(names)
        .map(|(field, name)| Field::new(name, field.data_type().clone(), true))
        .collect::<Vec<_>>();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(bytes))?;
    let batches = reader.collect::<Result<Vec<RecordBatch>, ArrowError>>()?;

    Ok(LoadedRelation {
        name,
        schema,
        batches,
    })
}
