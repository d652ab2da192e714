//! Workbook parsing: every sheet becomes one relation.
//!
//! The first row of a sheet is its header. Column types are inferred from
//! the non-empty cells below it.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Reader};
use chrono::{NaiveDateTime, Timelike};

use super::loader::LoadedRelation;
use super::naming::{dedupe_headers, dedupe_relation_names, sanitize_relation_name};
use crate::errors::EngineResult;

static EMPTY_CELL: Data = Data::Empty;

pub(crate) fn load_workbook(bytes: &[u8]) -> EngineResult<Vec<LoadedRelation>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet_names = workbook.sheet_names();

    let relation_names = dedupe_relation_names(
        sheet_names
            .iter()
            .enumerate()
            .map(|(idx, sheet)| sanitize_relation_name(sheet, &format!("sheet_{}", idx + 1)))
            .collect(),
    );

    let mut relations = Vec::with_capacity(sheet_names.len());
    for (sheet_name, name) in sheet_names.iter().zip(relation_names) {
        let range = workbook.worksheet_range(sheet_name)?;
        let rows: Vec<&[Data]> = range.rows().collect();
        relations.push(sheet_to_relation(name, &rows)?);
    }
    Ok(relations)
}

fn sheet_to_relation(name: String, rows: &[&[Data]]) -> EngineResult<LoadedRelation> {
    let Some((header, body)) = rows.split_first() else {
        tracing::warn!(relation = %name, "Sheet is empty; registering a relation without columns");
        return Ok(LoadedRelation {
            name,
            schema: Arc::new(Schema::empty()),
            batches: Vec::new(),
        });
    };

    let headers = dedupe_headers(header.iter().map(cell_to_header).collect());
    let body: Vec<&[Data]> = body
        .iter()
        .copied()
        .filter(|row| !row.iter().all(is_blank))
        .collect();

    let mut fields = Vec::with_capacity(headers.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.into_iter().enumerate() {
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(col_idx).unwrap_or(&EMPTY_CELL))
            .collect();
        let kind = infer_column(&cells);
        fields.push(Field::new(header, kind.data_type(), true));
        columns.push(build_column(kind, &cells));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    Ok(LoadedRelation {
        name,
        schema,
        batches: vec![batch],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Text => DataType::Utf8,
        }
    }
}

fn infer_column(cells: &[&Data]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for cell in cells.iter().copied().filter(|c| !is_blank(c)) {
        let cell_kind = match cell {
            Data::Int(_) => ColumnKind::Int,
            Data::Float(f) if is_integral(*f) => ColumnKind::Int,
            Data::Float(_) => ColumnKind::Float,
            Data::Bool(_) => ColumnKind::Bool,
            Data::Error(_) => continue,
            _ => ColumnKind::Text,
        };
        kind = Some(match (kind, cell_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn build_column(kind: ColumnKind, cells: &[&Data]) -> ArrayRef {
    match kind {
        ColumnKind::Int => {
            let mut builder = Int64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Data::Int(i) => builder.append_value(*i),
                    Data::Float(f) => builder.append_value(*f as i64),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float => {
            let mut builder = Float64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Data::Int(i) => builder.append_value(*i as f64),
                    Data::Float(f) => builder.append_value(*f),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Bool => {
            let mut builder = BooleanBuilder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Data::Bool(b) => builder.append_value(*b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Text => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                match cell_to_text(cell) {
                    Some(text) => builder.append_value(text),
                    None => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() < 9.0e15
}

fn cell_to_header(cell: &Data) -> String {
    cell_to_text(cell).unwrap_or_default()
}

fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::DateTime(_) => cell.as_datetime().map(format_datetime),
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    if value.hour() == 0 && value.minute() == 0 && value.second() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
