//! Join hints from the relationship diagram stored with a datasource.
//!
//! The diagram is a flat list of cells. Table nodes have shape `er-rect` or
//! `rect` and carry one port per column; edges have shape `edge` and connect
//! `(cell, port)` pairs. Cell ids are table ids and port ids are field ids.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::traits::TableMetadata;

/// Resolve diagram edges into `table.column = table.column` strings.
///
/// Edges whose tables or columns cannot be resolved are skipped. With a
/// non-empty `filter`, only edges touching at least one listed table are
/// kept. Output order follows the diagram, without duplicates.
pub fn parse_relationships(
    graph: &Value,
    tables: &[TableMetadata],
    filter: Option<&[String]>,
) -> Vec<String> {
    let Some(cells) = graph.as_array() else {
        return Vec::new();
    };

    let nodes: HashMap<String, &Value> = cells
        .iter()
        .filter(|cell| matches!(shape(cell), Some("er-rect" | "rect")))
        .filter_map(|cell| Some((id_text(cell.get("id")?)?, cell)))
        .collect();
    let table_names: HashMap<i64, &str> = tables.iter().map(|t| (t.id, t.name.as_str())).collect();
    let field_names: HashMap<i64, &str> = tables
        .iter()
        .flat_map(|t| t.columns.iter())
        .map(|f| (f.id, f.name.as_str()))
        .collect();
    let filter: Option<HashSet<&str>> = filter
        .filter(|names| !names.is_empty())
        .map(|names| names.iter().map(String::as_str).collect());

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for edge in cells.iter().filter(|cell| shape(cell) == Some("edge")) {
        let (Some(source), Some(target)) = (endpoint(edge, "source"), endpoint(edge, "target")) else {
            continue;
        };
        let (Some(source_table), Some(target_table)) = (
            table_for(&source.0, &table_names),
            table_for(&target.0, &table_names),
        ) else {
            continue;
        };
        if let Some(filter) = &filter {
            if !filter.contains(source_table) && !filter.contains(target_table) {
                continue;
            }
        }

        let source_field = field_name(&nodes, &field_names, &source.0, &source.1);
        let target_field = field_name(&nodes, &field_names, &target.0, &target.1);
        if source_field.is_empty() || target_field.is_empty() {
            continue;
        }

        let relation = format!("{source_table}.{source_field} = {target_table}.{target_field}");
        if seen.insert(relation.clone()) {
            out.push(relation);
        }
    }
    out
}

fn shape(cell: &Value) -> Option<&str> {
    cell.get("shape").and_then(Value::as_str)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `(cell id, port id)` of one edge end; a missing port becomes empty.
fn endpoint(edge: &Value, side: &str) -> Option<(String, String)> {
    let end = edge.get(side)?;
    let cell = id_text(end.get("cell")?)?;
    let port = end.get("port").and_then(id_text).unwrap_or_default();
    Some((cell, port))
}

fn table_for<'a>(cell_id: &str, table_names: &HashMap<i64, &'a str>) -> Option<&'a str> {
    let id = parse_numeric_id(cell_id)?;
    table_names.get(&id).copied()
}

fn parse_numeric_id(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Port label on the diagram node first; field metadata by id second.
fn field_name(
    nodes: &HashMap<String, &Value>,
    field_names: &HashMap<i64, &str>,
    cell_id: &str,
    port_id: &str,
) -> String {
    let port = nodes
        .get(cell_id)
        .and_then(|node| node.pointer("/ports/items"))
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .find(|item| item.get("id").and_then(id_text).as_deref() == Some(port_id))
        });
    if let Some(port) = port {
        return port
            .pointer("/attrs/portNameLabel/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    parse_numeric_id(port_id)
        .and_then(|id| field_names.get(&id))
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}
