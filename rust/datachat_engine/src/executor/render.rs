//! Plain-text table rendering for tool output.

use serde_json::{Map, Value};

const MAX_SEPARATOR_WIDTH: usize = 200;

/// Bounds applied when rendering rows back into the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    pub max_rows: usize,
    pub max_cell_width: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_rows: 50,
            max_cell_width: 50,
        }
    }
}

/// Render `rows` as a ` | ` separated table with a dashed rule under the header.
///
/// Only the first `limits.max_rows` rows are rendered and every cell is cut
/// to `limits.max_cell_width` chars. Missing keys render as empty cells.
pub fn render_table(columns: &[String], rows: &[Map<String, Value>], limits: RenderLimits) -> String {
    let shown = &rows[..rows.len().min(limits.max_rows)];
    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| clip(&cell_text(row.get(col)), limits.max_cell_width))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let widest_cell = cells
                .iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0);
            col.chars().count().max(widest_cell).min(limits.max_cell_width)
        })
        .collect();

    let header = join_padded(columns.iter().map(String::as_str), &widths);
    let mut out = String::new();
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count().min(MAX_SEPARATOR_WIDTH)));
    out.push('\n');
    for row in &cells {
        out.push_str(&join_padded(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

/// Full agent-facing text for a row set: row count line, table, closing note.
pub fn summarize_rows(columns: &[String], rows: &[Map<String, Value>], limits: RenderLimits) -> String {
    if rows.is_empty() {
        return "Query succeeded but returned no rows.".to_string();
    }
    let mut out = if rows.len() > limits.max_rows {
        format!(
            "Query returned {} rows (showing the first {}):\n\n",
            rows.len(),
            limits.max_rows
        )
    } else {
        format!("Query returned {} rows:\n\n", rows.len())
    };
    out.push_str(&render_table(columns, rows, limits));
    out.push_str("\nQuery complete. Work from the rows above instead of re-running the same query.");
    out
}

/// Display text of a JSON cell; strings are shown without quotes.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_render_pads_columns() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![row(json!({"id": 1, "name": "alice"})), row(json!({"id": 22, "name": null}))];
        let text = render_table(&columns, &rows, RenderLimits::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id | name ");
        assert_eq!(lines[1], "----------");
        assert_eq!(lines[2], "1  | alice");
        assert_eq!(lines[3], "22 | NULL ");
    }

    #[test]
    fn test_summarize_reports_truncation() {
        let columns = vec!["n".to_string()];
        let rows: Vec<_> = (0..60).map(|i| row(json!({"n": i}))).collect();
        let text = summarize_rows(&columns, &rows, RenderLimits::default());
        assert!(text.starts_with("Query returned 60 rows (showing the first 50)"));
        assert!(summarize_rows(&columns, &[], RenderLimits::default()).contains("no rows"));
    }

    #[test]
    fn test_render_limits_rows_and_width() {
        let columns = vec!["v".to_string()];
        let rows: Vec<_> = (0..10)
            .map(|_| row(json!({"v": "x".repeat(80)})))
            .collect();
        let limits = RenderLimits {
            max_rows: 3,
            max_cell_width: 5,
        };
        let text = render_table(&columns, &rows, limits);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + 3);
        assert_eq!(lines[2], "xxxxx");
    }
}
