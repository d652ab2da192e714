//! Relation and column naming rules for uploaded sources.

use std::collections::HashSet;

/// Turn a sheet name or file stem into a relation name.
///
/// Unicode letters and digits are kept, every other run of characters
/// becomes a single `_`. Leading/trailing underscores are dropped and a
/// leading digit gets a `t_` prefix. Returns `fallback` when nothing is left.
pub fn sanitize_relation_name(raw: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_underscore = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_underscore && !out.is_empty() {
                out.push('_');
            }
            pending_underscore = false;
            out.push(ch);
        } else {
            pending_underscore = true;
        }
    }
    if out.is_empty() {
        return fallback.to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert_str(0, "t_");
    }
    out
}

/// Strip directory components and the final extension from an upload name.
pub fn file_stem(logical_name: &str) -> &str {
    let base = logical_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(logical_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

/// Make header names unique and non-empty, in column order.
///
/// Blank headers become `column_N` (1-based); repeats get `_2`, `_3`, ...
pub fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = match name.trim() {
                "" => format!("column_{}", idx + 1),
                trimmed => trimmed.to_string(),
            };
            unique_name(base, &mut seen)
        })
        .collect()
}

/// Make relation names from one upload unique, keeping the first
/// occurrence as is and suffixing later ones with `_2`, `_3`, ...
pub fn dedupe_relation_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| unique_name(name, &mut seen))
        .collect()
}

fn unique_name(base: String, seen: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_relation_name("员工信息", "sheet_1"), "员工信息");
        assert_eq!(sanitize_relation_name("TestData", "sheet_1"), "TestData");
    }

    #[test]
    fn test_sanitize_collapses_separators() {
        assert_eq!(sanitize_relation_name(" Q1 - Sales (EU) ", "x"), "Q1_Sales_EU");
        assert_eq!(sanitize_relation_name("2024 report", "x"), "t_2024_report");
        assert_eq!(sanitize_relation_name("---", "sheet_3"), "sheet_3");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("sales.csv"), "sales");
        assert_eq!(file_stem("uploads/2024/销售数据.csv"), "销售数据");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem("noext"), "noext");
    }

    #[test]
    fn test_dedupe_headers() {
        let headers = dedupe_headers(vec![
            "id".to_string(),
            "".to_string(),
            "id".to_string(),
            "id".to_string(),
        ]);
        assert_eq!(headers, vec!["id", "column_2", "id_2", "id_3"]);
    }

    #[test]
    fn test_dedupe_relation_names_suffixes_later_clashes() {
        let names = ["Sales 2024", "Sales-2024", "Sales_2024", "Costs"]
            .iter()
            .enumerate()
            .map(|(idx, raw)| sanitize_relation_name(raw, &format!("sheet_{}", idx + 1)))
            .collect();
        assert_eq!(
            dedupe_relation_names(names),
            vec!["Sales_2024", "Sales_2024_2", "Sales_2024_3", "Costs"]
        );
    }
}
