//! Agent-facing hints for common live-database failures.
//!
//! The table is ordered; the first matching pattern produces the hint.
//! Errors that match nothing fall back to the truncated raw message.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

type HintFn = fn(&str, &str) -> String;

static HINTS: LazyLock<Vec<(Regex, HintFn)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)cannot be resolved|unknown column|column .* does not exist")
                .expect("valid column regex"),
            unresolved_column as HintFn,
        ),
        (
            Regex::new(r"(?i)table\b.*\b(doesn't exist|does not exist|not exist|not found)|unknown table")
                .expect("valid table regex"),
            missing_table as HintFn,
        ),
        (
            Regex::new(r"(?i)access denied|permission denied|not authorized")
                .expect("valid access regex"),
            access_denied as HintFn,
        ),
        (
            Regex::new(r"(?i)syntax error|error in your sql syntax|parse error")
                .expect("valid syntax regex"),
            syntax_error as HintFn,
        ),
        (
            Regex::new(r"(?i)timed out|timeout").expect("valid timeout regex"),
            timed_out as HintFn,
        ),
    ]
});

static COLUMN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)column\s+['`"]([^'`"]+)['`"]"#).expect("valid column name regex")
});

static TABLE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+`?(\w+)`?\s+(?:AS\s+)?(\w+)").expect("valid alias regex")
});

const NON_ALIAS_KEYWORDS: &[&str] = &[
    "WHERE", "ON", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "FULL", "CROSS", "GROUP", "ORDER",
    "LIMIT", "HAVING", "UNION", "USING", "WINDOW", "NATURAL",
];

/// Map a raw live-database error to guidance the agent can act on.
pub fn hint_for_error(error_text: &str, sql: &str) -> Option<String> {
    HINTS
        .iter()
        .find(|(pattern, _)| pattern.is_match(error_text))
        .map(|(_, hint)| hint(error_text, sql))
}

/// Aliases declared after `FROM`/`JOIN` table names, sorted.
pub fn table_aliases(sql: &str) -> BTreeSet<String> {
    TABLE_ALIAS
        .captures_iter(sql)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|alias| !NON_ALIAS_KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(alias)))
        .map(str::to_string)
        .collect()
}

fn unresolved_column(error_text: &str, sql: &str) -> String {
    let column = COLUMN_NAME
        .captures(error_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let aliases = table_aliases(sql);
    let aliases = if aliases.is_empty() {
        "none".to_string()
    } else {
        aliases.into_iter().collect::<Vec<_>>().join(", ")
    };
    format!(
        "SQL failed: column '{column}' cannot be resolved.\n\
         Table aliases defined: {aliases}\n\n\
         Check that each alias is defined, that the column exists in the aliased table, \
         and that the JOIN conditions are correct. Fix the SQL using the schema you already have."
    )
}

fn missing_table(_: &str, _: &str) -> String {
    "SQL failed: table does not exist.\n\n\
     Check the table name; list_tables shows the available tables."
        .to_string()
}

fn access_denied(_: &str, _: &str) -> String {
    "SQL failed: the datasource account is not allowed to read this object. \
     Query only the tables returned by list_tables."
        .to_string()
}

fn syntax_error(_: &str, _: &str) -> String {
    "SQL failed: syntax error. Check quoting, commas and parentheses, \
     and use the dialect of this datasource."
        .to_string()
}

fn timed_out(_: &str, _: &str) -> String {
    "SQL failed: the query timed out. Add filters or a LIMIT, or aggregate before joining."
        .to_string()
}
