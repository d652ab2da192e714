//! Read-only screening for SQL sent to live databases.
//!
//! External engines do not share DataFusion's statement options, so live
//! SQL is screened textually before it leaves the process.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|CREATE|MERGE|GRANT|REVOKE|RENAME)\b",
    )
    .expect("valid forbidden keyword regex")
});

static LEADING_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\(*\s*(SELECT|WITH)\b").expect("valid leading keyword regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("SQL is empty")]
    Empty,
    #[error("{0} statements are not allowed; only SELECT queries may run")]
    Forbidden(String),
    #[error("only SELECT queries may run")]
    NotSelect,
    #[error("only one statement may run per call")]
    MultipleStatements,
}

/// Accept only statements that start with `SELECT` or `WITH` and contain no
/// write or DDL keyword as a whole word. Column names such as `updated_at`
/// or `created_by` pass.
pub fn ensure_read_only(sql: &str) -> Result<(), GuardViolation> {
    let stripped = strip_literals(sql);
    if stripped.trim().is_empty() {
        return Err(GuardViolation::Empty);
    }
    if let Some(found) = FORBIDDEN.captures(&stripped).and_then(|caps| caps.get(1)) {
        return Err(GuardViolation::Forbidden(found.as_str().to_ascii_uppercase()));
    }
    if stripped.trim_end().trim_end_matches(';').contains(';') {
        return Err(GuardViolation::MultipleStatements);
    }
    if !LEADING_KEYWORD.is_match(&stripped) {
        return Err(GuardViolation::NotSelect);
    }
    Ok(())
}

/// Lightweight structural warnings; not a parser.
pub fn structural_warnings(sql: &str) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    let stripped = strip_literals(sql).to_ascii_uppercase();
    if !stripped.split(|c: char| !c.is_ascii_alphanumeric() && c != '_').any(|w| w == "FROM") {
        warnings.push("missing FROM clause");
    }
    if sql.matches('(').count() != sql.matches(')').count() {
        warnings.push("unbalanced parentheses");
    }
    if sql.matches('\'').count() % 2 != 0 {
        warnings.push("unbalanced single quotes");
    }
    warnings
}

/// Blank out single-quoted literals and comments so keywords inside them
/// are ignored.
fn strip_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push(' ');
                while let Some(inner) = chars.next() {
                    if inner == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }
    out
}
