//! Query normalization and call-pair hashing for duplicate detection.

/// Case-fold and collapse whitespace runs to a single space.
///
/// Literal contents are case-folded too, so `'A'` and `'a'` compare equal;
/// any other difference in literals or clauses keeps two queries distinct.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// BLAKE3 digest of a `(tool, normalized query)` pair.
///
/// Fields are length-prefixed so `("ab", "c")` and `("a", "bc")` differ, and
/// a missing query hashes differently from an empty one.
pub fn call_hash(tool_name: &str, normalized_query: Option<&str>) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(tool_name.len() as u64).to_le_bytes());
    hasher.update(tool_name.as_bytes());
    match normalized_query {
        Some(query) => {
            hasher.update(&[1]);
            hasher.update(&(query.len() as u64).to_le_bytes());
            hasher.update(query.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
    *hasher.finalize().as_bytes()
}
