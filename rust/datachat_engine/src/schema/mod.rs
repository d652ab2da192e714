//! Schema introspection for registered relations.

pub mod introspection;

pub use introspection::{hash_arrow_schema, ColumnMeta, RelationMeta};
