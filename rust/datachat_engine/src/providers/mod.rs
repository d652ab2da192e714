//! Tabular Source Loader and relation registration.
//!
//! Uploads are parsed into Arrow batches eagerly and registered as
//! in-memory providers. No lazy file-backed scans.

mod csv_source;
pub mod loader;
pub mod naming;
pub mod registration;
mod spreadsheet;

pub use loader::{load_relations, LoadedRelation, SourceKind};
pub use naming::sanitize_relation_name;
pub use registration::register_relations;
