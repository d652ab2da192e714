//! Live-database mode: bindings, collaborator traits, relationship graph,
//! error hints and the read-only guard.

pub mod binding;
pub mod guard;
pub mod hints;
pub mod relationships;
pub mod traits;

pub use binding::{fallback_session_id, DatasourceType, ExternalDatasourceBinding};
pub use guard::{ensure_read_only, structural_warnings, GuardViolation};
pub use hints::hint_for_error;
pub use relationships::parse_relationships;
pub use traits::{
    ConfigCipher, DatasourceRecord, FieldMetadata, LiveQueryExecutor, MetadataStore, TableMetadata,
};
