//! Relation registration into a session engine.
//!
//! Loaded relations are registered as in-memory providers under the
//! session's catalog namespace (`<namespace>.<relation>`).

use std::collections::BTreeMap;
use std::sync::Arc;

use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use datafusion_common::TableReference;

use super::loader::LoadedRelation;
use crate::errors::EngineResult;
use crate::schema::RelationMeta;

/// Register every loaded relation under `namespace`.
///
/// Metadata is computed here, before registration, so counts are available
/// without running a query. Callers are responsible for collision checks.
///
/// # Errors
/// Returns error if a provider cannot be built from the relation's batches
/// or if the engine rejects the registration.
pub fn register_relations(
    ctx: &SessionContext,
    namespace: &str,
    relations: Vec<LoadedRelation>,
) -> EngineResult<BTreeMap<String, RelationMeta>> {
    let mut registered = BTreeMap::new();
    for relation in relations {
        let meta = relation.meta();
        let provider = MemTable::try_new(relation.schema.clone(), vec![relation.batches])?;
        ctx.register_table(
            TableReference::partial(namespace, relation.name.as_str()),
            Arc::new(provider),
        )?;
        tracing::debug!(
            namespace,
            relation = %relation.name,
            rows = meta.row_count,
            columns = meta.column_count,
            "Registered relation"
        );
        registered.insert(relation.name, meta);
    }
    Ok(registered)
}
