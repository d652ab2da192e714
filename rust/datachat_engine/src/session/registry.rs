//! Session Catalog Registry: one isolated engine per conversation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::Instrument;

use super::factory::{catalog_namespace, SessionFactory};
use super::handle::SessionHandle;
use super::profiles::EnvironmentProfile;
use crate::errors::{EngineError, EngineResult};
use crate::executor::{run_query, QueryResult};
use crate::providers::{load_relations, register_relations, LoadedRelation, SourceKind};
use crate::schema::RelationMeta;
use crate::spec::runtime::RegistryConfig;

/// Owns every live [`SessionHandle`], keyed by session id.
///
/// The map lock is held only while the map itself is read or mutated.
/// Everything that touches an engine goes through that session's own
/// execution lock, so sessions never wait on each other.
pub struct SessionRegistry {
    config: RegistryConfig,
    factory: SessionFactory,
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let factory = SessionFactory::new(EnvironmentProfile::from_class(config.profile));
        Self {
            config,
            factory,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Live handle for `session_id`, if any.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Return the live handle for `session_id`, creating it on first use.
    ///
    /// Concurrent first calls for the same id all receive the same handle;
    /// a context built by a losing racer is simply dropped.
    pub fn get_or_create(&self, session_id: &str) -> EngineResult<Arc<SessionHandle>> {
        if let Some(handle) = self.get(session_id) {
            return Ok(handle);
        }

        let catalog_name = catalog_namespace(session_id);
        let ctx = self.factory.build_context(&catalog_name).map_err(|e| {
            EngineError::Config(format!("failed to build session engine: {e}"))
        })?;
        let fresh = Arc::new(SessionHandle::new(
            session_id.to_string(),
            catalog_name,
            ctx,
        ));

        let mut sessions = self.sessions.write();
        let handle = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(
                    session_id,
                    catalog = %fresh.catalog_name(),
                    "Created session engine"
                );
                fresh.clone()
            })
            .clone();
        Ok(handle)
    }

    /// Parse an upload and register its relations in the session's catalog.
    ///
    /// Parsing runs on a blocking thread before any lock is taken. The
    /// registration itself is all-or-nothing: every relation name is checked
    /// against the catalog before the first one is registered.
    ///
    /// # Errors
    /// `Load` for unreadable input, `NameCollision` when any relation name is
    /// already registered in this session.
    pub async fn register_tabular_source(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        logical_name: &str,
        kind: SourceKind,
    ) -> EngineResult<(String, BTreeMap<String, RelationMeta>)> {
        let name = logical_name.to_string();
        let relations = tokio::task::spawn_blocking(move || load_relations(&bytes, &name, kind))
            .await
            .map_err(|e| EngineError::Load(format!("parser task failed: {e}")))??;

        let mut pending = Some(relations);
        // A concurrent close between lookup and lock leaves a dead handle;
        // one retry picks up the replacement.
        for _ in 0..2 {
            let handle = self.get_or_create(session_id)?;
            let mut guard = handle.lock_engine().await;
            let Some(engine) = guard.as_mut() else {
                continue;
            };
            let relations = pending.take().unwrap_or_default();
            check_collisions(handle.catalog_name(), &engine.relations, &relations)?;

            let registered = register_relations(&engine.ctx, handle.catalog_name(), relations)?;
            engine
                .relations
                .extend(registered.iter().map(|(k, v)| (k.clone(), v.clone())));
            handle.touch();
            tracing::info!(
                session_id,
                catalog = %handle.catalog_name(),
                source = logical_name,
                relations = registered.len(),
                "Registered tabular source"
            );
            return Ok((handle.catalog_name().to_string(), registered));
        }
        Err(EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Run read-only SQL against the session's engine.
    ///
    /// # Errors
    /// `SessionNotFound` when no live handle exists, `RelationNotFound` for
    /// unresolvable references, `Query` for everything else.
    pub async fn execute(&self, session_id: &str, sql: &str) -> EngineResult<QueryResult> {
        let handle = self
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let guard = handle.lock_engine().await;
        let engine = guard
            .as_ref()
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        let timeout = self.config.query_timeout_ms.map(Duration::from_millis);
        let span = tracing::info_span!(
            "session_query",
            session_id,
            catalog = %handle.catalog_name()
        );
        let result = run_query(&engine.ctx, sql, timeout).instrument(span).await;
        handle.touch();
        match &result {
            Ok(rows) => tracing::debug!(session_id, rows = rows.row_count(), "Query completed"),
            Err(error) => tracing::warn!(session_id, error = %error, "Query failed"),
        }
        result
    }

    /// Snapshot of the relations registered in a session.
    pub async fn relations(
        &self,
        session_id: &str,
    ) -> EngineResult<BTreeMap<String, RelationMeta>> {
        let handle = self
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let guard = handle.lock_engine().await;
        let engine = guard
            .as_ref()
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        Ok(engine.relations.clone())
    }

    /// Close a session and release its engine. Returns `false` if no live
    /// handle existed.
    ///
    /// The handle leaves the map first, so new lookups miss immediately; the
    /// engine is dropped only once any in-flight statement has finished.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id);
        let Some(handle) = removed else {
            return false;
        };
        let released = handle.shutdown().await;
        tracing::info!(session_id, released, "Closed session");
        true
    }

    /// Close every live session. Returns how many were closed.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<Arc<SessionHandle>> = {
            let mut sessions = self.sessions.write();
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &drained {
            handle.shutdown().await;
        }
        if !drained.is_empty() {
            tracing::info!(closed = drained.len(), "Closed all sessions");
        }
        drained.len()
    }

    /// Live session ids, oldest first (ties broken by id).
    pub fn list_active(&self) -> Vec<String> {
        let mut entries: Vec<_> = self
            .sessions
            .read()
            .values()
            .map(|handle| (handle.created_at(), handle.session_id().to_string()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    pub fn count_active(&self) -> usize {
        self.sessions.read().len()
    }

    /// Close every session whose last activity is older than `max_idle`.
    /// Returns the ids that were closed.
    ///
    /// Candidates are re-checked under the map's write lock: a session that
    /// was touched or replaced since the scan is left alone.
    pub async fn sweep_idle(&self, max_idle: Duration) -> Vec<String> {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return Vec::new();
        };
        let candidates: Vec<Arc<SessionHandle>> = self
            .sessions
            .read()
            .values()
            .filter(|handle| handle.last_used() < cutoff)
            .cloned()
            .collect();

        let evicted = self.evict_stale(candidates, cutoff);
        for handle in &evicted {
            handle.shutdown().await;
        }
        if !evicted.is_empty() {
            tracing::info!(closed = evicted.len(), "Swept idle sessions");
        }
        evicted
            .iter()
            .map(|handle| handle.session_id().to_string())
            .collect()
    }

    /// Remove each candidate that is still the live handle for its id and
    /// still idle since before `cutoff`.
    fn evict_stale(
        &self,
        candidates: Vec<Arc<SessionHandle>>,
        cutoff: DateTime<Utc>,
    ) -> Vec<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write();
        candidates
            .into_iter()
            .filter(|candidate| {
                let live = sessions
                    .get(candidate.session_id())
                    .is_some_and(|current| Arc::ptr_eq(current, candidate));
                if live && candidate.last_used() < cutoff {
                    sessions.remove(candidate.session_id());
                    true
                } else {
                    false
                }
            })
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

fn check_collisions(
    catalog: &str,
    existing: &BTreeMap<String, RelationMeta>,
    incoming: &[LoadedRelation],
) -> EngineResult<()> {
    let mut seen = HashSet::with_capacity(incoming.len());
    for relation in incoming {
        if existing.contains_key(&relation.name) || !seen.insert(relation.name.as_str()) {
            return Err(EngineError::NameCollision {
                catalog: catalog.to_string(),
                relation: relation.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &[u8] = b"id,name\n1,alice\n2,bob\n";

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = SessionRegistry::default();
        let first = registry.get_or_create("demo").unwrap();
        let second = registry.get_or_create("demo").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.count_active(), 1);
        assert_eq!(first.catalog_name(), catalog_namespace("demo"));
    }

    #[tokio::test]
    async fn test_execute_without_session_fails() {
        let registry = SessionRegistry::default();
        let result = registry.execute("ghost", "SELECT 1").await;
        assert!(matches!(result, Err(EngineError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_register_then_query() {
        let registry = SessionRegistry::default();
        let (catalog, relations) = registry
            .register_tabular_source("demo", PEOPLE.to_vec(), "people.csv", SourceKind::Csv)
            .await
            .unwrap();
        assert_eq!(relations["people"].row_count, 2);

        let sql = format!("SELECT name FROM {catalog}.people ORDER BY id");
        let result = registry.execute("demo", &sql).await.unwrap();
        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(result.rows[1]["name"], serde_json::Value::from("bob"));
    }

    #[tokio::test]
    async fn test_collision_is_rejected_and_catalog_unchanged() {
        let registry = SessionRegistry::default();
        registry
            .register_tabular_source("demo", PEOPLE.to_vec(), "people.csv", SourceKind::Csv)
            .await
            .unwrap();
        let result = registry
            .register_tabular_source("demo", b"x\n1\n".to_vec(), "people.csv", SourceKind::Csv)
            .await;
        assert!(matches!(result, Err(EngineError::NameCollision { .. })));

        let relations = registry.relations("demo").await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations["people"].column_count, 2);
    }

    #[tokio::test]
    async fn test_load_error_leaves_session_untouched() {
        let registry = SessionRegistry::default();
        let result = registry
            .register_tabular_source("demo", Vec::new(), "empty.csv", SourceKind::Csv)
            .await;
        assert!(matches!(result, Err(EngineError::Load(_))));
        assert_eq!(registry.count_active(), 0);
    }

    #[tokio::test]
    async fn test_close_drops_engine() {
        let registry = SessionRegistry::default();
        let handle = registry.get_or_create("demo").unwrap();
        assert!(registry.close("demo").await);
        assert!(!handle.is_open().await);
        assert!(!registry.close("demo").await);
        assert_eq!(registry.count_active(), 0);
    }

    #[tokio::test]
    async fn test_list_active_orders_by_creation() {
        let registry = SessionRegistry::default();
        registry.get_or_create("b").unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        registry.get_or_create("a").unwrap();
        assert_eq!(registry.list_active(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(registry.close_all().await, 2);
        assert!(registry.list_active().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_idle_closes_only_stale_sessions() {
        let registry = SessionRegistry::default();
        registry.get_or_create("stale").unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.get_or_create("fresh").unwrap();

        let closed = registry.sweep_idle(Duration::from_millis(20)).await;
        assert_eq!(closed, vec!["stale".to_string()]);
        assert_eq!(registry.list_active(), vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_spares_session_touched_after_scan() {
        let registry = SessionRegistry::default();
        registry.get_or_create("demo").unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let cutoff = Utc::now() - chrono::Duration::milliseconds(20);
        let candidates = vec![registry.get("demo").unwrap()];
        registry.get("demo").unwrap().touch();

        assert!(registry.evict_stale(candidates, cutoff).is_empty());
        assert_eq!(registry.list_active(), vec!["demo".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_spares_session_recreated_after_scan() {
        let registry = SessionRegistry::default();
        let stale = registry.get_or_create("demo").unwrap();

        assert!(registry.close("demo").await);
        registry
            .register_tabular_source("demo", PEOPLE.to_vec(), "people.csv", SourceKind::Csv)
            .await
            .unwrap();

        let cutoff = Utc::now() + chrono::Duration::hours(1);
        assert!(registry.evict_stale(vec![stale], cutoff).is_empty());
        let relations = registry.relations("demo").await.unwrap();
        assert_eq!(relations["people"].row_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_waits_for_statement_holding_the_engine() {
        let registry = Arc::new(SessionRegistry::default());
        let handle = registry.get_or_create("demo").unwrap();
        let guard = handle.lock_engine().await;

        let closing = tokio::spawn({
            let registry = registry.clone();
            async move { registry.close("demo").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!closing.is_finished());
        assert!(registry.get("demo").is_none());

        drop(guard);
        assert!(closing.await.unwrap());
        assert!(!handle.is_open().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_during_running_query_lets_it_finish() {
        let registry = Arc::new(SessionRegistry::default());
        let csv: String = std::iter::once("id,k\n".to_string())
            .chain((0..20_000).map(|i| format!("{i},{}\n", i % 97)))
            .collect();
        let (catalog, _) = registry
            .register_tabular_source("demo", csv.into_bytes(), "big.csv", SourceKind::Csv)
            .await
            .unwrap();
        let handle = registry.get("demo").unwrap();

        let sql = format!("SELECT COUNT(*) AS n FROM {catalog}.big a JOIN {catalog}.big b ON a.k = b.k");
        let query = tokio::spawn({
            let registry = registry.clone();
            async move { registry.execute("demo", &sql).await }
        });
        while !handle.is_busy() && !query.is_finished() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(registry.close("demo").await);
        let result = query.await.unwrap().unwrap();
        assert!(result.scalar().is_some());
        assert!(!handle.is_open().await);
    }
}
