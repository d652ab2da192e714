//! Per-conversation engine handle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use datafusion::prelude::SessionContext;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::schema::RelationMeta;

/// Engine state owned by one session. `None` inside the handle once closed.
pub(crate) struct SessionEngine {
    pub(crate) ctx: SessionContext,
    pub(crate) relations: BTreeMap<String, RelationMeta>,
}

/// One live conversation: its engine, catalog namespace and activity stamps.
///
/// The engine sits behind an async mutex that doubles as the execution
/// lock. Queries, registrations and close all take it, so a session never
/// runs two statements at once and is never dropped mid-query.
pub struct SessionHandle {
    session_id: String,
    catalog_name: String,
    created_at: DateTime<Utc>,
    last_used: Mutex<DateTime<Utc>>,
    engine: AsyncMutex<Option<SessionEngine>>,
}

impl SessionHandle {
    pub(crate) fn new(session_id: String, catalog_name: String, ctx: SessionContext) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            catalog_name,
            created_at: now,
            last_used: Mutex::new(now),
            engine: AsyncMutex::new(Some(SessionEngine {
                ctx,
                relations: BTreeMap::new(),
            })),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Namespace under which this session's relations are registered.
    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.lock()
    }

    pub(crate) fn touch(&self) {
        let mut last_used = self.last_used.lock();
        let now = Utc::now();
        if now > *last_used {
            *last_used = now;
        }
    }

    pub(crate) async fn lock_engine(&self) -> MutexGuard<'_, Option<SessionEngine>> {
        self.engine.lock().await
    }

    /// Drop the engine under the execution lock. Returns `false` if it was
    /// already gone.
    pub(crate) async fn shutdown(&self) -> bool {
        let mut guard = self.engine.lock().await;
        guard.take().is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.engine.try_lock().is_err()
    }

    /// True until the handle has been closed.
    pub async fn is_open(&self) -> bool {
        self.engine.lock().await.is_some()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("catalog_name", &self.catalog_name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
