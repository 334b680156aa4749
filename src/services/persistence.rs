//! Durable filter snapshots and transient navigation contexts

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{FilterState, NavigationContext},
};

/// Storage of one filter snapshot per screen session, plus a separate
/// one-shot navigation context slot.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Last persisted snapshot. Missing or unreadable snapshots are `None`.
    async fn restore(&self, session: &str) -> Option<FilterState>;

    /// Replace the snapshot as a whole
    async fn persist(&self, session: &str, state: &FilterState) -> AppResult<()>;

    async fn put_navigation_context(
        &self,
        session: &str,
        context: &NavigationContext,
    ) -> AppResult<()>;

    /// Read and remove the navigation context
    async fn take_navigation_context(&self, session: &str) -> AppResult<Option<NavigationContext>>;

    async fn clear_navigation_context(&self, session: &str) -> AppResult<()>;

    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Snapshots encoded the way they are stored, so malformed entries behave
/// the same as with the Redis backend.
#[derive(Default)]
pub struct MemoryPersistence {
    snapshots: RwLock<HashMap<String, String>>,
    navigation: RwLock<HashMap<String, NavigationContext>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw snapshot string, bypassing serialization
    pub async fn put_raw(&self, session: &str, raw: &str) {
        self.snapshots
            .write()
            .await
            .insert(session.to_string(), raw.to_string());
    }
}

/// Decode a stored snapshot, logging rather than failing on bad data.
/// Snapshots that decode but break the filter invariants are dropped too.
pub(crate) fn decode_snapshot(session: &str, raw: &str) -> Option<FilterState> {
    let state = match serde_json::from_str::<FilterState>(raw) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Ignoring malformed filter snapshot for {}: {}", session, e);
            return None;
        }
    };
    match state.check() {
        Ok(()) => Some(state),
        Err(e) => {
            tracing::warn!("Ignoring invalid filter snapshot for {}: {}", session, e);
            None
        }
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn restore(&self, session: &str) -> Option<FilterState> {
        let snapshots = self.snapshots.read().await;
        let raw = snapshots.get(session)?;
        decode_snapshot(session, raw)
    }

    async fn persist(&self, session: &str, state: &FilterState) -> AppResult<()> {
        let raw = serde_json::to_string(state)?;
        self.snapshots
            .write()
            .await
            .insert(session.to_string(), raw);
        Ok(())
    }

    async fn put_navigation_context(
        &self,
        session: &str,
        context: &NavigationContext,
    ) -> AppResult<()> {
        self.navigation
            .write()
            .await
            .insert(session.to_string(), context.clone());
        Ok(())
    }

    async fn take_navigation_context(&self, session: &str) -> AppResult<Option<NavigationContext>> {
        Ok(self.navigation.write().await.remove(session))
    }

    async fn clear_navigation_context(&self, session: &str) -> AppResult<()> {
        self.navigation.write().await.remove(session);
        Ok(())
    }
}
