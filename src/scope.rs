// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-request store handles.
//!
//! Each request opens its own [`StoreHandle`] with [`ConnectionScope::begin`]
//! and gives it back with [`ConnectionScope::end`]. Handles are never shared
//! between requests. When the auto-sync policy is on, opening a handle
//! brings design documents up to date first.
//!
//! The config is read from a `tokio::sync::watch` channel on every `begin`,
//! so `disable_auto_sync` can be flipped at runtime without a restart.

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::config::ViewSyncConfig;
use crate::error::ViewSyncError;
use crate::metrics;
use crate::storage::traits::{DocumentStore, StorageError, StoreConnector};
use crate::sync::SyncManager;

pub struct ConnectionScope {
    manager: Arc<SyncManager>,
    connector: Arc<dyn StoreConnector>,
    config_rx: watch::Receiver<ViewSyncConfig>,
}

impl ConnectionScope {
    pub fn new(
        manager: Arc<SyncManager>,
        connector: Arc<dyn StoreConnector>,
        config_rx: watch::Receiver<ViewSyncConfig>,
    ) -> Self {
        Self { manager, connector, config_rx }
    }

    pub fn manager(&self) -> &Arc<SyncManager> {
        &self.manager
    }

    /// Open a handle using the current config.
    pub async fn begin(&self) -> Result<StoreHandle, ViewSyncError> {
        let config = self.config_rx.borrow().clone();
        self.begin_with(&config).await
    }

    /// Open a handle for an explicit config.
    ///
    /// With auto-sync in effect the collection and design documents are
    /// brought up to date before the handle is returned. Otherwise the
    /// collection must already exist.
    #[tracing::instrument(skip(self, config), fields(database = %config.database))]
    pub async fn begin_with(&self, config: &ViewSyncConfig) -> Result<StoreHandle, ViewSyncError> {
        let store = self.connector.connect(config).await?;

        let synced = if self.manager.should_sync_on_request(config) {
            self.manager.sync(store.as_ref()).await?;
            true
        } else {
            if !store.collection_exists(store.collection()).await? {
                return Err(StorageError::NotFound(format!("collection '{}'", store.collection())).into());
            }
            false
        };

        let handle = StoreHandle {
            id: Uuid::new_v4(),
            store,
            opened_at: Instant::now(),
            synced,
            ended: false,
        };
        metrics::record_scope_begin(synced);
        debug!(handle = %handle.id, synced, "Store handle opened");
        Ok(handle)
    }

    /// Release a handle at the end of its request.
    pub fn end(&self, mut handle: StoreHandle) {
        handle.ended = true;
        debug!(
            handle = %handle.id,
            held_ms = metrics::millis(handle.elapsed()),
            "Store handle released"
        );
    }
}

/// A request-scoped store handle. Dereferences to the store.
pub struct StoreHandle {
    id: Uuid,
    store: Box<dyn DocumentStore>,
    opened_at: Instant,
    synced: bool,
    ended: bool,
}

impl StoreHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a sync ran when this handle was opened.
    pub fn synced(&self) -> bool {
        self.synced
    }

    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

impl Deref for StoreHandle {
    type Target = dyn DocumentStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("id", &self.id)
            .field("collection", &self.store.collection())
            .field("synced", &self.synced)
            .finish()
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if !self.ended {
            debug!(handle = %self.id, "Store handle dropped without end()");
        }
        metrics::record_scope_end(self.opened_at.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncOptions;
    use crate::storage::memory::InMemoryStore;
    use crate::view::{ViewDefinition, ViewRegistry};

    fn scope(store: &InMemoryStore, config: ViewSyncConfig) -> (ConnectionScope, watch::Sender<ViewSyncConfig>) {
        let registry = ViewRegistry::new();
        registry
            .add_view(ViewDefinition::new("users", "by_email", "function(doc) { emit(doc.email, null); }").shared())
            .unwrap();
        let manager = Arc::new(SyncManager::from_config(Arc::new(registry), &config));
        let (tx, rx) = watch::channel(config);
        (ConnectionScope::new(manager, Arc::new(store.clone()), rx), tx)
    }

    #[tokio::test]
    async fn test_begin_syncs_by_default() {
        let store = InMemoryStore::new("app");
        let (scope, _tx) = scope(&store, ViewSyncConfig::default());

        let handle = scope.begin().await.unwrap();
        assert!(handle.synced());
        assert_eq!(handle.collection(), "app");
        assert!(handle.get_design_document("users").await.unwrap().is_some());
        scope.end(handle);
    }

    #[tokio::test]
    async fn test_disabled_sync_requires_existing_collection() {
        let store = InMemoryStore::new("app");
        let config = ViewSyncConfig { disable_auto_sync: true, ..ViewSyncConfig::default() };
        let (scope, _tx) = scope(&store, config);

        let err = scope.begin().await.unwrap_err();
        assert!(matches!(err, ViewSyncError::Store(StorageError::NotFound(_))));

        store.create_collection("app").await.unwrap();
        let handle = scope.begin().await.unwrap();
        assert!(!handle.synced());
        assert_eq!(store.design_writes(), 0);
        scope.end(handle);
    }

    #[tokio::test]
    async fn test_runtime_override_through_watch() {
        let store = InMemoryStore::new("app");
        let (scope, tx) = scope(&store, ViewSyncConfig::default());

        let first = scope.begin().await.unwrap();
        assert!(first.synced());
        scope.end(first);

        tx.send_modify(|config| config.disable_auto_sync = true);
        let second = scope.begin().await.unwrap();
        assert!(!second.synced());
        scope.end(second);
    }

    #[tokio::test]
    async fn test_auto_sync_off_at_construction() {
        let store = InMemoryStore::new("app");
        store.create_collection("app").await.unwrap();
        let config = ViewSyncConfig {
            sync: SyncOptions { auto_sync: false, ..SyncOptions::default() },
            ..ViewSyncConfig::default()
        };
        let (scope, _tx) = scope(&store, config);

        let handle = scope.begin().await.unwrap();
        assert!(!handle.synced());
        assert!(handle.get_design_document("users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handles_are_distinct() {
        let store = InMemoryStore::new("app");
        let (scope, _tx) = scope(&store, ViewSyncConfig::default());

        let a = scope.begin().await.unwrap();
        let b = scope.begin().await.unwrap();
        assert_ne!(a.id(), b.id());
        scope.end(a);
        drop(b);
    }

    #[tokio::test]
    async fn test_begin_with_unavailable_store() {
        let store = InMemoryStore::new("app");
        store.set_available(false);
        let (scope, _tx) = scope(&store, ViewSyncConfig::default());

        let err = scope.begin().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
