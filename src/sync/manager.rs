// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{SyncOptions, ViewSyncConfig};
use crate::error::{CallbackFailure, ViewSyncError};
use crate::metrics;
use crate::resilience::retry::{retry_if, RetryConfig};
use crate::storage::traits::{DocumentStore, StorageError};
use crate::view::{DesignDocument, ViewRegistry};

use super::types::{DesignDocOutcome, DesignDocumentHook, SyncCallback, SyncReport};

/// Reconciles the registry's design documents with a store.
///
/// Holds no locks across store calls, so any number of requests may sync the
/// same collection concurrently: every write is read-compare-write guarded by
/// the remote revision token.
pub struct SyncManager {
    registry: Arc<ViewRegistry>,
    options: SyncOptions,
    callbacks: RwLock<Vec<Arc<dyn SyncCallback>>>,
    hook: Option<Arc<dyn DesignDocumentHook>>,
}

impl SyncManager {
    pub fn new(registry: Arc<ViewRegistry>, options: SyncOptions) -> Self {
        Self {
            registry,
            options,
            callbacks: RwLock::new(Vec::new()),
            hook: None,
        }
    }

    /// Build from the `sync` section of a [`ViewSyncConfig`].
    pub fn from_config(registry: Arc<ViewRegistry>, config: &ViewSyncConfig) -> Self {
        Self::new(registry, config.sync.clone())
    }

    /// Install the pre-write design document hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl DesignDocumentHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn registry(&self) -> &Arc<ViewRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Register a callback to run after every successful design document sync.
    /// Callbacks run in registration order.
    pub fn on_sync(&self, callback: impl SyncCallback + 'static) {
        let mut callbacks = self.callbacks.write();
        debug!(callback = %callback.name(), position = callbacks.len(), "Registered sync callback");
        callbacks.push(Arc::new(callback));
    }

    /// Whether a request opened with `config` should sync before use.
    ///
    /// The construction-time `auto_sync` policy can be switched off per
    /// request through `disable_auto_sync`, but not switched on.
    #[must_use]
    pub fn should_sync_on_request(&self, config: &ViewSyncConfig) -> bool {
        self.options.auto_sync && !config.disable_auto_sync
    }

    /// Create the collection if it does not exist. Returns whether it was created.
    #[tracing::instrument(skip(self, store))]
    pub async fn ensure_collection_exists(
        &self,
        store: &dyn DocumentStore,
        name: &str,
    ) -> Result<bool, ViewSyncError> {
        if store.collection_exists(name).await? {
            return Ok(false);
        }
        info!(collection = %name, "Creating collection");
        store.create_collection(name).await?;
        Ok(true)
    }

    /// Bring every registered design document up to date.
    ///
    /// Documents whose remote copy already matches are left alone, so a
    /// second run against an unchanged registry writes nothing.
    #[tracing::instrument(skip(self, store), fields(collection = %store.collection()))]
    pub async fn sync_design_documents(&self, store: &dyn DocumentStore) -> Result<SyncReport, ViewSyncError> {
        let local = self.registry.design_documents()?;
        let mut report = SyncReport::default();

        for doc in &local {
            let outcome = self.sync_design_document(store, doc).await?;
            metrics::record_design_doc(doc.name(), &outcome.to_string());
            report.count(outcome);
        }

        debug!(
            checked = report.checked,
            written = report.written,
            unchanged = report.unchanged,
            "Design documents synced"
        );
        Ok(report)
    }

    async fn sync_design_document(
        &self,
        store: &dyn DocumentStore,
        local: &DesignDocument,
    ) -> Result<DesignDocOutcome, ViewSyncError> {
        let remote = store.get_design_document(local.name()).await?;
        let candidate = local.merged_onto(remote.as_ref().map(|r| &r.content), self.options.remove_missing)?;

        if let Some(remote) = &remote {
            if candidate.matches(&remote.content) {
                debug!(design = %local.name(), rev = %remote.revision, "Design document unchanged");
                return Ok(DesignDocOutcome::Unchanged);
            }
        }

        let mut candidate = candidate;
        if let Some(hook) = &self.hook {
            hook.update_design_doc(&mut candidate);
        }

        let revision = remote.as_ref().map(|r| r.revision.as_str());
        match store.put_design_document(local.name(), candidate.body(), revision).await {
            Ok(new_revision) => {
                info!(
                    design = %local.name(),
                    previous = ?revision,
                    rev = %new_revision,
                    digest = %candidate.digest(),
                    "Design document written"
                );
                Ok(DesignDocOutcome::Written)
            }
            Err(StorageError::Conflict { name }) => {
                // Another writer got there first; accept their revision if it
                // already carries what we wanted to write.
                let latest = store.get_design_document(local.name()).await?;
                if let Some(latest) = latest {
                    let merged = local.merged_onto(Some(&latest.content), self.options.remove_missing)?;
                    if merged.matches(&latest.content) {
                        debug!(design = %local.name(), rev = %latest.revision, "Concurrent writer converged design document");
                        return Ok(DesignDocOutcome::Converged);
                    }
                }
                warn!(design = %local.name(), "Design document changed concurrently");
                Err(StorageError::Conflict { name }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full sync: ensure the collection, sync design documents, then run the
    /// post-sync callbacks.
    ///
    /// A failing callback does not stop the ones after it; once all have run,
    /// any failures are returned together as [`ViewSyncError::SyncCallbacks`].
    #[tracing::instrument(skip(self, store), fields(collection = %store.collection()))]
    pub async fn sync(&self, store: &dyn DocumentStore) -> Result<SyncReport, ViewSyncError> {
        let start = Instant::now();
        let result = self.run_sync(store).await;
        metrics::record_sync(result.is_ok(), start.elapsed());

        match &result {
            Ok(report) => info!(
                written = report.written,
                unchanged = report.unchanged,
                callbacks = report.callbacks_run,
                elapsed_ms = metrics::millis(start.elapsed()),
                "Sync complete"
            ),
            Err(ViewSyncError::Store(e)) => {
                metrics::record_store_error("sync", e.kind());
                warn!(error = %e, "Sync failed");
            }
            Err(e) => warn!(error = %e, "Sync failed"),
        }
        result
    }

    async fn run_sync(&self, store: &dyn DocumentStore) -> Result<SyncReport, ViewSyncError> {
        self.ensure_collection_exists(store, store.collection()).await?;
        let mut report = self.sync_design_documents(store).await?;

        let callbacks: Vec<Arc<dyn SyncCallback>> = self.callbacks.read().clone();
        let mut failures = Vec::new();
        for (index, callback) in callbacks.iter().enumerate() {
            report.callbacks_run += 1;
            if let Err(e) = callback.on_sync(store).await {
                error!(callback = %callback.name(), index, error = %e, "Sync callback failed");
                metrics::record_callback_failure(callback.name());
                failures.push(CallbackFailure {
                    index,
                    name: callback.name().to_string(),
                    message: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(ViewSyncError::SyncCallbacks { failures })
        }
    }

    /// [`sync`](Self::sync), retried while the failure is transient.
    ///
    /// Sync is idempotent, so a retry after a partial pass only writes what
    /// is still out of date.
    pub async fn sync_with_retry(
        &self,
        store: &dyn DocumentStore,
        config: &RetryConfig,
    ) -> Result<SyncReport, ViewSyncError> {
        retry_if("view_sync", config, move || self.sync(store), ViewSyncError::is_retryable).await
    }
}
