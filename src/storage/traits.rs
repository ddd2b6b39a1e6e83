// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ViewSyncConfig;
use crate::view::query::{QueryOptions, Row};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// Connectivity, authentication or server-side failure. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Optimistic-concurrency rejection: the revision token was stale.
    #[error("Revision conflict on '{name}'")]
    Conflict { name: String },
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether a later attempt of the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Conflict { .. })
    }

    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Conflict { .. } => "conflict",
            Self::Backend(_) => "backend",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// A design document as currently persisted by the store.
///
/// `content` never carries the `_id` / `_rev` bookkeeping fields; backends
/// strip them on read and add them back on write.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDesignDocument {
    pub content: Map<String, Value>,
    pub revision: String,
}

/// Capability surface of the remote document store.
///
/// A store value is bound to one collection (a CouchDB database) for the
/// design-document and view operations; collection management takes the
/// name explicitly.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this handle is bound to.
    fn collection(&self) -> &str;

    async fn collection_exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Create a collection. Creating one that already exists is not an error.
    async fn create_collection(&self, name: &str) -> Result<(), StorageError>;

    async fn get_design_document(&self, name: &str)
        -> Result<Option<RemoteDesignDocument>, StorageError>;

    /// Write a design document, returning the new revision token.
    ///
    /// `revision` must be the current remote token when updating; a stale
    /// token fails with [`StorageError::Conflict`].
    async fn put_design_document(
        &self,
        name: &str,
        content: &Map<String, Value>,
        revision: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Query a view, returning rows in the view's order.
    async fn query_view(
        &self,
        design: &str,
        view: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Row>, StorageError>;
}

/// Opens request-scoped store handles.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, config: &ViewSyncConfig) -> Result<Box<dyn DocumentStore>, StorageError>;
}
