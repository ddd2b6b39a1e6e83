// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # View Sync
//!
//! Data-access layer for a CouchDB-style document store: declare views in
//! code, keep the store's design documents in step with them, and page
//! through view results with opaque cursors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ViewRegistry                          │
//! │  • ViewDefinitions per document type + standalone views     │
//! │  • Grouped into canonical DesignDocuments                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SyncManager                           │
//! │  • Ensure collection, upsert design docs only when changed  │
//! │  • Pre-write hook, post-sync callbacks                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (per request, if auto-sync)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ConnectionScope                         │
//! │  • begin() → StoreHandle → end()                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Paginator + RowWrapper                     │
//! │  • N+1 look-ahead, N look-behind, [key, id] cursors         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use view_sync::{
//!     ConnectionScope, CouchConnector, RawRows, SyncManager, ViewDefinition, ViewRegistry,
//!     ViewSyncConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewSyncConfig::default();
//!
//!     let by_name = ViewDefinition::new(
//!         "restaurants",
//!         "by_name",
//!         "function(doc) { emit(doc.name, null); }",
//!     )
//!     .default_include_docs(true)
//!     .shared();
//!
//!     let registry = ViewRegistry::new();
//!     registry.add_view(by_name.clone())?;
//!
//!     let manager = Arc::new(SyncManager::from_config(Arc::new(registry), &config));
//!     let connector = Arc::new(CouchConnector::new(&config)?);
//!     let (_tx, rx) = watch::channel(config);
//!     let scope = ConnectionScope::new(manager, connector, rx);
//!
//!     let handle = scope.begin().await?;
//!     let page = view_sync::paginate(&*handle, &by_name.query(), 20, None, &RawRows).await?;
//!     println!("{} rows, next = {:?}", page.len(), page.next);
//!     scope.end(handle);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`view`]: view definitions, registry, design documents, key collation
//! - [`sync`]: [`SyncManager`] reconciling design documents with the store
//! - [`scope`]: per-request [`StoreHandle`]s
//! - [`pagination`]: [`Paginator`], cursors and row wrappers
//! - [`storage`]: CouchDB and in-memory backends
//! - [`resilience`]: retry with exponential backoff

pub mod config;
pub mod error;
pub mod metrics;
pub mod pagination;
pub mod resilience;
pub mod scope;
pub mod storage;
pub mod sync;
pub mod view;

pub use config::{SyncOptions, ViewSyncConfig};
pub use error::{CallbackFailure, ViewSyncError};
pub use pagination::{
    paginate, query_rows, Cursor, DocumentRows, Page, PageRequest, Paginator, RawRows, RowWrapper,
};
pub use resilience::retry::RetryConfig;
pub use scope::{ConnectionScope, StoreHandle};
pub use storage::couch::{CouchConnector, CouchStore};
pub use storage::memory::InMemoryStore;
pub use storage::traits::{DocumentStore, RemoteDesignDocument, StorageError, StoreConnector};
pub use sync::{DesignDocumentHook, SyncCallback, SyncManager, SyncReport};
pub use view::{DesignDocument, DocumentViews, Owner, Row, ViewDefinition, ViewQuery, ViewRegistry};
pub use metrics::LatencyTimer;
