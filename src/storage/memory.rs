// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process store.
//!
//! Behaves like a single CouchDB server for the operations this crate needs:
//! collections, revisioned design documents with optimistic concurrency, and
//! view reads with CouchDB range semantics. It cannot run map functions, so
//! view contents are seeded by the caller with [`InMemoryStore::index_rows`].

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config::ViewSyncConfig;
use crate::view::collation::{collate, collate_position};
use crate::view::query::{QueryOptions, Row};

use super::traits::{DocumentStore, RemoteDesignDocument, StorageError, StoreConnector};

#[derive(Default)]
struct Collection {
    design_docs: DashMap<String, RemoteDesignDocument>,
    /// (design, view) -> rows sorted by (key, id)
    indexes: DashMap<(String, String), Vec<Row>>,
}

struct Server {
    collections: DashMap<String, Arc<Collection>>,
    design_writes: AtomicUsize,
    view_queries: AtomicUsize,
    available: AtomicBool,
}

/// Handle onto a shared in-memory server, bound to one collection.
///
/// Clones and [`bind`](Self::bind)ed handles share all state.
#[derive(Clone)]
pub struct InMemoryStore {
    server: Arc<Server>,
    collection: String,
}

impl InMemoryStore {
    /// New empty server with a handle bound to `collection` (not yet created).
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            server: Arc::new(Server {
                collections: DashMap::new(),
                design_writes: AtomicUsize::new(0),
                view_queries: AtomicUsize::new(0),
                available: AtomicBool::new(true),
            }),
            collection: collection.into(),
        }
    }

    /// Another handle on the same server, bound to a different collection.
    #[must_use]
    pub fn bind(&self, collection: impl Into<String>) -> Self {
        Self {
            server: self.server.clone(),
            collection: collection.into(),
        }
    }

    /// Total design-document writes accepted by the server.
    #[must_use]
    pub fn design_writes(&self) -> usize {
        self.server.design_writes.load(Ordering::Acquire)
    }

    /// Total view reads served.
    #[must_use]
    pub fn view_queries(&self) -> usize {
        self.server.view_queries.load(Ordering::Acquire)
    }

    /// Simulate an outage: every call fails with `Unavailable` while false.
    pub fn set_available(&self, available: bool) {
        self.server.available.store(available, Ordering::Release);
    }

    /// Add rows to a view's index in the bound collection.
    pub fn index_rows<I>(&self, design: &str, view: &str, rows: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = Row>,
    {
        let collection = self.bound()?;
        let mut index = collection
            .indexes
            .entry((design.to_string(), view.to_string()))
            .or_default();
        index.extend(rows);
        index.sort_by(|a, b| collate_position(&a.key, &a.id, &b.key, &b.id));
        Ok(())
    }

    /// Remove every row from a view's index.
    pub fn clear_index(&self, design: &str, view: &str) -> Result<(), StorageError> {
        self.bound()?
            .indexes
            .remove(&(design.to_string(), view.to_string()));
        Ok(())
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.server.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory server is offline".into()))
        }
    }

    fn bound(&self) -> Result<Arc<Collection>, StorageError> {
        self.server
            .collections
            .get(&self.collection)
            .map(|c| c.value().clone())
            .ok_or_else(|| StorageError::NotFound(format!("collection '{}'", self.collection)))
    }

    fn next_revision(previous: Option<&str>, content: &Map<String, Value>) -> String {
        let generation = previous
            .and_then(|rev| rev.split('-').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let digest = Sha256::digest(Value::Object(content.clone()).to_string().as_bytes());
        format!("{}-{}", generation, hex::encode(&digest[..8]))
    }
}

/// Position of `row` relative to a range bound, in walk direction.
fn compare_to_bound(row: &Row, key: &Value, doc_id: Option<&String>, descending: bool) -> CmpOrdering {
    let ord = match (collate(&row.key, key), doc_id) {
        (CmpOrdering::Equal, Some(id)) => row.id.as_str().cmp(id.as_str()),
        (ord, _) => ord,
    };
    if descending { ord.reverse() } else { ord }
}

fn apply_options(mut rows: Vec<Row>, options: &QueryOptions) -> Vec<Row> {
    if options.descending {
        rows.reverse();
    }

    if let Some(ref start) = options.start_key {
        rows.retain(|row| {
            compare_to_bound(row, start, options.start_key_doc_id.as_ref(), options.descending)
                != CmpOrdering::Less
        });
    }

    if let Some(ref end) = options.end_key {
        rows.retain(|row| {
            let ord = compare_to_bound(row, end, options.end_key_doc_id.as_ref(), options.descending);
            if options.inclusive_end {
                ord != CmpOrdering::Greater
            } else {
                ord == CmpOrdering::Less
            }
        });
    }

    let limit = options.limit.unwrap_or(usize::MAX);
    rows.into_iter()
        .skip(options.skip)
        .take(limit)
        .map(|mut row| {
            if !options.include_docs {
                row.doc = None;
            }
            row
        })
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StorageError> {
        self.check_available()?;
        Ok(self.server.collections.contains_key(name))
    }

    async fn create_collection(&self, name: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.server.collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn get_design_document(&self, name: &str) -> Result<Option<RemoteDesignDocument>, StorageError> {
        self.check_available()?;
        Ok(self.bound()?.design_docs.get(name).map(|d| d.value().clone()))
    }

    async fn put_design_document(
        &self,
        name: &str,
        content: &Map<String, Value>,
        revision: Option<&str>,
    ) -> Result<String, StorageError> {
        self.check_available()?;
        let collection = self.bound()?;

        let new_revision = match collection.design_docs.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if revision != Some(entry.get().revision.as_str()) {
                    return Err(StorageError::Conflict { name: name.to_string() });
                }
                let rev = Self::next_revision(revision, content);
                entry.insert(RemoteDesignDocument { content: content.clone(), revision: rev.clone() });
                rev
            }
            Entry::Vacant(entry) => {
                if revision.is_some() {
                    return Err(StorageError::Conflict { name: name.to_string() });
                }
                let rev = Self::next_revision(None, content);
                entry.insert(RemoteDesignDocument { content: content.clone(), revision: rev.clone() });
                rev
            }
        };

        self.server.design_writes.fetch_add(1, Ordering::AcqRel);
        Ok(new_revision)
    }

    async fn query_view(&self, design: &str, view: &str, options: &QueryOptions) -> Result<Vec<Row>, StorageError> {
        self.check_available()?;
        let collection = self.bound()?;

        let declared = collection
            .design_docs
            .get(design)
            .map(|doc| {
                doc.content
                    .get("views")
                    .and_then(Value::as_object)
                    .is_some_and(|views| views.contains_key(view))
            })
            .unwrap_or(false);
        if !declared {
            return Err(StorageError::NotFound(format!("_design/{}/_view/{}", design, view)));
        }

        let rows = collection
            .indexes
            .get(&(design.to_string(), view.to_string()))
            .map(|rows| rows.value().clone())
            .unwrap_or_default();

        self.server.view_queries.fetch_add(1, Ordering::AcqRel);
        Ok(apply_options(rows, options))
    }
}

#[async_trait]
impl StoreConnector for InMemoryStore {
    async fn connect(&self, config: &ViewSyncConfig) -> Result<Box<dyn DocumentStore>, StorageError> {
        self.check_available()?;
        Ok(Box::new(self.bind(config.database.clone())))
    }
}
