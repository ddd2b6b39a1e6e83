// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! View query options and result rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::traits::{DocumentStore, StorageError};

/// One index entry produced by querying a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Sort key emitted by the map function
    pub key: Value,
    /// Source document id, the tie-breaker within a key (empty on reduced rows)
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: Value,
    /// Embedded document (only with `include_docs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

impl Row {
    pub fn new(key: impl Into<Value>, id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            value: value.into(),
            doc: None,
        }
    }

    /// Attach the source document.
    #[must_use]
    pub fn with_doc(mut self, doc: Value) -> Self {
        self.doc = Some(doc);
        self
    }
}

/// Options for a single view read.
///
/// Mirrors the CouchDB view API: `startkey`/`startkey_docid` open the range,
/// `endkey`/`endkey_docid` close it, `descending` flips the walk direction
/// (and with it the meaning of start and end).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub start_key: Option<Value>,
    pub start_key_doc_id: Option<String>,
    pub end_key: Option<Value>,
    pub end_key_doc_id: Option<String>,
    pub inclusive_end: bool,
    pub skip: usize,
    pub descending: bool,
    pub include_docs: bool,
    /// `None` leaves the server default (reduce when a reduce function exists)
    pub reduce: Option<bool>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: None,
            start_key: None,
            start_key_doc_id: None,
            end_key: None,
            end_key_doc_id: None,
            inclusive_end: true,
            skip: 0,
            descending: false,
            include_docs: false,
            reduce: None,
        }
    }
}

/// A view plus the options to read it with.
///
/// Usually obtained from [`ViewDefinition::query`](super::ViewDefinition::query),
/// which seeds the definition's default options.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    pub design: String,
    pub view: String,
    pub options: QueryOptions,
}

impl ViewQuery {
    pub fn new(design: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            design: design.into(),
            view: view.into(),
            options: QueryOptions::default(),
        }
    }

    /// Restrict to rows whose key equals `key`.
    #[must_use]
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        let key = key.into();
        self.options.start_key = Some(key.clone());
        self.options.end_key = Some(key);
        self.options.inclusive_end = true;
        self
    }

    /// Restrict to keys in `start..=end`.
    #[must_use]
    pub fn key_range(mut self, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.options.start_key = Some(start.into());
        self.options.end_key = Some(end.into());
        self.options.inclusive_end = true;
        self
    }

    #[must_use]
    pub fn start_key(mut self, key: impl Into<Value>) -> Self {
        self.options.start_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn end_key(mut self, key: impl Into<Value>) -> Self {
        self.options.end_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn descending(mut self, descending: bool) -> Self {
        self.options.descending = descending;
        self
    }

    #[must_use]
    pub fn include_docs(mut self, include_docs: bool) -> Self {
        self.options.include_docs = include_docs;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Ask for reduced (`true`) or map (`false`) rows. Unset, the server
    /// reduces whenever the view has a reduce function.
    #[must_use]
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.options.reduce = Some(reduce);
        self
    }

    /// Run the query as-is.
    pub async fn fetch(&self, store: &dyn DocumentStore) -> Result<Vec<Row>, StorageError> {
        store.query_view(&self.design, &self.view, &self.options).await
    }
}
