// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! View definitions.
//!
//! A view is identified by `(design, name)` and stored inside the design
//! document `_design/<design>`:
//!
//! ```text
//! {
//!   "language": "javascript",
//!   "views": {
//!     "by_tag": {
//!       "map": "function(doc) { ... }",
//!       "reduce": "_count",
//!       "options": {"collation": "raw"}
//!     }
//!   }
//! }
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use super::query::ViewQuery;

pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Default options applied to every query built from a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDefaults {
    pub limit: Option<usize>,
    pub descending: bool,
    pub include_docs: bool,
}

/// One named, sorted projection of documents.
///
/// Build with the chained constructors, then share as `Arc<ViewDefinition>`;
/// a definition is never mutated after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    /// Design document name (without the `_design/` prefix)
    pub design: String,
    /// View name within the design document
    pub name: String,
    pub map_fun: String,
    pub reduce_fun: Option<String>,
    pub language: String,
    /// Per-view index options stored with the view (e.g. collation)
    pub index_options: Map<String, Value>,
    pub defaults: QueryDefaults,
}

impl ViewDefinition {
    pub fn new(
        design: impl Into<String>,
        name: impl Into<String>,
        map_fun: impl Into<String>,
    ) -> Self {
        Self {
            design: design.into(),
            name: name.into(),
            map_fun: map_fun.into(),
            reduce_fun: None,
            language: DEFAULT_LANGUAGE.to_string(),
            index_options: Map::new(),
            defaults: QueryDefaults::default(),
        }
    }

    /// Add a reduce function
    #[must_use]
    pub fn reduce(mut self, reduce_fun: impl Into<String>) -> Self {
        self.reduce_fun = Some(reduce_fun.into());
        self
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set an index option stored alongside the view
    #[must_use]
    pub fn index_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.index_options.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.defaults.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn default_descending(mut self, descending: bool) -> Self {
        self.defaults.descending = descending;
        self
    }

    #[must_use]
    pub fn default_include_docs(mut self, include_docs: bool) -> Self {
        self.defaults.include_docs = include_docs;
        self
    }

    /// Finish building and wrap for registration.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// `(design, name)` identity.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.design, &self.name)
    }

    /// The function object stored under `views.<name>` in the design document.
    #[must_use]
    pub fn to_view_functions(&self) -> Value {
        let mut funcs = Map::new();
        funcs.insert("map".to_string(), Value::String(self.map_fun.clone()));
        if let Some(ref reduce) = self.reduce_fun {
            funcs.insert("reduce".to_string(), Value::String(reduce.clone()));
        }
        if !self.index_options.is_empty() {
            funcs.insert("options".to_string(), Value::Object(self.index_options.clone()));
        }
        Value::Object(funcs)
    }

    /// A query over this view seeded with the default options.
    #[must_use]
    pub fn query(&self) -> ViewQuery {
        let mut query = ViewQuery::new(self.design.clone(), self.name.clone());
        query.options.limit = self.defaults.limit;
        query.options.descending = self.defaults.descending;
        query.options.include_docs = self.defaults.include_docs;
        query
    }
}
