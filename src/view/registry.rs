// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Registry of declared views.
//!
//! Views come from two places: document types, which declare the views over
//! their own documents through [`DocumentViews`], and standalone views.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use view_sync::view::{DocumentViews, ViewDefinition, ViewRegistry};
//!
//! struct Restaurant;
//!
//! impl DocumentViews for Restaurant {
//!     const DOC_TYPE: &'static str = "restaurant";
//!
//!     fn view_definitions() -> Vec<Arc<ViewDefinition>> {
//!         vec![ViewDefinition::new(
//!             "restaurants",
//!             "by_name",
//!             "function(doc) { if (doc.doc_type == 'restaurant') emit(doc.name, null); }",
//!         )
//!         .shared()]
//!     }
//! }
//!
//! let registry = ViewRegistry::new();
//! registry.add_document::<Restaurant>().unwrap();
//! registry
//!     .add_view(ViewDefinition::new("stats", "all_ids", "function(doc) { emit(doc._id, null); }").shared())
//!     .unwrap();
//!
//! let groups = registry.all_definitions();
//! assert_eq!(groups[0].0, "restaurants");
//! assert_eq!(groups[1].0, "stats");
//! ```
//!
//! # Design
//!
//! - **Stable order**: document-owned views first, in registration order, then
//!   standalone views
//! - **Strict identity**: a `(design, view)` pair may only be registered again
//!   with the very same `Arc`; anything else is a configuration error
//! - **Thread-safe**: `parking_lot::RwLock`, registration through `&self`

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::ViewSyncError;

use super::definition::ViewDefinition;
use super::design::DesignDocument;

/// Who declared a set of views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A document type, keyed by its `doc_type` tag
    Document(String),
    Standalone,
}

/// Implemented by each document type that declares views over its documents.
pub trait DocumentViews {
    /// Value of the `doc_type` field on documents of this type
    const DOC_TYPE: &'static str;

    fn view_definitions() -> Vec<Arc<ViewDefinition>>;
}

#[derive(Debug, Default)]
struct Registrations {
    documents: Vec<(String, Vec<Arc<ViewDefinition>>)>,
    standalone: Vec<Arc<ViewDefinition>>,
}

impl Registrations {
    fn iter_except<'a>(&'a self, skip_owner: Option<&'a str>) -> impl Iterator<Item = &'a Arc<ViewDefinition>> + 'a {
        self.documents
            .iter()
            .filter(move |(owner, _)| Some(owner.as_str()) != skip_owner)
            .flat_map(|(_, defs)| defs.iter())
            .chain(self.standalone.iter())
    }

    fn iter_ordered(&self) -> impl Iterator<Item = &Arc<ViewDefinition>> {
        self.iter_except(None)
    }
}

#[derive(Debug, Default)]
pub struct ViewRegistry {
    inner: RwLock<Registrations>,
}

impl ViewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register view definitions for an owner.
    ///
    /// Registering a document owner again replaces its previous list.
    /// Returns the number of definitions now held for the owner (standalone:
    /// the number added).
    pub fn register<I>(&self, definitions: I, owner: Owner) -> Result<usize, ViewSyncError>
    where
        I: IntoIterator<Item = Arc<ViewDefinition>>,
    {
        let definitions: Vec<Arc<ViewDefinition>> = definitions.into_iter().collect();
        let mut inner = self.inner.write();

        let replaced_owner = match owner {
            Owner::Document(ref doc_type) => Some(doc_type.as_str()),
            Owner::Standalone => None,
        };

        for (i, def) in definitions.iter().enumerate() {
            let earlier = definitions[..i].iter();
            for existing in inner.iter_except(replaced_owner).chain(earlier) {
                if existing.identity() == def.identity() && !Arc::ptr_eq(existing, def) {
                    return Err(ViewSyncError::Configuration(format!(
                        "view '{}/{}' is declared twice with different definitions",
                        def.design, def.name
                    )));
                }
            }
        }

        let count = definitions.len();
        match owner {
            Owner::Document(doc_type) => {
                info!(doc_type = %doc_type, views = count, "Document views registered");
                if let Some(slot) = inner.documents.iter_mut().find(|(o, _)| *o == doc_type) {
                    slot.1 = definitions;
                } else {
                    inner.documents.push((doc_type, definitions));
                }
            }
            Owner::Standalone => {
                debug!(views = count, "Standalone views registered");
                inner.standalone.extend(definitions);
            }
        }

        Ok(count)
    }

    /// Register the views a document type declares.
    pub fn add_document<D: DocumentViews>(&self) -> Result<usize, ViewSyncError> {
        self.register(D::view_definitions(), Owner::Document(D::DOC_TYPE.to_string()))
    }

    /// Register one standalone view.
    pub fn add_view(&self, definition: Arc<ViewDefinition>) -> Result<usize, ViewSyncError> {
        self.register([definition], Owner::Standalone)
    }

    /// Register several standalone views.
    pub fn add_views<I>(&self, definitions: I) -> Result<usize, ViewSyncError>
    where
        I: IntoIterator<Item = Arc<ViewDefinition>>,
    {
        self.register(definitions, Owner::Standalone)
    }

    /// All definitions grouped by design document, in stable order.
    ///
    /// Groups appear in order of their first definition; a definition
    /// registered more than once (same `Arc`) appears once.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<(String, Vec<Arc<ViewDefinition>>)> {
        let inner = self.inner.read();
        let mut groups: Vec<(String, Vec<Arc<ViewDefinition>>)> = Vec::new();

        for def in inner.iter_ordered() {
            match groups.iter_mut().find(|(design, _)| *design == def.design) {
                Some((_, defs)) => {
                    if !defs.iter().any(|d| Arc::ptr_eq(d, def)) {
                        defs.push(def.clone());
                    }
                }
                None => groups.push((def.design.clone(), vec![def.clone()])),
            }
        }

        groups
    }

    /// Locally computed design documents, same order as [`all_definitions`](Self::all_definitions).
    pub fn design_documents(&self) -> Result<Vec<DesignDocument>, ViewSyncError> {
        self.all_definitions()
            .into_iter()
            .map(|(design, defs)| DesignDocument::from_definitions(design, &defs))
            .collect()
    }

    /// Look up one definition by identity.
    #[must_use]
    pub fn get(&self, design: &str, name: &str) -> Option<Arc<ViewDefinition>> {
        self.inner
            .read()
            .iter_ordered()
            .find(|def| def.identity() == (design, name))
            .cloned()
    }

    /// Document types with registered views, in registration order.
    #[must_use]
    pub fn document_types(&self) -> Vec<String> {
        self.inner.read().documents.iter().map(|(owner, _)| owner.clone()).collect()
    }

    /// Number of distinct registered views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.all_definitions().iter().map(|(_, defs)| defs.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
