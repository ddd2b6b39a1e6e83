// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Design documents: the store-side container of related views.
//!
//! The body is a `serde_json::Map`, which keeps keys ordered, so building a
//! document from the same definitions always yields the same bytes. Change
//! detection compares bodies by value and never needs the store's help.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::ViewSyncError;

use super::definition::{ViewDefinition, DEFAULT_LANGUAGE};

pub const DESIGN_PREFIX: &str = "_design/";

#[derive(Debug, Clone, PartialEq)]
pub struct DesignDocument {
    name: String,
    body: Map<String, Value>,
}

impl DesignDocument {
    /// Build the local design document for `name` from its view definitions.
    ///
    /// Fails when the definitions disagree on the function language; a design
    /// document has exactly one.
    pub fn from_definitions(
        name: impl Into<String>,
        definitions: &[Arc<ViewDefinition>],
    ) -> Result<Self, ViewSyncError> {
        let name = name.into();
        let languages: BTreeSet<&str> = definitions.iter().map(|d| d.language.as_str()).collect();
        if languages.len() > 1 {
            return Err(ViewSyncError::Configuration(format!(
                "design document '{}' mixes view languages {:?}",
                name, languages
            )));
        }
        let language = languages.into_iter().next().unwrap_or(DEFAULT_LANGUAGE).to_string();

        let mut views = Map::new();
        for def in definitions {
            views.insert(def.name.clone(), def.to_view_functions());
        }

        let mut body = Map::new();
        body.insert("language".to_string(), Value::String(language));
        body.insert("views".to_string(), Value::Object(views));

        Ok(Self { name, body })
    }

    /// Wrap an already-built body (e.g. one read back from the store).
    pub fn from_body(name: impl Into<String>, body: Map<String, Value>) -> Self {
        Self { name: name.into(), body }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store-side document id, `_design/<name>`.
    #[must_use]
    pub fn doc_id(&self) -> String {
        format!("{}{}", DESIGN_PREFIX, self.name)
    }

    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Mutable access for pre-write hooks.
    pub fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    #[must_use]
    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.body.get("language").and_then(Value::as_str)
    }

    #[must_use]
    pub fn views(&self) -> Option<&Map<String, Value>> {
        self.body.get("views").and_then(Value::as_object)
    }

    #[must_use]
    pub fn view(&self, name: &str) -> Option<&Value> {
        self.views().and_then(|views| views.get(name))
    }

    /// Canonical serialized body.
    #[must_use]
    pub fn serialized(&self) -> String {
        Value::Object(self.body.clone()).to_string()
    }

    /// SHA-256 of the canonical body, hex encoded.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.serialized().as_bytes()))
    }

    /// Whether a stored body already equals this document.
    #[must_use]
    pub fn matches(&self, remote: &Map<String, Value>) -> bool {
        &self.body == remote
    }

    /// Apply this document's views and language on top of a remote body.
    ///
    /// Fields the remote carries that are not views (validation functions,
    /// filters, ...) are kept. Remote views with no local declaration are kept
    /// too unless `remove_missing` is set; when kept, their language must
    /// agree with the local one.
    pub fn merged_onto(
        &self,
        remote: Option<&Map<String, Value>>,
        remove_missing: bool,
    ) -> Result<DesignDocument, ViewSyncError> {
        let mut body = remote.cloned().unwrap_or_default();
        let empty = Map::new();
        let local_views = self.views().unwrap_or(&empty);

        let mut views = match body.remove("views") {
            Some(Value::Object(views)) => views,
            _ => Map::new(),
        };
        let missing: Vec<String> = views
            .keys()
            .filter(|name| !local_views.contains_key(*name))
            .cloned()
            .collect();

        for (name, funcs) in local_views {
            views.insert(name.clone(), funcs.clone());
        }

        let mut languages = BTreeSet::new();
        languages.insert(self.language().unwrap_or(DEFAULT_LANGUAGE).to_string());
        if !missing.is_empty() {
            if remove_missing {
                for name in &missing {
                    views.remove(name);
                }
            } else if let Some(Value::String(language)) = body.get("language") {
                languages.insert(language.clone());
            }
        }
        if languages.len() > 1 {
            return Err(ViewSyncError::Configuration(format!(
                "design document '{}' would mix view languages {:?} (undeclared remote views: {:?})",
                self.name, languages, missing
            )));
        }

        let language = languages.into_iter().next().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        body.insert("language".to_string(), Value::String(language));
        body.insert("views".to_string(), Value::Object(views));

        Ok(DesignDocument { name: self.name.clone(), body })
    }
}
