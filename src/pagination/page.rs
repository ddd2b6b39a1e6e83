// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::error::ViewSyncError;

use super::cursor::Cursor;

/// One page of wrapped rows with links to its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Start of the following page
    pub next: Option<Cursor>,
    /// Start of the preceding page
    pub prev: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }

    /// Transform the items, keeping the cursors.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
            prev: self.prev,
        }
    }
}

/// Pagination parameters as received from a client (`?count=20&start=...`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub count: usize,
    #[serde(default)]
    pub start: Option<String>,
}

impl PageRequest {
    pub fn new(count: usize) -> Self {
        Self { count, start: None }
    }

    #[must_use]
    pub fn starting_at(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Check the parameters without touching the store.
    pub fn validate(&self) -> Result<(), ViewSyncError> {
        if self.count == 0 {
            return Err(ViewSyncError::InvalidPageSize(self.count));
        }
        self.cursor().map(|_| ())
    }

    /// The decoded start cursor, if any.
    pub fn cursor(&self) -> Result<Option<Cursor>, ViewSyncError> {
        self.start.as_deref().map(Cursor::decode).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_serializes_cursors_as_tokens() {
        let page = Page {
            items: vec![1, 2],
            next: Some(Cursor::new("c", "3")),
            prev: None,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value, json!({"items": [1, 2], "next": "[\"c\",\"3\"]", "prev": null}));
    }

    #[test]
    fn test_page_map_keeps_cursors() {
        let page = Page { items: vec![1, 2], next: Some(Cursor::new(2, "b")), prev: None };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert!(mapped.has_next());
        assert!(!mapped.has_prev());
    }

    #[test]
    fn test_request_deserialize() {
        let request: PageRequest = serde_json::from_value(json!({"count": 20})).unwrap();
        assert_eq!(request, PageRequest::new(20));

        let request: PageRequest =
            serde_json::from_value(json!({"count": 5, "start": "[\"k\",\"id\"]"})).unwrap();
        assert_eq!(request.cursor().unwrap(), Some(Cursor::new("k", "id")));
    }

    #[test]
    fn test_request_validation() {
        assert!(PageRequest::new(10).validate().is_ok());
        assert!(matches!(
            PageRequest::new(0).validate(),
            Err(ViewSyncError::InvalidPageSize(0))
        ));
        assert!(matches!(
            PageRequest::new(10).starting_at("garbage").validate(),
            Err(ViewSyncError::MalformedCursor(_))
        ));
    }
}
