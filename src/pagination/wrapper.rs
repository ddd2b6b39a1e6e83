// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::ViewSyncError;
use crate::view::query::Row;

/// Turns a raw view row into the item type a caller wants.
///
/// Any `Fn(Row) -> T` is a wrapper; [`RawRows`] and [`DocumentRows`] cover
/// the common cases.
pub trait RowWrapper<T>: Send + Sync {
    fn wrap(&self, row: Row) -> Result<T, ViewSyncError>;
}

impl<T, F> RowWrapper<T> for F
where
    F: Fn(Row) -> T + Send + Sync,
{
    fn wrap(&self, row: Row) -> Result<T, ViewSyncError> {
        Ok(self(row))
    }
}

/// Rows passed through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRows;

impl RowWrapper<Row> for RawRows {
    fn wrap(&self, row: Row) -> Result<Row, ViewSyncError> {
        Ok(row)
    }
}

/// Deserializes the embedded document into `T`, falling back to the row's
/// value when the query did not include documents.
pub struct DocumentRows<T>(PhantomData<fn() -> T>);

impl<T> DocumentRows<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DocumentRows<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for DocumentRows<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentRows<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> RowWrapper<T> for DocumentRows<T> {
    fn wrap(&self, row: Row) -> Result<T, ViewSyncError> {
        let Row { id, value, doc, .. } = row;
        serde_json::from_value(doc.unwrap_or(value))
            .map_err(|e| ViewSyncError::RowWrap(format!("row '{}': {}", id, e)))
    }
}
