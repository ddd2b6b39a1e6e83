// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ViewSyncError;
use crate::view::query::Row;

/// Position of a row in a view: its key plus the document id that breaks
/// ties between equal keys.
///
/// On the wire a cursor is the JSON text `[key, "id"]`. Clients treat it as
/// opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cursor {
    pub key: Value,
    pub id: String,
}

impl Cursor {
    pub fn new(key: impl Into<Value>, id: impl Into<String>) -> Self {
        Self { key: key.into(), id: id.into() }
    }

    /// Cursor pointing at `row`.
    pub fn from_row(row: &Row) -> Self {
        Self { key: row.key.clone(), id: row.id.clone() }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        Value::Array(vec![self.key.clone(), Value::String(self.id.clone())]).to_string()
    }

    /// Parse a `[key, "id"]` token.
    pub fn decode(token: &str) -> Result<Self, ViewSyncError> {
        let value: Value = serde_json::from_str(token)
            .map_err(|e| ViewSyncError::MalformedCursor(format!("not JSON: {}", e)))?;

        let mut items = match value {
            Value::Array(items) if items.len() == 2 => items,
            Value::Array(items) => {
                return Err(ViewSyncError::MalformedCursor(format!(
                    "expected 2 elements, got {}",
                    items.len()
                )))
            }
            other => {
                return Err(ViewSyncError::MalformedCursor(format!(
                    "expected [key, id], got {}",
                    json_type(&other)
                )))
            }
        };

        let id = match items.pop() {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(ViewSyncError::MalformedCursor(format!(
                    "document id must be a string, got {}",
                    json_type(&other)
                )))
            }
            None => return Err(ViewSyncError::MalformedCursor("missing document id".into())),
        };
        let key = items.pop().unwrap_or(Value::Null);

        Ok(Self { key, id })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = ViewSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.encode()
    }
}

impl TryFrom<String> for Cursor {
    type Error = ViewSyncError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Self::decode(&token)
    }
}
