// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Crate-level error type.
//!
//! Store failures keep their own [`StorageError`] and are wrapped here so
//! callers can tell client-input failures (bad cursor, bad page size) from
//! retryable backend failures.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::storage::traits::StorageError;

#[derive(Error, Debug)]
pub enum ViewSyncError {
    /// Conflicting view declarations. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The `start` parameter did not decode to a `[key, id]` pair.
    #[error("Malformed cursor: {0}")]
    MalformedCursor(String),

    #[error("Invalid page size {0}: must be at least 1")]
    InvalidPageSize(usize),

    #[error(transparent)]
    Store(#[from] StorageError),

    /// Design documents are current but at least one post-sync callback failed.
    #[error("{} sync callback(s) failed: {}", .failures.len(), CallbackFailures(.failures))]
    SyncCallbacks { failures: Vec<CallbackFailure> },

    #[error("Row wrapping failed: {0}")]
    RowWrap(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ViewSyncError {
    /// Failures caused by caller input; map these to a 4xx response.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedCursor(_) | Self::InvalidPageSize(_))
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

/// One failed post-sync callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Position in registration order.
    pub index: usize,
    pub name: String,
    pub message: String,
}

struct CallbackFailures<'a>(&'a [CallbackFailure]);

impl fmt::Display for CallbackFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "#{} {}: {}", failure.index, failure.name, failure.message)?;
        }
        Ok(())
    }
}
