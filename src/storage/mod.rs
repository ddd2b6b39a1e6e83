// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store backends.
//!
//! - [`couch`]: CouchDB HTTP API (production)
//! - [`memory`]: in-process store with a caller-seeded view index (tests, demos)

pub mod traits;
pub mod memory;
pub mod couch;

pub use traits::{DocumentStore, RemoteDesignDocument, StorageError, StoreConnector};
