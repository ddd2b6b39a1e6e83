// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Design document synchronization.
//!
//! # Architecture
//!
//! ```text
//! sync(store)
//!       │
//!       ├─→ ensure_collection_exists
//!       │
//!       ├─→ for each local DesignDocument
//!       │        │
//!       │        ├─→ read remote (content + revision)
//!       │        ├─→ merge local views onto remote body
//!       │        └─→ differs? hook → write with revision
//!       │                 │
//!       │                 └─→ conflict? re-read once, accept if converged
//!       │
//!       └─→ run on_sync callbacks (failures collected, never short-circuit)
//! ```

mod manager;
mod types;

pub use manager::SyncManager;
pub use types::{CallbackError, DesignDocOutcome, DesignDocumentHook, SyncCallback, SyncReport};
