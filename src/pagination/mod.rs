// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cursor pagination over view results.
//!
//! # Architecture
//!
//! ```text
//! paginate(query, count = N, start)
//!       │
//!       ├─→ start = None
//!       │        └─→ read N+1 ─→ row N+1 becomes `next`
//!       │
//!       └─→ start = [key, id]
//!                ├─→ read N+1 forward from (key, id)      ┐ concurrent
//!                └─→ read N backward, skip 1, reversed    ┘
//!                         └─→ last row becomes `prev`
//! ```
//!
//! Cursors carry the document id alongside the key, so pages stay exact
//! even when many rows share one key.

mod cursor;
mod engine;
mod page;
mod wrapper;

pub use cursor::Cursor;
pub use engine::{paginate, query_rows, Paginator};
pub use page::{Page, PageRequest};
pub use wrapper::{DocumentRows, RawRows, RowWrapper};
