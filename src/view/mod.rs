// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! View declarations and queries.
//!
//! # Architecture
//!
//! ```text
//! ViewDefinition (design, name, map, reduce?)
//!     ↓  registered per document type or standalone
//! ViewRegistry
//!     ↓  grouped by design name
//! DesignDocument (canonical body, compared against the store)
//! ```

pub mod collation;
mod definition;
mod design;
pub mod query;
mod registry;

pub use definition::{QueryDefaults, ViewDefinition, DEFAULT_LANGUAGE};
pub use design::{DesignDocument, DESIGN_PREFIX};
pub use query::{QueryOptions, Row, ViewQuery};
pub use registry::{DocumentViews, Owner, ViewRegistry};
