// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the sync manager.

use async_trait::async_trait;

use crate::storage::traits::DocumentStore;
use crate::view::DesignDocument;

/// Error type returned by post-sync callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Work to run once design documents are current, such as seeding reference
/// documents or warming a view index.
#[async_trait]
pub trait SyncCallback: Send + Sync {
    /// Label used in logs, metrics and [`CallbackFailure`](crate::CallbackFailure).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn on_sync(&self, store: &dyn DocumentStore) -> Result<(), CallbackError>;
}

/// Last chance to modify a design document before it is written.
///
/// Only runs when a write is about to happen; unchanged documents are never
/// passed through the hook.
pub trait DesignDocumentHook: Send + Sync {
    fn update_design_doc(&self, doc: &mut DesignDocument);
}

impl<F> DesignDocumentHook for F
where
    F: Fn(&mut DesignDocument) + Send + Sync,
{
    fn update_design_doc(&self, doc: &mut DesignDocument) {
        self(doc)
    }
}

/// What happened to one design document during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignDocOutcome {
    /// Remote copy already matched
    Unchanged,
    /// This process wrote a new revision
    Written,
    /// Our write lost a race, but the winner wrote the same content
    Converged,
}

impl std::fmt::Display for DesignDocOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Written => write!(f, "written"),
            Self::Converged => write!(f, "converged"),
        }
    }
}

/// Summary of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Design documents compared against the store
    pub checked: usize,
    /// Design documents written by this pass
    pub written: usize,
    /// Design documents that needed no write (includes converged races)
    pub unchanged: usize,
    /// Post-sync callbacks invoked
    pub callbacks_run: usize,
}

impl SyncReport {
    pub(crate) fn count(&mut self, outcome: DesignDocOutcome) {
        self.checked += 1;
        match outcome {
            DesignDocOutcome::Written => self.written += 1,
            DesignDocOutcome::Unchanged | DesignDocOutcome::Converged => self.unchanged += 1,
        }
    }
}
