//! Progress reporting hooks
//!
//! Long-running operations (auto-merging a grid, building history) report
//! what they are doing through a [`ProgressCallback`]. The caller decides how
//! to render it; the library itself only logs through `tracing`.

use crate::grid::AttemptOutcome;
use crate::types::{Cell, CommitId};
use async_trait::async_trait;

/// Receives progress notifications
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A cell was attempted by the scheduler
    async fn on_attempt(&self, cell: Cell, outcome: &AttemptOutcome) {
        let _ = (cell, outcome);
    }

    /// A commit was written while building history
    async fn on_commit(&self, cell: Cell, commit: &CommitId) {
        let _ = (cell, commit);
    }

    /// Free-form status message
    async fn on_message(&self, message: &str);
}

/// Progress sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressCallback for NoProgress {
    async fn on_message(&self, _message: &str) {}
}
