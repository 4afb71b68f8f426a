//! Automatic merge scheduling
//!
//! Drives the micromerge engine over the frontier until the grid is complete
//! or every remaining path is blocked by a conflict.

use crate::backend::MergeBackend;
use crate::error::Result;
use crate::grid::{AttemptOutcome, FrontierTracker, MergeRecordStore, MicromergeEngine};
use crate::progress::ProgressCallback;
use crate::types::{Cell, MergeRecord};
use std::collections::HashSet;
use tracing::{debug, info};

/// Result of a scheduler run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// Cell `(n, m)` is resolved
    Complete,
    /// No further automatic progress; these cells need a human
    ConflictsPending(Vec<Cell>),
}

impl RunResult {
    /// Whether the grid is done
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Hook invoked after every cell write, used to persist the store
pub type SaveHook<'h> = dyn FnMut(&MergeRecordStore) -> Result<()> + Send + 'h;

/// Repeatedly attempts ready cells until a fixed point
pub struct AutoMergeScheduler<'a> {
    engine: MicromergeEngine<'a>,
    n: usize,
    m: usize,
    manual: bool,
}

impl<'a> AutoMergeScheduler<'a> {
    /// Create a scheduler for an `n` x `m` grid
    pub fn new(backend: &'a dyn MergeBackend, n: usize, m: usize) -> Self {
        Self {
            engine: MicromergeEngine::new(backend, n, m),
            n,
            m,
            manual: false,
        }
    }

    /// In manual mode every ready cell is handed to a human instead of the backend
    #[must_use]
    pub const fn manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    /// Run until the grid is complete or stalled on conflicts.
    ///
    /// Cells are attempted only once both standard predecessors are
    /// resolved. Conflicts are terminal until resolved by hand, so they are
    /// never retried here. `on_write` runs after each record that changed the
    /// store, so an interrupted run loses at most the cell in flight.
    pub async fn run(
        &self,
        store: &mut MergeRecordStore,
        progress: &dyn ProgressCallback,
        on_write: &mut SaveHook<'_>,
    ) -> Result<RunResult> {
        let mut attempted: HashSet<Cell> = HashSet::new();

        loop {
            let tracker = FrontierTracker::new(store, self.n, self.m);
            if tracker.is_complete() {
                info!(n = self.n, m = self.m, "merge grid complete");
                return Ok(RunResult::Complete);
            }

            let candidates: Vec<Cell> = tracker
                .next_candidates()
                .into_iter()
                .filter(|cell| !attempted.contains(cell))
                .collect();
            if candidates.is_empty() {
                break;
            }
            debug!(count = candidates.len(), "scheduling pass");

            let mut progressed = false;
            for cell in candidates {
                attempted.insert(cell);
                let outcome = self.attempt(store, cell).await?;
                if matches!(
                    outcome,
                    AttemptOutcome::Clean { .. } | AttemptOutcome::Conflict { .. }
                ) {
                    on_write(store)?;
                }
                if let AttemptOutcome::Clean {
                    duplicate_of: Some(other),
                    ..
                } = &outcome
                {
                    debug!(%cell, %other, "merge reproduced an existing tree");
                }
                progress.on_attempt(cell, &outcome).await;
                progressed |= outcome.is_progress();
            }

            if !progressed {
                break;
            }
        }

        let blockers = FrontierTracker::new(store, self.n, self.m).blockers();
        info!(pending = blockers.len(), "automatic merging stalled");
        Ok(RunResult::ConflictsPending(blockers))
    }

    async fn attempt(&self, store: &mut MergeRecordStore, cell: Cell) -> Result<AttemptOutcome> {
        if self.manual {
            store.put(cell, MergeRecord::Conflict { partial: None })?;
            debug!(%cell, "queued for manual merge");
            return Ok(AttemptOutcome::Conflict { partial: None });
        }
        self.engine.attempt(store, cell).await
    }
}
