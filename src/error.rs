//! Error types for imerge

use crate::types::{Cell, CommitId, TreeId};
use thiserror::Error;

/// Errors produced by the merge-grid engine and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// A resolved cell was asked to take a different tree
    #[error("cell {cell} is already resolved to {existing}; refusing to overwrite with {attempted}")]
    ImmutableOverwrite {
        /// Cell being written
        cell: Cell,
        /// Tree already recorded
        existing: TreeId,
        /// Tree that was offered
        attempted: TreeId,
    },

    /// A record tried to move backward through its lifecycle
    #[error("cell {cell} cannot go from {from} to {to}")]
    InvalidTransition {
        /// Cell being written
        cell: Cell,
        /// State currently recorded
        from: &'static str,
        /// State that was offered
        to: &'static str,
    },

    /// A cell was attempted before any of its predecessors were resolved
    #[error("cell {0} has no resolved predecessor")]
    NoValidPredecessor(Cell),

    /// A cell lies outside the grid
    #[error("cell {cell} is outside the {n}x{m} grid")]
    CellOutOfRange {
        /// Offending cell
        cell: Cell,
        /// Length of branch A
        n: usize,
        /// Length of branch B
        m: usize,
    },

    /// Conflicts must be resolved by hand before the command can proceed
    #[error("manual merges pending: {}", format_cells(.0))]
    ConflictPending(Vec<Cell>),

    /// Writing a commit or reference failed; safe to retry
    #[error("backend write failed: {0}")]
    BackendWrite(String),

    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),

    /// The grid is not complete enough for the requested goal
    #[error("merge grid is incomplete; unresolved: {}", format_cells(.0))]
    IncompleteGrid(Vec<Cell>),

    /// One branch is already contained in the other
    #[error("nothing to do: {0} is already merged into {1}")]
    NothingToDo(String, String),

    /// The two tips share no history
    #[error("{0} and {1} do not have a common ancestor")]
    NoCommonAncestor(String, String),

    /// A commit in a merged range has several parents and first-parent mode is off
    #[error("history is not linear at commit {0}; retry with first-parent")]
    NonlinearAncestry(CommitId),

    /// Rebase goals cannot replay merge commits
    #[error("branch contains merge commits, which cannot be rebased: {}", format_commits(.0))]
    MergeCommitsInBranch(Vec<CommitId>),

    /// A session or branch name was rejected
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A session with this name already exists
    #[error("imerge session '{0}' already exists")]
    SessionExists(String),

    /// No session with this name exists
    #[error("imerge session '{0}' not found")]
    SessionNotFound(String),

    /// A branch or reference could not be resolved
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Moving the branch would discard history
    #[error("{branch} cannot be fast-forwarded to {commit}; use force to override")]
    NotFastForward {
        /// Branch being moved
        branch: String,
        /// Proposed new tip
        commit: CommitId,
    },

    /// A scratch checkout is already in progress
    #[error("a manual merge of {0} is already checked out")]
    ScratchInUse(Cell),

    /// No scratch checkout is in progress
    #[error("no manual merge is in progress")]
    NoManualMerge,

    /// Session state could not be read or written
    #[error("session state error: {0}")]
    State(String),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same operation may succeed.
    ///
    /// Backend writes are content-addressed, so repeating them is harmless.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendWrite(_) | Self::Backend(_))
    }

    /// Whether the error indicates a bug or corrupted data rather than a user
    /// or environment problem.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ImmutableOverwrite { .. }
                | Self::NoValidPredecessor(_)
                | Self::InvalidTransition { .. }
                | Self::Internal(_)
        )
    }
}

fn format_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_commits(commits: &[CommitId]) -> String {
    commits
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using the crate's error
pub type Result<T> = std::result::Result<T, Error>;
