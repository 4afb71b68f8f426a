//! Version-control backend interface
//!
//! The engine never touches object storage, refs or the working tree
//! directly. Everything it needs from the repository goes through
//! [`MergeBackend`], so the same grid logic works against git or against an
//! in-memory test double.

use crate::error::Result;
use crate::types::{Cell, CommitId, TreeId};
use async_trait::async_trait;

/// Result of a three-way tree merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeMerge {
    /// Merged without conflicts
    Clean(TreeId),
    /// Conflicted; carries the partially merged tree when the backend keeps one
    Conflict(Option<TreeId>),
}

/// Inputs for a manual merge checked out into the scratch area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchRequest {
    /// Session the checkout belongs to
    pub session: String,
    /// Cell being resolved
    pub cell: Cell,
    /// Common ancestor tree of the two parents
    pub base: TreeId,
    /// First parent tree, cell `(i, j-1)`
    pub ours: TreeId,
    /// Second parent tree, cell `(i-1, j)`
    pub theirs: TreeId,
    /// Partial merge with conflict markers, if recorded
    pub partial: Option<TreeId>,
}

/// Backend operations consumed by the merge-grid engine
///
/// Writes must be content-addressed: creating the same commit twice yields
/// the same id, so interrupted history building can simply be re-run.
#[async_trait]
pub trait MergeBackend: Send + Sync {
    /// Three-way merge of two trees against their common ancestor
    async fn merge_trees(&self, base: &TreeId, ours: &TreeId, theirs: &TreeId)
    -> Result<TreeMerge>;

    /// Create a commit object with the given tree, parents and message
    async fn create_commit(
        &self,
        tree: &TreeId,
        parents: &[CommitId],
        message: &str,
    ) -> Result<CommitId>;

    /// Create or move a branch to point at `commit`
    async fn move_ref(&self, branch: &str, commit: &CommitId) -> Result<()>;

    /// Parents of a commit, first parent first
    async fn read_commit_parents(&self, commit: &CommitId) -> Result<Vec<CommitId>>;

    /// Tree of a commit
    async fn read_commit_tree(&self, commit: &CommitId) -> Result<TreeId>;

    /// Full log message of a commit
    async fn read_commit_message(&self, commit: &CommitId) -> Result<String>;

    /// Resolve a branch name (or other revision) to a commit, if it exists
    async fn resolve_ref(&self, name: &str) -> Result<Option<CommitId>>;

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own ancestor)
    async fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool>;

    /// Check out a conflicting merge for a human to edit
    async fn checkout_scratch(&self, request: &ScratchRequest) -> Result<()>;

    /// Restore the working tree after a manual merge finished or was abandoned
    async fn release_scratch(&self) -> Result<()>;
}
