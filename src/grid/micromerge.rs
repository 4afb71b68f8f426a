//! Micromerge engine - one pairwise merge per call
//!
//! Input selection is pure ([`merge_inputs`]); only [`MicromergeEngine::attempt`]
//! talks to the backend.

use crate::backend::{MergeBackend, TreeMerge};
use crate::error::{Error, Result};
use crate::grid::MergeRecordStore;
use crate::types::{Cell, MergeRecord, TreeId};
use tracing::{debug, info};

/// Which pair of resolved cells feeds a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeBasis {
    /// `(i, j-1)` and `(i-1, j)` over their shared corner `(i-1, j-1)`
    Diagonal,
    /// `(i-1, j)` plus the original commit A[i] over A[i-1]
    EdgeA,
    /// `(i, j-1)` plus the original commit B[j] over B[j-1]
    EdgeB,
}

/// Trees to hand to a three-way merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInputs {
    /// Which predecessors were used
    pub basis: MergeBasis,
    /// Common ancestor of `ours` and `theirs`
    pub base: TreeId,
    /// First parent
    pub ours: TreeId,
    /// Second parent
    pub theirs: TreeId,
}

/// Result of attempting one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The cell already had a tree; nothing was merged
    AlreadyResolved(TreeId),
    /// Merged cleanly and recorded
    Clean {
        /// Resulting tree
        tree: TreeId,
        /// Another cell that already had the identical tree
        duplicate_of: Option<Cell>,
    },
    /// Conflicted; manual resolution required
    Conflict {
        /// Partial result kept by the backend
        partial: Option<TreeId>,
    },
    /// The cell was already recorded as conflicted and was not retried
    Blocked,
}

impl AttemptOutcome {
    /// Whether this attempt produced a new tree
    pub const fn is_progress(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }

    /// Whether the cell needs a human
    pub const fn needs_manual(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Blocked)
    }
}

fn edge_tree(store: &MergeRecordStore, cell: Cell) -> Result<TreeId> {
    store
        .tree(cell)
        .cloned()
        .ok_or_else(|| Error::Internal(format!("original commit at {cell} has no tree")))
}

/// Choose the parents and base for merging `cell`.
///
/// Both standard predecessors resolved (with their shared corner) gives a
/// diagonal merge; otherwise the single resolved predecessor is merged with
/// the matching original commit.
pub fn merge_inputs(store: &MergeRecordStore, cell: Cell) -> Result<MergeInputs> {
    let left = cell.left().and_then(|c| store.tree(c).cloned());
    let above = cell.above().and_then(|c| store.tree(c).cloned());
    let corner = Cell::new(cell.i.saturating_sub(1), cell.j.saturating_sub(1));

    match (left, above) {
        (Some(left), Some(above)) if store.is_resolved(corner) => Ok(MergeInputs {
            basis: MergeBasis::Diagonal,
            base: edge_tree(store, corner)?,
            ours: above,
            theirs: left,
        }),
        (Some(left), _) => Ok(MergeInputs {
            basis: MergeBasis::EdgeA,
            base: edge_tree(store, Cell::new(cell.i - 1, 0))?,
            ours: left,
            theirs: edge_tree(store, Cell::new(cell.i, 0))?,
        }),
        (None, Some(above)) => Ok(MergeInputs {
            basis: MergeBasis::EdgeB,
            base: edge_tree(store, Cell::new(0, cell.j - 1))?,
            ours: above,
            theirs: edge_tree(store, Cell::new(0, cell.j))?,
        }),
        (None, None) => Err(Error::NoValidPredecessor(cell)),
    }
}

/// Requests single pairwise merges from the backend and records them
pub struct MicromergeEngine<'a> {
    backend: &'a dyn MergeBackend,
    n: usize,
    m: usize,
}

impl<'a> MicromergeEngine<'a> {
    /// Create an engine for an `n` x `m` grid
    pub fn new(backend: &'a dyn MergeBackend, n: usize, m: usize) -> Self {
        Self { backend, n, m }
    }

    /// Attempt to merge `cell` and record the outcome in `store`.
    ///
    /// Re-attempting a resolved cell is a no-op returning its tree. A cell
    /// already recorded as conflicted is not retried: its inputs cannot
    /// change, so only a human can move it forward.
    pub async fn attempt(
        &self,
        store: &mut MergeRecordStore,
        cell: Cell,
    ) -> Result<AttemptOutcome> {
        if cell.i > self.n || cell.j > self.m {
            return Err(Error::CellOutOfRange {
                cell,
                n: self.n,
                m: self.m,
            });
        }

        match store.get(cell) {
            MergeRecord::Clean { tree } | MergeRecord::ManuallyResolved { tree } => {
                return Ok(AttemptOutcome::AlreadyResolved(tree.clone()));
            }
            MergeRecord::Conflict { .. } => return Ok(AttemptOutcome::Blocked),
            MergeRecord::Unknown => {}
        }
        if cell.is_edge() {
            return Err(Error::Internal(format!(
                "original commit at {cell} was never recorded"
            )));
        }

        let inputs = merge_inputs(store, cell)?;
        debug!(%cell, basis = ?inputs.basis, base = %inputs.base, "attempting micromerge");

        match self
            .backend
            .merge_trees(&inputs.base, &inputs.ours, &inputs.theirs)
            .await?
        {
            TreeMerge::Clean(tree) => {
                let duplicate_of = store.cell_with_tree(&tree);
                store.put(cell, MergeRecord::Clean { tree: tree.clone() })?;
                info!(%cell, %tree, "merged cleanly");
                Ok(AttemptOutcome::Clean { tree, duplicate_of })
            }
            TreeMerge::Conflict(partial) => {
                store.put(
                    cell,
                    MergeRecord::Conflict {
                        partial: partial.clone(),
                    },
                )?;
                info!(%cell, "conflict; manual merge required");
                Ok(AttemptOutcome::Conflict { partial })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_clean(store: &mut MergeRecordStore, i: usize, j: usize, tree: &str) {
        store
            .put(
                Cell::new(i, j),
                MergeRecord::Clean {
                    tree: TreeId::new(tree),
                },
            )
            .unwrap();
    }

    fn edges() -> MergeRecordStore {
        let mut store = MergeRecordStore::new();
        put_clean(&mut store, 0, 0, "base");
        put_clean(&mut store, 1, 0, "a1");
        put_clean(&mut store, 2, 0, "a2");
        put_clean(&mut store, 0, 1, "b1");
        put_clean(&mut store, 0, 2, "b2");
        store
    }

    #[test]
    fn test_first_interior_cell_is_diagonal() {
        let store = edges();
        let inputs = merge_inputs(&store, Cell::new(1, 1)).unwrap();
        assert_eq!(inputs.basis, MergeBasis::Diagonal);
        assert_eq!(inputs.base.as_str(), "base");
        assert_eq!(inputs.ours.as_str(), "a1");
        assert_eq!(inputs.theirs.as_str(), "b1");
    }

    #[test]
    fn test_single_predecessor_uses_original_commit() {
        let mut store = edges();
        put_clean(&mut store, 1, 1, "m11");

        let diagonal = merge_inputs(&store, Cell::new(2, 1)).unwrap();
        assert_eq!(diagonal.basis, MergeBasis::Diagonal);

        assert!(matches!(
            merge_inputs(&store, Cell::new(2, 2)),
            Err(Error::NoValidPredecessor(_))
        ));

        // (1,2) is still unknown, so (2,2) can only extend (2,1) with B[2]
        put_clean(&mut store, 2, 1, "m21");
        let edge = merge_inputs(&store, Cell::new(2, 2)).unwrap();
        assert_eq!(edge.basis, MergeBasis::EdgeB);
        assert_eq!(edge.base.as_str(), "b1");
        assert_eq!(edge.ours.as_str(), "m21");
        assert_eq!(edge.theirs.as_str(), "b2");
    }

    #[test]
    fn test_left_only_uses_branch_a_commit() {
        let mut store = edges();
        put_clean(&mut store, 1, 1, "m11");
        put_clean(&mut store, 1, 2, "m12");

        let inputs = merge_inputs(&store, Cell::new(2, 2)).unwrap();
        assert_eq!(inputs.basis, MergeBasis::EdgeA);
        assert_eq!(inputs.base.as_str(), "a1");
        assert_eq!(inputs.ours.as_str(), "m12");
        assert_eq!(inputs.theirs.as_str(), "a2");
    }
}
