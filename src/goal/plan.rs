//! Goal planning - pure functions for turning a resolved grid into commits
//!
//! This module contains the pure, testable logic for simplification. No I/O
//! happens here: the boundary and record store are passed in, and commits
//! that do not exist yet are referred to by their step index.

use crate::error::{Error, Result};
use crate::grid::{FrontierTracker, MergeRecordStore};
use crate::types::{Boundary, Cell, CommitId, Goal, TreeId};
use std::collections::HashMap;
use tracing::debug;

/// Where a planned commit's parent comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// A commit that already exists
    Commit(CommitId),
    /// The commit created by an earlier step of the same plan
    Step(usize),
}

/// Log message for a planned commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMessage {
    /// Use this text as-is
    Text(String),
    /// Copy the message of `commit` and append `note` as its own paragraph
    CopyFrom {
        /// Commit whose message is copied
        commit: CommitId,
        /// Provenance line appended after a blank line
        note: String,
    },
}

/// A single commit to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Grid cell the tree is taken from
    pub cell: Cell,
    /// Tree of the new commit
    pub tree: TreeId,
    /// Parents, first parent first
    pub parents: Vec<ParentRef>,
    /// Log message
    pub message: CommitMessage,
    /// Original commit this step replays, for rebase-style goals
    pub replays: Option<CommitId>,
}

/// Goal plan - the functional core output
///
/// Created by [`create_goal_plan`] (pure) and executed by
/// [`execute_plan`](crate::goal::execute_plan) (effectful). Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalPlan {
    /// Goal that was requested
    pub goal: Goal,
    /// Goal whose shape the steps follow; differs from `goal` when an
    /// all-clean grid collapsed to a single merge
    pub shape: Goal,
    /// Commits to create, in dependency order
    pub steps: Vec<PlanStep>,
    /// Original tips the result may replace without containing them
    pub supersedes: Vec<CommitId>,
}

impl GoalPlan {
    /// Number of commits the plan creates
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan creates nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Tree of the final commit
    #[must_use]
    pub fn final_tree(&self) -> Option<&TreeId> {
        self.steps.last().map(|step| &step.tree)
    }

    /// Cells that become commits, in plan order
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        self.steps.iter().map(|step| step.cell).collect()
    }
}

/// Create a goal plan (PURE - no I/O, easily testable)
///
/// The grid must be complete (`(n, m)` resolved) and, depending on the goal,
/// further cells must be resolved too: every interior cell for `full`, the
/// last column for rebase goals. A grid that never needed a human collapses
/// to a single merge for every goal except `full`.
///
/// # Errors
/// `IncompleteGrid` listing the missing cells, or `MergeCommitsInBranch` when
/// a rebase goal would have to replay merge commits.
pub fn create_goal_plan(
    session: &str,
    boundary: &Boundary,
    store: &MergeRecordStore,
    goal: Goal,
) -> Result<GoalPlan> {
    let tracker = FrontierTracker::new(store, boundary.n(), boundary.m());
    if !tracker.is_complete() {
        return Err(Error::IncompleteGrid(tracker.unresolved()));
    }
    if goal.is_rebase() && !boundary.merges_b.is_empty() {
        return Err(Error::MergeCommitsInBranch(boundary.merges_b.clone()));
    }

    let shape = if goal != Goal::Full && store.manual_cells().is_empty() {
        debug!(%goal, "no manual merges; collapsing to a single merge");
        Goal::Merge
    } else {
        goal
    };

    let planner = Planner {
        session,
        boundary,
        store,
        tracker,
    };
    let steps = match shape {
        Goal::Full => planner.full()?,
        Goal::Merge => planner.merge()?,
        Goal::Rebase => planner.rebase(false)?,
        Goal::RebaseWithHistory => planner.rebase(true)?,
        Goal::Border => planner.border(false)?,
        Goal::BorderWithHistory => planner.border(true)?,
    };

    // A plain rebase drops B's originals on purpose, so moving B's branch
    // onto it is still an update rather than lost history
    let supersedes = if shape == Goal::Rebase {
        vec![planner.b(boundary.m())?]
    } else {
        Vec::new()
    };

    Ok(GoalPlan {
        goal,
        shape,
        steps,
        supersedes,
    })
}

/// Staircase of resolved cells from `(0, 0)` to `apex`, in forward order.
///
/// Walks backward from `apex`, one step along A or B at a time. Where both
/// predecessors are resolved it keeps to the one dominating more manually
/// resolved cells, so the path runs through the merges a human had to do;
/// ties step back along branch B.
///
/// # Errors
/// `IncompleteGrid` if the walk reaches a cell with no resolved predecessor.
pub fn border_path(store: &MergeRecordStore, apex: Cell) -> Result<Vec<Cell>> {
    let manual = store.manual_cells();
    let score = |cell: Cell| manual.iter().filter(|m| cell.dominates(**m)).count();

    let mut path = vec![apex];
    let mut cell = apex;
    while cell != Cell::origin() {
        cell = match (cell.left(), cell.above()) {
            (Some(left), Some(above)) => {
                match (store.is_resolved(left), store.is_resolved(above)) {
                    (true, true) if score(left) > score(above) => left,
                    (true, true) | (false, true) => above,
                    (true, false) => left,
                    (false, false) => return Err(Error::IncompleteGrid(vec![left, above])),
                }
            }
            (Some(left), None) => left,
            (None, Some(above)) => above,
            (None, None) => break,
        };
        path.push(cell);
    }

    path.reverse();
    Ok(path)
}

struct Planner<'a> {
    session: &'a str,
    boundary: &'a Boundary,
    store: &'a MergeRecordStore,
    tracker: FrontierTracker<'a>,
}

impl Planner<'_> {
    fn a(&self, i: usize) -> Result<CommitId> {
        self.boundary
            .a(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("branch A has no commit {i}")))
    }

    fn b(&self, j: usize) -> Result<CommitId> {
        self.boundary
            .b(j)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("branch B has no commit {j}")))
    }

    fn tree(&self, cell: Cell) -> Result<TreeId> {
        self.store
            .tree(cell)
            .cloned()
            .ok_or_else(|| Error::IncompleteGrid(vec![cell]))
    }

    fn require(&self, cells: impl IntoIterator<Item = Cell>) -> Result<()> {
        let missing = self.tracker.missing(cells);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::IncompleteGrid(missing))
        }
    }

    /// Existing commit for an edge cell, earlier step for an interior one
    fn parent(&self, cell: Cell, index: &HashMap<Cell, usize>) -> Result<ParentRef> {
        if let Some(commit) = self.boundary.edge_commit(cell) {
            return Ok(ParentRef::Commit(commit.clone()));
        }
        index
            .get(&cell)
            .map(|step| ParentRef::Step(*step))
            .ok_or_else(|| Error::Internal(format!("cell {cell} planned out of order")))
    }

    fn full(&self) -> Result<Vec<PlanStep>> {
        self.require(self.tracker.unresolved())?;

        let mut steps = Vec::new();
        let mut index = HashMap::new();
        for i in 1..=self.boundary.n() {
            for j in 1..=self.boundary.m() {
                let cell = Cell::new(i, j);
                let kind = if self.store.get(cell).is_manual() {
                    "manual"
                } else {
                    "automatic"
                };
                let parents = vec![
                    self.parent(Cell::new(i, j - 1), &index)?,
                    self.parent(Cell::new(i - 1, j), &index)?,
                ];
                index.insert(cell, steps.len());
                steps.push(PlanStep {
                    cell,
                    tree: self.tree(cell)?,
                    parents,
                    message: CommitMessage::Text(format!(
                        "imerge '{}': {kind} merge {cell}",
                        self.session
                    )),
                    replays: None,
                });
            }
        }
        Ok(steps)
    }

    fn merge(&self) -> Result<Vec<PlanStep>> {
        let apex = self.boundary.apex();
        Ok(vec![PlanStep {
            cell: apex,
            tree: self.tree(apex)?,
            parents: vec![
                ParentRef::Commit(self.a(apex.i)?),
                ParentRef::Commit(self.b(apex.j)?),
            ],
            message: CommitMessage::Text(format!(
                "Merge {} into {} (using imerge)",
                self.boundary.tip_b, self.boundary.tip_a
            )),
            replays: None,
        }])
    }

    fn rebase(&self, with_history: bool) -> Result<Vec<PlanStep>> {
        let n = self.boundary.n();
        self.require((1..=self.boundary.m()).map(|j| Cell::new(n, j)))?;

        let mut steps = Vec::new();
        let mut previous = ParentRef::Commit(self.a(n)?);
        for j in 1..=self.boundary.m() {
            let cell = Cell::new(n, j);
            let original = self.b(j)?;
            let (parents, note) = if with_history {
                (
                    vec![previous, ParentRef::Commit(original.clone())],
                    format!("(rebased-with-history from commit {original})"),
                )
            } else {
                (vec![previous], format!("(rebased from commit {original})"))
            };
            steps.push(PlanStep {
                cell,
                tree: self.tree(cell)?,
                parents,
                message: CommitMessage::CopyFrom {
                    commit: original.clone(),
                    note,
                },
                replays: Some(original),
            });
            previous = ParentRef::Step(steps.len() - 1);
        }
        Ok(steps)
    }

    fn border(&self, with_history: bool) -> Result<Vec<PlanStep>> {
        let apex = self.boundary.apex();
        let mut selected: Vec<Cell> = border_path(self.store, apex)?
            .into_iter()
            .filter(|cell| self.store.get(*cell).is_manual())
            .collect();
        if selected.last() != Some(&apex) {
            selected.push(apex);
        }
        debug!(?selected, "border cells");

        // Highest A and B originals reachable from the chain so far
        let (mut reach_a, mut reach_b) = (0, 0);
        let mut steps: Vec<PlanStep> = Vec::with_capacity(selected.len());
        for cell in selected {
            let mut parents = match steps.len() {
                0 => {
                    reach_a = cell.i;
                    vec![ParentRef::Commit(self.a(cell.i)?)]
                }
                len => vec![ParentRef::Step(len - 1)],
            };
            // The apex keeps both tips reachable in either variant
            if with_history || cell == apex {
                if cell.i > reach_a {
                    parents.push(ParentRef::Commit(self.a(cell.i)?));
                    reach_a = cell.i;
                }
                if cell.j > reach_b {
                    parents.push(ParentRef::Commit(self.b(cell.j)?));
                    reach_b = cell.j;
                }
            }
            let message = if cell == apex {
                format!(
                    "Merge {} into {} (using imerge border)",
                    self.boundary.tip_b, self.boundary.tip_a
                )
            } else {
                format!("imerge '{}': manual merge {cell}", self.session)
            };
            steps.push(PlanStep {
                cell,
                tree: self.tree(cell)?,
                parents,
                message: CommitMessage::Text(message),
                replays: None,
            });
        }
        Ok(steps)
    }
}
