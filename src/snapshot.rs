//! Read-only view of a session's grid for display

use crate::grid::{FrontierTracker, MergeRecordStore};
use crate::types::{Boundary, Cell, MergeRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display state of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMark {
    /// An original commit or the merge base
    Original,
    /// Merged automatically
    Clean,
    /// Resolved by hand
    Manual,
    /// Waiting for a human
    Conflict,
    /// Not attempted
    Unknown,
}

impl CellMark {
    /// Single character used in the diagram
    pub const fn as_char(self) -> char {
        match self {
            Self::Original => '-',
            Self::Clean => '*',
            Self::Manual => '#',
            Self::Conflict => 'x',
            Self::Unknown => '?',
        }
    }

    fn of(cell: Cell, record: &MergeRecord) -> Self {
        match record {
            _ if cell.is_edge() => Self::Original,
            MergeRecord::Clean { .. } => Self::Clean,
            MergeRecord::ManuallyResolved { .. } => Self::Manual,
            MergeRecord::Conflict { .. } => Self::Conflict,
            MergeRecord::Unknown => Self::Unknown,
        }
    }
}

/// Number of cells per mark
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkCounts {
    /// Original commits, including the merge base
    pub original: usize,
    /// Automatic merges
    pub clean: usize,
    /// Manual merges
    pub manual: usize,
    /// Pending conflicts
    pub conflict: usize,
    /// Cells not attempted yet
    pub unknown: usize,
}

/// Grid state for display, rows indexed by B and columns by A
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Session name
    pub name: String,
    /// Branch A
    pub tip_a: String,
    /// Branch B
    pub tip_b: String,
    /// Length of branch A
    pub n: usize,
    /// Length of branch B
    pub m: usize,
    /// `rows[j][i]` is the mark of cell `(i, j)`
    pub rows: Vec<Vec<CellMark>>,
    /// Per-mark totals
    pub counts: MarkCounts,
    /// Pareto-maximal resolved cells
    pub frontier: Vec<Cell>,
    /// Cells waiting for manual resolution
    pub pending: Vec<Cell>,
    /// Cell checked out for a manual merge, if any
    pub scratch: Option<Cell>,
    /// Whether `(n, m)` is resolved
    pub complete: bool,
}

impl GridSnapshot {
    /// Build a snapshot of a grid
    pub fn new(
        name: &str,
        boundary: &Boundary,
        store: &MergeRecordStore,
        scratch: Option<Cell>,
    ) -> Self {
        let (n, m) = (boundary.n(), boundary.m());
        let mut counts = MarkCounts::default();
        let rows: Vec<Vec<CellMark>> = (0..=m)
            .map(|j| {
                (0..=n)
                    .map(|i| {
                        let cell = Cell::new(i, j);
                        let mark = CellMark::of(cell, store.get(cell));
                        match mark {
                            CellMark::Original => counts.original += 1,
                            CellMark::Clean => counts.clean += 1,
                            CellMark::Manual => counts.manual += 1,
                            CellMark::Conflict => counts.conflict += 1,
                            CellMark::Unknown => counts.unknown += 1,
                        }
                        mark
                    })
                    .collect()
            })
            .collect();

        let tracker = FrontierTracker::new(store, n, m);
        Self {
            name: name.to_string(),
            tip_a: boundary.tip_a.clone(),
            tip_b: boundary.tip_b.clone(),
            n,
            m,
            rows,
            counts,
            frontier: tracker.frontier(),
            pending: tracker.blockers(),
            scratch,
            complete: tracker.is_complete(),
        }
    }

    /// Mark of a single cell
    pub fn mark(&self, cell: Cell) -> Option<CellMark> {
        self.rows.get(cell.j).and_then(|row| row.get(cell.i)).copied()
    }
}

impl fmt::Display for GridSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "imerge '{}': {} ({} commits) x {} ({} commits)",
            self.name, self.tip_a, self.n, self.tip_b, self.m
        )?;
        let width = self.m.to_string().len();
        for (j, row) in self.rows.iter().enumerate() {
            let marks: String = row.iter().map(|mark| mark.as_char()).collect();
            writeln!(f, "{j:>width$} {marks}")?;
        }
        if self.complete {
            write!(f, "complete")
        } else if self.pending.is_empty() {
            write!(f, "in progress")
        } else {
            let pending: Vec<String> = self.pending.iter().map(ToString::to_string).collect();
            write!(f, "pending: {}", pending.join(", "))
        }
    }
}
