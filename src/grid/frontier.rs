//! Frontier tracking - pure queries over the record store
//!
//! Resolved cells form a staircase anchored at the merge base. The frontier
//! is the set of its Pareto-maximal corners; the candidates are the unknown
//! cells just outside it whose two standard predecessors are both resolved.

use crate::grid::MergeRecordStore;
use crate::types::{Cell, MergeRecord};
use std::collections::BTreeSet;

/// Read-only view of a grid's progress
#[derive(Debug, Clone, Copy)]
pub struct FrontierTracker<'a> {
    store: &'a MergeRecordStore,
    n: usize,
    m: usize,
}

impl<'a> FrontierTracker<'a> {
    /// Create a tracker over an `n` x `m` grid
    pub const fn new(store: &'a MergeRecordStore, n: usize, m: usize) -> Self {
        Self { store, n, m }
    }

    /// Whether `cell` lies inside the grid
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.i <= self.n && cell.j <= self.m
    }

    /// True iff cell `(n, m)` has a tree
    pub fn is_complete(&self) -> bool {
        self.store.is_resolved(Cell::new(self.n, self.m))
    }

    /// Whether both standard predecessors `(i-1, j)` and `(i, j-1)` are resolved
    pub fn is_ready(&self, cell: Cell) -> bool {
        if cell.is_edge() || !self.contains(cell) {
            return false;
        }
        match (cell.left(), cell.above()) {
            (Some(left), Some(above)) => {
                self.store.is_resolved(left) && self.store.is_resolved(above)
            }
            _ => false,
        }
    }

    /// Unknown cells whose dependencies are satisfied, best first.
    ///
    /// Ordered by distance from the merge base (`i + j`), then by `j`, so
    /// among equally distant cells the one further along branch A comes
    /// first.
    pub fn next_candidates(&self) -> Vec<Cell> {
        let mut candidates = BTreeSet::new();
        for (cell, _) in self.store.iter_resolved() {
            for next in [Cell::new(cell.i + 1, cell.j), Cell::new(cell.i, cell.j + 1)] {
                if matches!(self.store.get(next), MergeRecord::Unknown) && self.is_ready(next) {
                    candidates.insert(next);
                }
            }
        }

        let mut candidates: Vec<Cell> = candidates.into_iter().collect();
        candidates.sort_by_key(|cell| (cell.i + cell.j, cell.j));
        candidates
    }

    /// Pareto-maximal resolved cells, ordered by increasing `i`
    pub fn frontier(&self) -> Vec<Cell> {
        let mut resolved: Vec<Cell> = self
            .store
            .iter_resolved()
            .map(|(cell, _)| cell)
            .filter(|cell| self.contains(*cell))
            .collect();
        resolved.sort_by(|a, b| b.cmp(a));

        let mut maximal = Vec::new();
        let mut best_j: Option<usize> = None;
        for cell in resolved {
            if best_j.is_none_or(|j| cell.j > j) {
                maximal.push(cell);
                best_j = Some(cell.j);
            }
        }
        maximal.reverse();
        maximal
    }

    /// Conflicted cells, i.e. the merges a human has to do next
    pub fn blockers(&self) -> Vec<Cell> {
        self.store
            .conflicts()
            .into_iter()
            .filter(|cell| self.contains(*cell))
            .collect()
    }

    /// Interior cells without a tree, in `(i, j)` order
    pub fn unresolved(&self) -> Vec<Cell> {
        (1..=self.n)
            .flat_map(|i| (1..=self.m).map(move |j| Cell::new(i, j)))
            .filter(|cell| !self.store.is_resolved(*cell))
            .collect()
    }

    /// Cells in `cells` that are not resolved
    pub fn missing(&self, cells: impl IntoIterator<Item = Cell>) -> Vec<Cell> {
        cells
            .into_iter()
            .filter(|cell| !self.store.is_resolved(*cell))
            .collect()
    }
}
