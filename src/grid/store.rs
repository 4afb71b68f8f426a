//! Merge record store - the single source of truth for the grid
//!
//! Records are kept sparsely, keyed by cell. Most of a large grid is never
//! visited, so only cells that were actually attempted take up space.

use crate::error::{Error, Result};
use crate::types::{Cell, MergeRecord, TreeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

static UNKNOWN: MergeRecord = MergeRecord::Unknown;

/// Serialized form of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    /// Cell the record belongs to
    pub cell: Cell,
    /// Recorded outcome
    pub record: MergeRecord,
}

/// Persistent mapping from cell to merge outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<CellEntry>", try_from = "Vec<CellEntry>")]
pub struct MergeRecordStore {
    records: BTreeMap<Cell, MergeRecord>,
    /// First cell recorded with each tree
    trees: HashMap<TreeId, Cell>,
}

impl MergeRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a cell; [`MergeRecord::Unknown`] if never written
    pub fn get(&self, cell: Cell) -> &MergeRecord {
        self.records.get(&cell).unwrap_or(&UNKNOWN)
    }

    /// Resolved tree for a cell, if any
    pub fn tree(&self, cell: Cell) -> Option<&TreeId> {
        self.get(cell).resolved_tree()
    }

    /// Whether the cell has a resolved tree
    pub fn is_resolved(&self, cell: Cell) -> bool {
        self.get(cell).is_resolved()
    }

    /// Write a record.
    ///
    /// Returns `Ok(true)` if the store changed and `Ok(false)` for an
    /// idempotent rewrite (same resolved tree, or an unchanged conflict).
    pub fn put(&mut self, cell: Cell, record: MergeRecord) -> Result<bool> {
        let existing = self.get(cell);

        if let (Some(old_tree), Some(new_tree)) = (existing.resolved_tree(), record.resolved_tree())
        {
            if old_tree == new_tree {
                return Ok(false);
            }
            return Err(Error::ImmutableOverwrite {
                cell,
                existing: old_tree.clone(),
                attempted: new_tree.clone(),
            });
        }

        match (existing, &record) {
            (MergeRecord::Unknown, MergeRecord::Unknown) => return Ok(false),
            (MergeRecord::Unknown, _)
            | (MergeRecord::Conflict { .. }, MergeRecord::ManuallyResolved { .. }) => {}
            (MergeRecord::Conflict { partial: old }, MergeRecord::Conflict { partial: new }) => {
                if old == new || new.is_none() {
                    return Ok(false);
                }
            }
            (old, new) => {
                return Err(Error::InvalidTransition {
                    cell,
                    from: old.state_name(),
                    to: new.state_name(),
                });
            }
        }

        if let Some(tree) = record.resolved_tree() {
            if let Some(first) = self.trees.get(tree) {
                debug!(%cell, %tree, duplicate_of = %first, "tree already recorded");
            } else {
                self.trees.insert(tree.clone(), cell);
            }
        }
        self.records.insert(cell, record);
        Ok(true)
    }

    /// The first cell that was recorded with `tree`
    pub fn cell_with_tree(&self, tree: &TreeId) -> Option<Cell> {
        self.trees.get(tree).copied()
    }

    /// Lazily iterate resolved cells in `(i, j)` order
    pub fn iter_resolved(&self) -> impl Iterator<Item = (Cell, &TreeId)> + '_ {
        self.records
            .iter()
            .filter_map(|(cell, record)| record.resolved_tree().map(|tree| (*cell, tree)))
    }

    /// Iterate every written record in `(i, j)` order
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &MergeRecord)> + '_ {
        self.records.iter().map(|(cell, record)| (*cell, record))
    }

    /// Cells waiting for manual resolution
    pub fn conflicts(&self) -> Vec<Cell> {
        self.records
            .iter()
            .filter(|(_, record)| record.is_conflict())
            .map(|(cell, _)| *cell)
            .collect()
    }

    /// Cells resolved by a human
    pub fn manual_cells(&self) -> Vec<Cell> {
        self.records
            .iter()
            .filter(|(_, record)| record.is_manual())
            .map(|(cell, _)| *cell)
            .collect()
    }

    /// Number of written records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PartialEq for MergeRecordStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for MergeRecordStore {}

impl From<MergeRecordStore> for Vec<CellEntry> {
    fn from(store: MergeRecordStore) -> Self {
        store
            .records
            .into_iter()
            .map(|(cell, record)| CellEntry { cell, record })
            .collect()
    }
}

impl TryFrom<Vec<CellEntry>> for MergeRecordStore {
    type Error = String;

    fn try_from(entries: Vec<CellEntry>) -> std::result::Result<Self, Self::Error> {
        let mut store = Self::new();
        for entry in entries {
            if store.records.contains_key(&entry.cell) {
                return Err(format!("duplicate record for cell {}", entry.cell));
            }
            store
                .put(entry.cell, entry.record)
                .map_err(|e| e.to_string())?;
        }
        Ok(store)
    }
}
