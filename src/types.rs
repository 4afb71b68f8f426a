//! Core types for imerge

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque commit identifier (hex object id for git backends)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    /// Create a commit id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, content-addressed tree identifier
///
/// Two cells whose merges produce identical content share the same `TreeId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(pub String);

impl TreeId {
    /// Create a tree id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A merge target: "A[i] merged with B[j]"
///
/// `(i, 0)` is A[i], `(0, j)` is B[j] and `(0, 0)` is the merge base.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    /// Number of branch A commits incorporated
    pub i: usize,
    /// Number of branch B commits incorporated
    pub j: usize,
}

impl Cell {
    /// Create a cell
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }

    /// The merge base cell
    pub const fn origin() -> Self {
        Self { i: 0, j: 0 }
    }

    /// Whether this cell is an original commit (or the merge base)
    pub const fn is_edge(self) -> bool {
        self.i == 0 || self.j == 0
    }

    /// Predecessor along branch A, `(i-1, j)`
    pub const fn left(self) -> Option<Self> {
        if self.i == 0 {
            None
        } else {
            Some(Self::new(self.i - 1, self.j))
        }
    }

    /// Predecessor along branch B, `(i, j-1)`
    pub const fn above(self) -> Option<Self> {
        if self.j == 0 {
            None
        } else {
            Some(Self::new(self.i, self.j - 1))
        }
    }

    /// Whether `other` lies in this cell's lower-left rectangle
    pub const fn dominates(self, other: Self) -> bool {
        other.i <= self.i && other.j <= self.j
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.i, self.j)
    }
}

/// Outcome recorded for a cell
///
/// Lifecycle: `Unknown -> {Clean | Conflict} -> ManuallyResolved`. Records
/// never move backward and a resolved tree never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MergeRecord {
    /// Not attempted yet
    Unknown,
    /// Merged automatically
    Clean {
        /// Resulting tree
        tree: TreeId,
    },
    /// Automatic merge conflicted; waiting for a human
    Conflict {
        /// Partially merged tree with conflict markers, if the backend kept one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partial: Option<TreeId>,
    },
    /// Resolved by a human
    ManuallyResolved {
        /// Tree supplied by the human
        tree: TreeId,
    },
}

impl MergeRecord {
    /// The recorded tree if the cell is resolved
    pub const fn resolved_tree(&self) -> Option<&TreeId> {
        match self {
            Self::Clean { tree } | Self::ManuallyResolved { tree } => Some(tree),
            Self::Unknown | Self::Conflict { .. } => None,
        }
    }

    /// Whether the cell has a tree
    pub const fn is_resolved(&self) -> bool {
        self.resolved_tree().is_some()
    }

    /// Whether the cell is waiting for manual resolution
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether a human supplied the tree
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::ManuallyResolved { .. })
    }

    /// Short state name, used in error messages
    pub const fn state_name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Clean { .. } => "clean",
            Self::Conflict { .. } => "conflict",
            Self::ManuallyResolved { .. } => "manually-resolved",
        }
    }
}

/// Strategy for turning a resolved grid into final history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    /// Keep every merged cell as a commit
    Full,
    /// One merge commit of the two tips
    #[default]
    Merge,
    /// Replay B onto A
    Rebase,
    /// Replay B onto A, recording each original as a second parent
    RebaseWithHistory,
    /// Only the staircase cells that needed a human
    Border,
    /// Border cells as real merge commits
    BorderWithHistory,
}

impl Goal {
    /// All goals, in display order
    pub const ALL: [Self; 6] = [
        Self::Full,
        Self::Merge,
        Self::Rebase,
        Self::RebaseWithHistory,
        Self::Border,
        Self::BorderWithHistory,
    ];

    /// Kebab-case name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::RebaseWithHistory => "rebase-with-history",
            Self::Border => "border",
            Self::BorderWithHistory => "border-with-history",
        }
    }

    /// Whether the goal replays branch B commit by commit
    pub const fn is_rebase(self) -> bool {
        matches!(self, Self::Rebase | Self::RebaseWithHistory)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|goal| goal.as_str() == s)
            .ok_or_else(|| crate::error::Error::InvalidName {
                name: s.to_string(),
                reason: format!(
                    "unknown goal; expected one of: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ),
            })
    }
}

/// The two commit sequences being merged, plus their shared ancestor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// Name (or id) branch A was started from
    pub tip_a: String,
    /// Name (or id) branch B was started from
    pub tip_b: String,
    /// Common ancestor, cell `(0, 0)`
    pub ancestor: CommitId,
    /// A[1..=n], oldest first
    pub commits_a: Vec<CommitId>,
    /// B[1..=m], oldest first
    pub commits_b: Vec<CommitId>,
    /// Commits of B with more than one parent (only possible in first-parent mode)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merges_b: Vec<CommitId>,
}

impl Boundary {
    /// Length of branch A
    pub fn n(&self) -> usize {
        self.commits_a.len()
    }

    /// Length of branch B
    pub fn m(&self) -> usize {
        self.commits_b.len()
    }

    /// A[i]; `a(0)` is the ancestor
    pub fn a(&self, i: usize) -> Option<&CommitId> {
        if i == 0 {
            Some(&self.ancestor)
        } else {
            self.commits_a.get(i - 1)
        }
    }

    /// B[j]; `b(0)` is the ancestor
    pub fn b(&self, j: usize) -> Option<&CommitId> {
        if j == 0 {
            Some(&self.ancestor)
        } else {
            self.commits_b.get(j - 1)
        }
    }

    /// The original commit behind an edge cell
    pub fn edge_commit(&self, cell: Cell) -> Option<&CommitId> {
        match (cell.i, cell.j) {
            (i, 0) => self.a(i),
            (0, j) => self.b(j),
            _ => None,
        }
    }

    /// The final cell `(n, m)`
    pub fn apex(&self) -> Cell {
        Cell::new(self.n(), self.m())
    }
}
