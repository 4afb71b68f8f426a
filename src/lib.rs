//! imerge - incremental merging of two diverging branches
//!
//! Instead of one large merge, the two commit sequences A (n commits) and B
//! (m commits) are merged pairwise: cell `(i, j)` of the merge grid is "A[i]
//! merged with B[j]". Most cells merge automatically; conflicts are confined
//! to single commit pairs, which a human resolves one at a time. Once the
//! grid is complete, a [`Goal`](types::Goal) decides what the final history
//! looks like.
//!
//! # Architecture
//!
//! - [`grid`] - record store, frontier tracking, single micromerges and the
//!   automatic scheduler
//! - [`goal`] - pure goal planning and effectful history building
//! - [`session`] - the resumable, persisted session tying it together
//! - [`backend`] - the version-control operations the engine consumes
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod backend;
pub mod config;
pub mod error;
pub mod goal;
pub mod grid;
pub mod names;
pub mod progress;
pub mod session;
pub mod snapshot;
pub mod types;

pub use backend::{MergeBackend, ScratchRequest, TreeMerge};
pub use error::{Error, Result};
pub use grid::RunResult;
pub use progress::{NoProgress, ProgressCallback};
pub use session::{Session, SessionState, StartOptions};
pub use snapshot::GridSnapshot;
pub use types::{Boundary, Cell, CommitId, Goal, MergeRecord, TreeId};
