//! The merge grid
//!
//! Cell `(i, j)` stands for "A[i] merged with B[j]". The record store is the
//! single source of truth; the frontier tracker, micromerge engine and
//! scheduler all work from it.

mod frontier;
mod micromerge;
mod scheduler;
mod store;

pub use frontier::FrontierTracker;
pub use micromerge::{AttemptOutcome, MergeBasis, MergeInputs, MicromergeEngine, merge_inputs};
pub use scheduler::{AutoMergeScheduler, RunResult, SaveHook};
pub use store::{CellEntry, MergeRecordStore};
