//! Incremental-merge sessions
//!
//! A [`Session`] owns one merge grid and everything needed to resume it:
//! the two commit sequences, the record store, the chosen goal and the
//! scratch-checkout state. Every mutation is followed by an atomic save to
//! `<git-dir>/imerge/<name>.toml`, so a session survives the process exiting
//! between manual merges.

pub mod ancestry;
pub mod storage;

pub use storage::list_sessions;

use crate::backend::{MergeBackend, ScratchRequest};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::goal::{GoalPlan, create_goal_plan, execute_plan};
use crate::grid::{AutoMergeScheduler, FrontierTracker, MergeRecordStore, RunResult, merge_inputs};
use crate::names::{validate_branch_name, validate_session_name};
use crate::progress::ProgressCallback;
use crate::snapshot::GridSnapshot;
use crate::types::{Boundary, Cell, CommitId, Goal, MergeRecord, TreeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current session file format version
pub const SESSION_VERSION: u32 = 1;

/// Everything persisted about a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// File format version
    pub version: u32,
    /// Session name
    pub name: String,
    /// Goal used by `finish` and by `simplify` without an explicit goal
    pub goal: Goal,
    /// Branch that receives the result
    pub branch: String,
    /// Commit sequences follow first parents only
    pub first_parent: bool,
    /// Every cell is merged by hand
    pub manual: bool,
    /// When the session was started
    pub created_at: DateTime<Utc>,
    /// Last save
    pub updated_at: DateTime<Utc>,
    /// Cell checked out for a manual merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch: Option<Cell>,
    /// The two commit sequences
    pub boundary: Boundary,
    /// Recorded merge outcomes
    pub records: MergeRecordStore,
}

/// Options for [`Session::start`]
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Session name
    pub name: String,
    /// Branch (or revision) merged into
    pub branch_a: String,
    /// Branch (or revision) being merged
    pub branch_b: String,
    /// Follow first parents only; also enabled by the repository config
    pub first_parent: bool,
    /// Never merge automatically
    pub manual: bool,
    /// Goal; defaults to the repository config's `default_goal`
    pub goal: Option<Goal>,
    /// Target branch; defaults to the session name
    pub branch: Option<String>,
}

impl StartOptions {
    /// Merge `branch_b` into `branch_a` in a session called `name`
    pub fn new(
        name: impl Into<String>,
        branch_a: impl Into<String>,
        branch_b: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            branch_a: branch_a.into(),
            branch_b: branch_b.into(),
            ..Self::default()
        }
    }
}

/// A resumable incremental merge
#[derive(Debug, Clone)]
pub struct Session {
    repo_root: PathBuf,
    state: SessionState,
}

impl Session {
    /// Start a new session.
    ///
    /// Computes both commit sequences, records the original commits as the
    /// grid's edges and saves the session. Nothing is merged yet; call
    /// [`continue_merge`](Self::continue_merge) for that.
    pub async fn start(
        backend: &dyn MergeBackend,
        repo_root: &Path,
        options: StartOptions,
    ) -> Result<Self> {
        validate_session_name(&options.name)?;
        let branch = options.branch.unwrap_or_else(|| options.name.clone());
        validate_branch_name(&branch)?;
        if storage::session_exists(repo_root, &options.name) {
            return Err(Error::SessionExists(options.name));
        }

        let mut config = Config::load(repo_root)?;
        let first_parent = options.first_parent || config.first_parent;
        let goal = options.goal.unwrap_or(config.default_goal);

        let boundary = ancestry::compute_boundary(
            backend,
            &options.branch_a,
            &options.branch_b,
            first_parent,
        )
        .await?;
        if goal.is_rebase() && !boundary.merges_b.is_empty() {
            return Err(Error::MergeCommitsInBranch(boundary.merges_b));
        }

        let mut records = MergeRecordStore::new();
        for (cell, commit) in edge_commits(&boundary) {
            let tree = backend.read_commit_tree(&commit).await?;
            records.put(cell, MergeRecord::Clean { tree })?;
        }

        let now = Utc::now();
        let session = Self {
            repo_root: repo_root.to_path_buf(),
            state: SessionState {
                version: SESSION_VERSION,
                name: options.name,
                goal,
                branch,
                first_parent,
                manual: options.manual,
                created_at: now,
                updated_at: now,
                scratch: None,
                boundary,
                records,
            },
        };
        storage::save_session(repo_root, &session.state)?;

        config.default_session = Some(session.state.name.clone());
        config.save(repo_root)?;

        info!(
            session = %session.state.name,
            n = session.n(),
            m = session.m(),
            %goal,
            "started incremental merge"
        );
        Ok(session)
    }

    /// Resume a saved session
    pub fn open(repo_root: &Path, name: &str) -> Result<Self> {
        validate_session_name(name)?;
        let state = storage::load_session(repo_root, name)?;
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            state,
        })
    }

    /// Resume the session named in the repository config
    pub fn open_default(repo_root: &Path) -> Result<Self> {
        let config = Config::load(repo_root)?;
        let name = config
            .default_session
            .ok_or_else(|| Error::SessionNotFound("(default)".to_string()))?;
        Self::open(repo_root, &name)
    }

    /// Delete a saved session
    pub fn remove(repo_root: &Path, name: &str) -> Result<()> {
        validate_session_name(name)?;
        storage::remove_session(repo_root, name)?;

        let mut config = Config::load(repo_root)?;
        if config.default_session.as_deref() == Some(name) {
            config.default_session = None;
            config.save(repo_root)?;
        }
        info!(session = name, "removed incremental merge");
        Ok(())
    }

    /// Session name
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Persisted state
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The two commit sequences
    pub const fn boundary(&self) -> &Boundary {
        &self.state.boundary
    }

    /// Recorded merge outcomes
    pub const fn records(&self) -> &MergeRecordStore {
        &self.state.records
    }

    /// Length of branch A
    pub fn n(&self) -> usize {
        self.state.boundary.n()
    }

    /// Length of branch B
    pub fn m(&self) -> usize {
        self.state.boundary.m()
    }

    /// Whether `(n, m)` is resolved
    pub fn is_complete(&self) -> bool {
        self.tracker().is_complete()
    }

    /// Cell checked out for a manual merge
    pub const fn scratch(&self) -> Option<Cell> {
        self.state.scratch
    }

    fn tracker(&self) -> FrontierTracker<'_> {
        FrontierTracker::new(&self.state.records, self.n(), self.m())
    }

    fn check_range(&self, cell: Cell) -> Result<()> {
        if self.tracker().contains(cell) {
            Ok(())
        } else {
            Err(Error::CellOutOfRange {
                cell,
                n: self.n(),
                m: self.m(),
            })
        }
    }

    /// Interior cells need `(i-1, j)` and `(i, j-1)` resolved before a human
    /// may merge them
    fn check_ready(&self, cell: Cell) -> Result<()> {
        if cell.is_edge() || self.tracker().is_ready(cell) {
            Ok(())
        } else {
            Err(Error::NoValidPredecessor(cell))
        }
    }

    fn save(&mut self) -> Result<()> {
        self.state.updated_at = Utc::now();
        storage::save_session(&self.repo_root, &self.state)
    }

    /// Merge automatically until the grid is complete or stalls on conflicts.
    ///
    /// The session is saved after every recorded cell.
    pub async fn continue_merge(
        &mut self,
        backend: &dyn MergeBackend,
        progress: &dyn ProgressCallback,
    ) -> Result<RunResult> {
        let scheduler =
            AutoMergeScheduler::new(backend, self.n(), self.m()).manual(self.state.manual);

        // The store is updated in place, so dropping this future part way
        // through leaves `self` holding everything already recorded.
        let mut header = SessionState {
            records: MergeRecordStore::new(),
            ..self.state.clone()
        };
        let repo_root = &self.repo_root;
        let mut save = |store: &MergeRecordStore| {
            header.records = store.clone();
            header.updated_at = Utc::now();
            storage::save_session(repo_root, &header)
        };

        let result = scheduler
            .run(&mut self.state.records, progress, &mut save)
            .await;
        self.state.updated_at = Utc::now();

        let result = result?;
        if let RunResult::ConflictsPending(cells) = &result {
            let pending: Vec<String> = cells.iter().map(ToString::to_string).collect();
            progress
                .on_message(&format!("manual merge required: {}", pending.join(", ")))
                .await;
        }
        Ok(result)
    }

    /// Record a manual resolution of `cell`.
    ///
    /// Both standard predecessors of `cell` must already be resolved.
    /// If `cell` is checked out in the scratch area, the checkout is
    /// released whether or not the resolution could be recorded.
    pub async fn resolve(
        &mut self,
        backend: &dyn MergeBackend,
        cell: Cell,
        tree: TreeId,
    ) -> Result<()> {
        self.check_range(cell)?;

        let recorded = self
            .check_ready(cell)
            .and_then(|()| {
                self.state
                    .records
                    .put(cell, MergeRecord::ManuallyResolved { tree })
            });
        if matches!(recorded, Ok(true)) {
            self.save()?;
            info!(%cell, "recorded manual merge");
        }

        if self.state.scratch == Some(cell) {
            backend.release_scratch().await?;
            self.state.scratch = None;
            self.save()?;
        }

        recorded.map(|_| ())
    }

    /// Check out `cell` for a human to resolve.
    ///
    /// The returned request describes the merge that was checked out. Finish
    /// with [`resolve`](Self::resolve) or give up with
    /// [`abort_manual_merge`](Self::abort_manual_merge).
    pub async fn begin_manual_merge(
        &mut self,
        backend: &dyn MergeBackend,
        cell: Cell,
    ) -> Result<ScratchRequest> {
        if let Some(active) = self.state.scratch {
            return Err(Error::ScratchInUse(active));
        }
        self.check_range(cell)?;

        let partial = match self.state.records.get(cell) {
            MergeRecord::Conflict { partial } => partial.clone(),
            MergeRecord::Unknown => None,
            resolved => {
                return Err(Error::InvalidTransition {
                    cell,
                    from: resolved.state_name(),
                    to: "manually-resolved",
                });
            }
        };
        self.check_ready(cell)?;
        let inputs = merge_inputs(&self.state.records, cell)?;
        let request = ScratchRequest {
            session: self.state.name.clone(),
            cell,
            base: inputs.base,
            ours: inputs.ours,
            theirs: inputs.theirs,
            partial,
        };

        backend.checkout_scratch(&request).await?;
        self.state.scratch = Some(cell);
        self.save()?;
        info!(%cell, "checked out manual merge");
        Ok(request)
    }

    /// Release the scratch checkout without recording anything
    pub async fn abort_manual_merge(&mut self, backend: &dyn MergeBackend) -> Result<Cell> {
        let cell = self.state.scratch.ok_or(Error::NoManualMerge)?;
        backend.release_scratch().await?;
        self.state.scratch = None;
        self.save()?;
        info!(%cell, "abandoned manual merge");
        Ok(cell)
    }

    /// Plan the final history without writing anything
    pub fn plan(&self, goal: Option<Goal>) -> Result<GoalPlan> {
        create_goal_plan(
            &self.state.name,
            &self.state.boundary,
            &self.state.records,
            goal.unwrap_or(self.state.goal),
        )
    }

    /// Write the final history and point `branch` at it.
    ///
    /// `goal` and `branch` default to the ones stored in the session.
    pub async fn simplify(
        &self,
        backend: &dyn MergeBackend,
        goal: Option<Goal>,
        branch: Option<&str>,
        force: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<CommitId> {
        let branch = branch.unwrap_or(&self.state.branch);
        validate_branch_name(branch)?;

        let plan = self.plan(goal)?;
        if plan.shape != plan.goal {
            warn!(goal = %plan.goal, "grid needed no manual merges; recording a plain merge");
        }
        progress
            .on_message(&format!(
                "writing {} commit(s) for goal '{}' to {branch}",
                plan.len(),
                plan.goal
            ))
            .await;
        execute_plan(&plan, backend, branch, force, progress).await
    }

    /// Merge what can be merged, then write the final history.
    ///
    /// # Errors
    /// `ConflictPending` with the cells that still need a human.
    pub async fn finish(
        &mut self,
        backend: &dyn MergeBackend,
        force: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<CommitId> {
        if let Some(active) = self.state.scratch {
            return Err(Error::ScratchInUse(active));
        }
        match self.continue_merge(backend, progress).await? {
            RunResult::Complete => self.simplify(backend, None, None, force, progress).await,
            RunResult::ConflictsPending(cells) => Err(Error::ConflictPending(cells)),
        }
    }

    /// Snapshot of the grid for display
    pub fn list(&self) -> GridSnapshot {
        GridSnapshot::new(
            &self.state.name,
            &self.state.boundary,
            &self.state.records,
            self.state.scratch,
        )
    }
}

/// Edge cells paired with the original commits they stand for
fn edge_commits(boundary: &Boundary) -> Vec<(Cell, CommitId)> {
    let mut edges = vec![(Cell::origin(), boundary.ancestor.clone())];
    edges.extend(
        boundary
            .commits_a
            .iter()
            .enumerate()
            .map(|(k, commit)| (Cell::new(k + 1, 0), commit.clone())),
    );
    edges.extend(
        boundary
            .commits_b
            .iter()
            .enumerate()
            .map(|(k, commit)| (Cell::new(0, k + 1), commit.clone())),
    );
    edges
}
