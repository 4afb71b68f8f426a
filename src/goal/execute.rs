//! Plan execution - effectful operations
//!
//! Takes a [`GoalPlan`] (created by the pure planning functions), writes its
//! commits through the backend and moves the target branch.

use crate::backend::MergeBackend;
use crate::error::{Error, Result};
use crate::goal::plan::{CommitMessage, GoalPlan, ParentRef};
use crate::progress::ProgressCallback;
use crate::types::CommitId;
use tracing::{debug, info};

/// Execute the goal plan (EFFECTFUL)
///
/// Commits are created strictly in plan order. A failure part way through
/// leaves unreferenced commits behind, which is harmless: commit creation is
/// content-addressed, so re-running the same plan reproduces them.
///
/// Unless `force` is set, an existing `branch` is only moved if its current
/// tip is already contained in the new commit, or in one of the original
/// tips the plan replaces on purpose (branch B for a plain rebase).
///
/// # Returns
/// The commit the branch now points at
pub async fn execute_plan(
    plan: &GoalPlan,
    backend: &dyn MergeBackend,
    branch: &str,
    force: bool,
    progress: &dyn ProgressCallback,
) -> Result<CommitId> {
    let mut created: Vec<CommitId> = Vec::with_capacity(plan.steps.len());

    for (index, step) in plan.steps.iter().enumerate() {
        let parents = step
            .parents
            .iter()
            .map(|parent| match parent {
                ParentRef::Commit(commit) => Ok(commit.clone()),
                ParentRef::Step(earlier) => created.get(*earlier).cloned().ok_or_else(|| {
                    Error::Internal(format!(
                        "step {index} depends on step {earlier}, which has not been created"
                    ))
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let message = render_message(backend, &step.message).await?;
        let commit = backend
            .create_commit(&step.tree, &parents, &message)
            .await
            .map_err(|e| {
                Error::BackendWrite(format!(
                    "creating commit {} of {} (cell {}): {e}",
                    index + 1,
                    plan.steps.len(),
                    step.cell
                ))
            })?;
        debug!(cell = %step.cell, %commit, "created commit");
        progress.on_commit(step.cell, &commit).await;
        created.push(commit);
    }

    let tip = created
        .pop()
        .ok_or_else(|| Error::Internal("goal plan has no steps".to_string()))?;

    if !force {
        check_fast_forward(plan, backend, branch, &tip).await?;
    }

    backend
        .move_ref(branch, &tip)
        .await
        .map_err(|e| Error::BackendWrite(format!("moving {branch} to {tip}: {e}")))?;

    info!(%branch, %tip, goal = %plan.goal, commits = plan.len(), "recorded final history");
    progress
        .on_message(&format!("{branch} now points at {tip}"))
        .await;
    Ok(tip)
}

async fn render_message(backend: &dyn MergeBackend, message: &CommitMessage) -> Result<String> {
    match message {
        CommitMessage::Text(text) => Ok(text.clone()),
        CommitMessage::CopyFrom { commit, note } => {
            let original = backend.read_commit_message(commit).await?;
            Ok(format!("{}\n\n{note}\n", original.trim_end_matches('\n')))
        }
    }
}

async fn check_fast_forward(
    plan: &GoalPlan,
    backend: &dyn MergeBackend,
    branch: &str,
    tip: &CommitId,
) -> Result<()> {
    let Some(current) = backend.resolve_ref(branch).await? else {
        return Ok(());
    };

    if backend.is_ancestor(&current, tip).await? {
        return Ok(());
    }
    for superseded in &plan.supersedes {
        if backend.is_ancestor(&current, superseded).await? {
            return Ok(());
        }
    }

    Err(Error::NotFastForward {
        branch: branch.to_string(),
        commit: tip.clone(),
    })
}
