//! Commit-sequence discovery
//!
//! Finds the merge base of the two tips and the commits each branch added
//! since, by walking first parents through the backend.

use crate::backend::MergeBackend;
use crate::error::{Error, Result};
use crate::types::{Boundary, CommitId};
use std::collections::HashSet;
use tracing::debug;

async fn first_parent(backend: &dyn MergeBackend, commit: &CommitId) -> Result<Option<CommitId>> {
    Ok(backend.read_commit_parents(commit).await?.into_iter().next())
}

/// Nearest commit on both first-parent chains.
///
/// Walks the two chains in alternation; the first commit one walker reaches
/// that the other has already visited is the merge base.
pub async fn merge_base(
    backend: &dyn MergeBackend,
    tip_a: &CommitId,
    tip_b: &CommitId,
) -> Result<Option<CommitId>> {
    let mut seen_a: HashSet<CommitId> = HashSet::new();
    let mut seen_b: HashSet<CommitId> = HashSet::new();
    let mut next_a = Some(tip_a.clone());
    let mut next_b = Some(tip_b.clone());

    while next_a.is_some() || next_b.is_some() {
        if let Some(commit) = next_a.take() {
            if seen_b.contains(&commit) {
                return Ok(Some(commit));
            }
            next_a = first_parent(backend, &commit).await?;
            seen_a.insert(commit);
        }
        if let Some(commit) = next_b.take() {
            if seen_a.contains(&commit) {
                return Ok(Some(commit));
            }
            next_b = first_parent(backend, &commit).await?;
            seen_b.insert(commit);
        }
    }
    Ok(None)
}

/// Commits from `ancestor` (exclusive) to `tip` (inclusive), oldest first,
/// plus the subset that are merge commits.
async fn walk(
    backend: &dyn MergeBackend,
    tip: &CommitId,
    ancestor: &CommitId,
) -> Result<(Vec<CommitId>, Vec<CommitId>)> {
    let mut commits = Vec::new();
    let mut merges = Vec::new();
    let mut current = tip.clone();

    while &current != ancestor {
        let parents = backend.read_commit_parents(&current).await?;
        if parents.len() > 1 {
            merges.push(current.clone());
        }
        let next = parents.into_iter().next().ok_or_else(|| {
            Error::Internal(format!("{current} is a root commit but {ancestor} is its ancestor"))
        })?;
        commits.push(current);
        current = next;
    }

    commits.reverse();
    merges.reverse();
    Ok((commits, merges))
}

/// Resolve both branch names and compute the commit sequences to merge.
///
/// Without `first_parent`, a merge commit anywhere in either sequence is an
/// error; with it, merges are followed along their first parent only and the
/// ones on branch B are remembered (rebase goals cannot replay them).
///
/// # Errors
/// `RefNotFound`, `NoCommonAncestor`, `NothingToDo` (one tip already contains
/// the other) and `NonlinearAncestry`.
pub async fn compute_boundary(
    backend: &dyn MergeBackend,
    name_a: &str,
    name_b: &str,
    first_parent: bool,
) -> Result<Boundary> {
    let tip_a = backend
        .resolve_ref(name_a)
        .await?
        .ok_or_else(|| Error::RefNotFound(name_a.to_string()))?;
    let tip_b = backend
        .resolve_ref(name_b)
        .await?
        .ok_or_else(|| Error::RefNotFound(name_b.to_string()))?;

    let ancestor = merge_base(backend, &tip_a, &tip_b)
        .await?
        .ok_or_else(|| Error::NoCommonAncestor(name_a.to_string(), name_b.to_string()))?;
    debug!(%tip_a, %tip_b, %ancestor, "found merge base");

    let (commits_a, merges_a) = walk(backend, &tip_a, &ancestor).await?;
    let (commits_b, merges_b) = walk(backend, &tip_b, &ancestor).await?;

    if commits_b.is_empty() {
        return Err(Error::NothingToDo(name_b.to_string(), name_a.to_string()));
    }
    if commits_a.is_empty() {
        return Err(Error::NothingToDo(name_a.to_string(), name_b.to_string()));
    }
    if !first_parent {
        if let Some(merge) = merges_a.into_iter().chain(merges_b.iter().cloned()).next() {
            return Err(Error::NonlinearAncestry(merge));
        }
    }

    Ok(Boundary {
        tip_a: name_a.to_string(),
        tip_b: name_b.to_string(),
        ancestor,
        commits_a,
        commits_b,
        merges_b,
    })
}
