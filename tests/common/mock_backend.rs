//! Mock merge backend for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use imerge::backend::{MergeBackend, ScratchRequest, TreeMerge};
use imerge::error::{Error, Result};
use imerge::types::{CommitId, TreeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// File name to content
pub type Files = BTreeMap<String, String>;

/// Tree id for a set of files; the id is the files' JSON encoding, so equal
/// content always gives an equal id
pub fn tree_id(files: &Files) -> TreeId {
    TreeId::new(serde_json::to_string(files).unwrap())
}

/// Decode a tree id produced by [`tree_id`]
pub fn tree_files(tree: &TreeId) -> Files {
    serde_json::from_str(tree.as_str()).unwrap()
}

/// Build a file map from pairs
pub fn files(pairs: &[(&str, &str)]) -> Files {
    pairs
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect()
}

/// A stored commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub tree: TreeId,
    pub parents: Vec<CommitId>,
    pub message: String,
}

/// Call record for `merge_trees`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTreesCall {
    pub base: TreeId,
    pub ours: TreeId,
    pub theirs: TreeId,
}

/// Call record for `create_commit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitCall {
    pub tree: TreeId,
    pub parents: Vec<CommitId>,
    pub message: String,
}

/// In-memory repository implementing `MergeBackend`
///
/// Features:
/// - Trees are file maps; merges are per-file three-way merges
/// - Content-addressed commit creation
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockBackend {
    next_commit: AtomicU64,
    commits: Mutex<HashMap<CommitId, MockCommit>>,
    refs: Mutex<HashMap<String, CommitId>>,
    scratch: Mutex<Option<ScratchRequest>>,
    // Call tracking
    merge_calls: Mutex<Vec<MergeTreesCall>>,
    create_commit_calls: Mutex<Vec<CreateCommitCall>>,
    move_ref_calls: Mutex<Vec<(String, CommitId)>>,
    checkout_calls: Mutex<Vec<ScratchRequest>>,
    release_calls: AtomicU64,
    merge_delay: Mutex<Option<Duration>>,
    // Error injection
    error_on_merge: Mutex<Option<String>>,
    error_on_create_commit: Mutex<Option<String>>,
    error_on_move_ref: Mutex<Option<String>>,
    error_on_release: Mutex<Option<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            next_commit: AtomicU64::new(1),
            commits: Mutex::new(HashMap::new()),
            refs: Mutex::new(HashMap::new()),
            scratch: Mutex::new(None),
            merge_calls: Mutex::new(Vec::new()),
            create_commit_calls: Mutex::new(Vec::new()),
            move_ref_calls: Mutex::new(Vec::new()),
            checkout_calls: Mutex::new(Vec::new()),
            release_calls: AtomicU64::new(0),
            merge_delay: Mutex::new(None),
            error_on_merge: Mutex::new(None),
            error_on_create_commit: Mutex::new(None),
            error_on_move_ref: Mutex::new(None),
            error_on_release: Mutex::new(None),
        }
    }

    // === Repository setup ===

    /// Add a commit with a chosen id
    pub fn add_commit(&self, id: &str, parents: &[&str], content: &Files, message: &str) -> CommitId {
        let id = CommitId::new(id);
        self.commits.lock().unwrap().insert(
            id.clone(),
            MockCommit {
                tree: tree_id(content),
                parents: parents.iter().map(|p| CommitId::new(*p)).collect(),
                message: message.to_string(),
            },
        );
        id
    }

    /// Point a branch at a commit
    pub fn set_ref(&self, name: &str, commit: &str) {
        self.refs
            .lock()
            .unwrap()
            .insert(name.to_string(), CommitId::new(commit));
    }

    /// Make every `merge_trees` call take at least `delay`
    pub fn set_merge_delay(&self, delay: Duration) {
        *self.merge_delay.lock().unwrap() = Some(delay);
    }

    // === Error injection methods ===

    /// Make `merge_trees` return an error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_commit` return an error
    pub fn fail_create_commit(&self, msg: &str) {
        *self.error_on_create_commit.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `move_ref` return an error
    pub fn fail_move_ref(&self, msg: &str) {
        *self.error_on_move_ref.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `release_scratch` return an error
    pub fn fail_release(&self, msg: &str) {
        *self.error_on_release.lock().unwrap() = Some(msg.to_string());
    }

    /// Remove all injected errors
    pub fn clear_failures(&self) {
        *self.error_on_merge.lock().unwrap() = None;
        *self.error_on_create_commit.lock().unwrap() = None;
        *self.error_on_move_ref.lock().unwrap() = None;
        *self.error_on_release.lock().unwrap() = None;
    }

    // === Inspection ===

    /// A stored commit
    pub fn commit(&self, id: &CommitId) -> MockCommit {
        self.commits
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("no commit {id}"))
    }

    /// Files of a commit
    pub fn commit_files(&self, id: &CommitId) -> Files {
        tree_files(&self.commit(id).tree)
    }

    /// Where a branch points
    pub fn ref_target(&self, name: &str) -> Option<CommitId> {
        self.refs.lock().unwrap().get(name).cloned()
    }

    /// First-parent chain from `tip`, newest first, stopping before `stop`
    pub fn first_parent_chain(&self, tip: &CommitId, stop: &CommitId) -> Vec<CommitId> {
        let mut chain = Vec::new();
        let mut current = tip.clone();
        while &current != stop {
            let commit = self.commit(&current);
            chain.push(current);
            match commit.parents.first() {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        chain
    }

    /// Currently checked out manual merge
    pub fn active_scratch(&self) -> Option<ScratchRequest> {
        self.scratch.lock().unwrap().clone()
    }

    // === Call verification methods ===

    /// Get all `merge_trees` calls
    pub fn get_merge_calls(&self) -> Vec<MergeTreesCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    /// Get all `create_commit` calls
    pub fn get_create_commit_calls(&self) -> Vec<CreateCommitCall> {
        self.create_commit_calls.lock().unwrap().clone()
    }

    /// Get all `move_ref` calls
    pub fn get_move_ref_calls(&self) -> Vec<(String, CommitId)> {
        self.move_ref_calls.lock().unwrap().clone()
    }

    /// Get all `checkout_scratch` calls
    pub fn get_checkout_calls(&self) -> Vec<ScratchRequest> {
        self.checkout_calls.lock().unwrap().clone()
    }

    /// Number of `release_scratch` calls
    pub fn release_count(&self) -> u64 {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// Get count of merge_trees calls
    pub fn merge_call_count(&self) -> usize {
        self.merge_calls.lock().unwrap().len()
    }

    /// Assert that the branch points at a commit with exactly these files
    pub fn assert_branch_files(&self, branch: &str, expected: &Files) {
        let tip = self
            .ref_target(branch)
            .unwrap_or_else(|| panic!("branch {branch} does not exist"));
        let actual = self.commit_files(&tip);
        assert_eq!(&actual, expected, "unexpected content at {branch} ({tip})");
    }

    fn injected(slot: &Mutex<Option<String>>) -> Option<String> {
        slot.lock().unwrap().clone()
    }
}

/// Per-file three-way merge; `None` content means "file absent"
fn merge_files(base: &Files, ours: &Files, theirs: &Files) -> (Files, bool) {
    let names: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    let mut merged = Files::new();
    let mut conflicted = false;

    for name in names {
        let (b, o, t) = (base.get(name), ours.get(name), theirs.get(name));
        let result = if b == o {
            t.cloned()
        } else if b == t || o == t {
            o.cloned()
        } else {
            conflicted = true;
            Some(format!(
                "<<<<<<< {}\n=======\n{}\n>>>>>>>",
                o.map_or("", String::as_str),
                t.map_or("", String::as_str)
            ))
        };
        if let Some(content) = result {
            merged.insert(name.clone(), content);
        }
    }
    (merged, conflicted)
}

#[async_trait]
impl MergeBackend for MockBackend {
    async fn merge_trees(&self, base: &TreeId, ours: &TreeId, theirs: &TreeId) -> Result<TreeMerge> {
        let delay = *self.merge_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.merge_calls.lock().unwrap().push(MergeTreesCall {
            base: base.clone(),
            ours: ours.clone(),
            theirs: theirs.clone(),
        });

        // Check for injected error
        if let Some(msg) = Self::injected(&self.error_on_merge) {
            return Err(Error::Backend(msg));
        }

        let (merged, conflicted) =
            merge_files(&tree_files(base), &tree_files(ours), &tree_files(theirs));
        if conflicted {
            Ok(TreeMerge::Conflict(Some(tree_id(&merged))))
        } else {
            Ok(TreeMerge::Clean(tree_id(&merged)))
        }
    }

    async fn create_commit(
        &self,
        tree: &TreeId,
        parents: &[CommitId],
        message: &str,
    ) -> Result<CommitId> {
        self.create_commit_calls
            .lock()
            .unwrap()
            .push(CreateCommitCall {
                tree: tree.clone(),
                parents: parents.to_vec(),
                message: message.to_string(),
            });

        // Check for injected error
        if let Some(msg) = Self::injected(&self.error_on_create_commit) {
            return Err(Error::Backend(msg));
        }

        let wanted = MockCommit {
            tree: tree.clone(),
            parents: parents.to_vec(),
            message: message.to_string(),
        };
        let mut commits = self.commits.lock().unwrap();
        if let Some((id, _)) = commits.iter().find(|(_, commit)| **commit == wanted) {
            return Ok(id.clone());
        }
        let id = CommitId::new(format!(
            "new{}",
            self.next_commit.fetch_add(1, Ordering::SeqCst)
        ));
        commits.insert(id.clone(), wanted);
        Ok(id)
    }

    async fn move_ref(&self, branch: &str, commit: &CommitId) -> Result<()> {
        self.move_ref_calls
            .lock()
            .unwrap()
            .push((branch.to_string(), commit.clone()));

        // Check for injected error
        if let Some(msg) = Self::injected(&self.error_on_move_ref) {
            return Err(Error::Backend(msg));
        }

        self.refs
            .lock()
            .unwrap()
            .insert(branch.to_string(), commit.clone());
        Ok(())
    }

    async fn read_commit_parents(&self, commit: &CommitId) -> Result<Vec<CommitId>> {
        self.commits
            .lock()
            .unwrap()
            .get(commit)
            .map(|c| c.parents.clone())
            .ok_or_else(|| Error::Backend(format!("unknown commit {commit}")))
    }

    async fn read_commit_tree(&self, commit: &CommitId) -> Result<TreeId> {
        self.commits
            .lock()
            .unwrap()
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| Error::Backend(format!("unknown commit {commit}")))
    }

    async fn read_commit_message(&self, commit: &CommitId) -> Result<String> {
        self.commits
            .lock()
            .unwrap()
            .get(commit)
            .map(|c| c.message.clone())
            .ok_or_else(|| Error::Backend(format!("unknown commit {commit}")))
    }

    async fn resolve_ref(&self, name: &str) -> Result<Option<CommitId>> {
        if let Some(commit) = self.refs.lock().unwrap().get(name) {
            return Ok(Some(commit.clone()));
        }
        let id = CommitId::new(name);
        Ok(self.commits.lock().unwrap().contains_key(&id).then_some(id))
    }

    async fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let commits = self.commits.lock().unwrap();
        let mut queue = VecDeque::from([descendant.clone()]);
        let mut seen = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if &current == ancestor {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(commit) = commits.get(&current) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        Ok(false)
    }

    async fn checkout_scratch(&self, request: &ScratchRequest) -> Result<()> {
        self.checkout_calls.lock().unwrap().push(request.clone());
        *self.scratch.lock().unwrap() = Some(request.clone());
        Ok(())
    }

    async fn release_scratch(&self) -> Result<()> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);

        // Check for injected error
        if let Some(msg) = Self::injected(&self.error_on_release) {
            return Err(Error::Backend(msg));
        }

        *self.scratch.lock().unwrap() = None;
        Ok(())
    }
}
