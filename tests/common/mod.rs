//! Shared test fixtures

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{Files, MockBackend, files, tree_files, tree_id};

use async_trait::async_trait;
use imerge::grid::AttemptOutcome;
use imerge::progress::ProgressCallback;
use imerge::types::{Cell, CommitId};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Temporary directory laid out like a repository root
pub fn temp_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".git")).unwrap();
    temp
}

/// The duplicated-commit fixture: `main` has 3 commits and `feature` has 4,
/// both editing file `f`.
///
/// ```text
/// C0  f=0
/// A1  f=1          B1  f=1
/// A2  f=2          B2  f=0 (back to the base content)
/// A3  f=2 g=a3     B3  f=0 h=b3
///                  B4  f=0 h=b3 k=b4
/// ```
///
/// Cell 1-2 reproduces the merge base's tree and cell 2-2 is the only
/// conflict (A says f=2, B has reverted to f=0 over an intermediate f=1).
pub fn duplicated_commit_repo() -> MockBackend {
    let repo = MockBackend::new();
    repo.add_commit("C0", &[], &files(&[("f", "0")]), "base");

    repo.add_commit("A1", &["C0"], &files(&[("f", "1")]), "a: set f to 1");
    repo.add_commit("A2", &["A1"], &files(&[("f", "2")]), "a: set f to 2");
    repo.add_commit("A3", &["A2"], &files(&[("f", "2"), ("g", "a3")]), "a: add g");

    repo.add_commit("B1", &["C0"], &files(&[("f", "1")]), "b: set f to 1");
    repo.add_commit("B2", &["B1"], &files(&[("f", "0")]), "b: revert f");
    repo.add_commit("B3", &["B2"], &files(&[("f", "0"), ("h", "b3")]), "b: add h");
    repo.add_commit(
        "B4",
        &["B3"],
        &files(&[("f", "0"), ("h", "b3"), ("k", "b4")]),
        "b: add k\n",
    );

    repo.set_ref("main", "A3");
    repo.set_ref("feature", "B4");
    repo
}

/// Content that resolves the fixture's only conflict
pub fn duplicated_commit_resolution() -> Files {
    files(&[("f", "2")])
}

/// Result of merging the fixture's two tips in one go
pub fn duplicated_commit_expected() -> Files {
    files(&[("f", "2"), ("g", "a3"), ("h", "b3"), ("k", "b4")])
}

/// Branches `main` (n commits) and `feature` (m commits) touching disjoint
/// files, so every cell merges cleanly
pub fn disjoint_repo(n: usize, m: usize) -> MockBackend {
    let repo = MockBackend::new();
    repo.add_commit("C0", &[], &files(&[("readme", "hello")]), "base");

    let mut content = files(&[("readme", "hello")]);
    let mut parent = "C0".to_string();
    for i in 1..=n {
        content.insert(format!("a{i}"), format!("{i}"));
        let id = format!("A{i}");
        repo.add_commit(&id, &[parent.as_str()], &content, &format!("a: commit {i}"));
        parent = id;
    }
    repo.set_ref("main", &parent);

    let mut content = files(&[("readme", "hello")]);
    let mut parent = "C0".to_string();
    for j in 1..=m {
        content.insert(format!("b{j}"), format!("{j}"));
        let id = format!("B{j}");
        repo.add_commit(&id, &[parent.as_str()], &content, &format!("b: commit {j}"));
        parent = id;
    }
    repo.set_ref("feature", &parent);
    repo
}

/// Merge of both tips of [`disjoint_repo`]
pub fn disjoint_expected(n: usize, m: usize) -> Files {
    let mut expected = files(&[("readme", "hello")]);
    for i in 1..=n {
        expected.insert(format!("a{i}"), format!("{i}"));
    }
    for j in 1..=m {
        expected.insert(format!("b{j}"), format!("{j}"));
    }
    expected
}

/// Progress sink that remembers everything it was told
#[derive(Default)]
pub struct RecordingProgress {
    pub attempts: Mutex<Vec<(Cell, AttemptOutcome)>>,
    pub commits: Mutex<Vec<(Cell, CommitId)>>,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingProgress {
    /// Cells in the order they were attempted
    pub fn attempted_cells(&self) -> Vec<Cell> {
        self.attempts.lock().unwrap().iter().map(|(cell, _)| *cell).collect()
    }

    /// Outcome recorded for a cell
    pub fn outcome(&self, cell: Cell) -> Option<AttemptOutcome> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| *c == cell)
            .map(|(_, outcome)| outcome.clone())
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_attempt(&self, cell: Cell, outcome: &AttemptOutcome) {
        self.attempts.lock().unwrap().push((cell, outcome.clone()));
    }

    async fn on_commit(&self, cell: Cell, commit: &CommitId) {
        self.commits.lock().unwrap().push((cell, commit.clone()));
    }

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
