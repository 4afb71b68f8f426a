//! Persistence for imerge sessions in `<git-dir>/imerge/`.

use super::{SESSION_VERSION, SessionState};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name for imerge metadata within the git directory.
const IMERGE_DIR: &str = "imerge";

/// Extension of session files.
const SESSION_EXT: &str = "toml";

/// Resolve the git directory of a repository, handling linked worktrees.
///
/// In linked worktrees (and submodules) `.git` is a plain text file of the
/// form `gitdir: <path>`, where a relative path is relative to the worktree
/// root. We must read this file and use its target as the git directory.
///
/// Falls back to the original path if resolution fails.
pub fn resolve_git_dir(repo_root: &Path) -> PathBuf {
    let git_path = repo_root.join(".git");

    if git_path.is_file() {
        if let Ok(contents) = fs::read_to_string(&git_path) {
            if let Some(target) = contents.trim().strip_prefix("gitdir:") {
                let target = repo_root.join(target.trim());
                if target.is_dir() {
                    return fs::canonicalize(&target).unwrap_or(target);
                }
            }
        }
        // Pointer file exists but is invalid/unreadable - return as-is to surface error
        return git_path;
    }

    git_path
}

/// Get path to the imerge metadata directory.
pub fn imerge_dir(repo_root: &Path) -> PathBuf {
    resolve_git_dir(repo_root).join(IMERGE_DIR)
}

/// Get path to a session's state file.
pub fn session_path(repo_root: &Path, name: &str) -> PathBuf {
    imerge_dir(repo_root).join(format!("{name}.{SESSION_EXT}"))
}

/// Whether a session with this name has been saved.
pub fn session_exists(repo_root: &Path, name: &str) -> bool {
    session_path(repo_root, name).is_file()
}

/// Write `content` to `path` atomically.
///
/// The content goes to a sibling temp file first and is then renamed over
/// `path`, so readers see either the old or the new file, never a torn one.
/// Creates the parent directory if it doesn't exist.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::State(format!("failed to create {}: {e}", dir.display())))?;
        }
    }

    let tmp = path.with_extension(format!("{SESSION_EXT}.tmp"));
    fs::write(&tmp, content)
        .map_err(|e| Error::State(format!("failed to write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        Error::State(format!(
            "failed to move {} into place: {e}",
            path.display()
        ))
    })?;
    Ok(())
}

/// Load a session from disk.
///
/// # Errors
/// `SessionNotFound` if no such session was saved; `State` if the file is
/// unreadable, from an unsupported version, or inconsistent.
pub fn load_session(repo_root: &Path, name: &str) -> Result<SessionState> {
    let path = session_path(repo_root, name);

    if !path.exists() {
        return Err(Error::SessionNotFound(name.to_string()));
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::State(format!("failed to read {}: {e}", path.display())))?;

    let state: SessionState = toml::from_str(&content)
        .map_err(|e| Error::State(format!("failed to parse {}: {e}", path.display())))?;

    if state.version != SESSION_VERSION {
        return Err(Error::State(format!(
            "{} has version {}, expected {SESSION_VERSION}",
            path.display(),
            state.version
        )));
    }
    if state.name != name {
        return Err(Error::State(format!(
            "{} belongs to session '{}'",
            path.display(),
            state.name
        )));
    }
    let (n, m) = (state.boundary.n(), state.boundary.m());
    if let Some((cell, _)) = state
        .records
        .iter()
        .find(|(cell, _)| cell.i > n || cell.j > m)
    {
        return Err(Error::State(format!(
            "{} records cell {cell} outside the {n}x{m} grid",
            path.display()
        )));
    }

    debug!(session = name, records = state.records.len(), "loaded session");
    Ok(state)
}

/// Save a session to disk.
///
/// Creates the `<git-dir>/imerge/` directory if it doesn't exist.
pub fn save_session(repo_root: &Path, state: &SessionState) -> Result<()> {
    let path = session_path(repo_root, &state.name);

    // Serialize with version
    let mut state_to_save = state.clone();
    state_to_save.version = SESSION_VERSION;

    let content = toml::to_string_pretty(&state_to_save)
        .map_err(|e| Error::State(format!("failed to serialize session state: {e}")))?;

    // Add header comment
    let content_with_header = format!(
        "# imerge session '{}'\n# Auto-generated - manual edits may be overwritten\n\n{content}",
        state.name
    );

    write_atomic(&path, &content_with_header)
}

/// Delete a saved session.
pub fn remove_session(repo_root: &Path, name: &str) -> Result<()> {
    let path = session_path(repo_root, name);
    if !path.exists() {
        return Err(Error::SessionNotFound(name.to_string()));
    }
    fs::remove_file(&path)
        .map_err(|e| Error::State(format!("failed to remove {}: {e}", path.display())))
}

/// Names of all saved sessions, sorted.
pub fn list_sessions(repo_root: &Path) -> Result<Vec<String>> {
    let dir = imerge_dir(repo_root);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&dir)
        .map_err(|e| Error::State(format!("failed to read {}: {e}", dir.display())))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::State(format!("failed to read {}: {e}", dir.display())))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if crate::names::validate_session_name(stem).is_ok() {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
