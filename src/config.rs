//! Per-repository configuration
//!
//! Stored next to the sessions in `<git-dir>/imerge/config.toml`. Every field
//! is optional in the file; a missing file means all defaults.

use crate::error::{Error, Result};
use crate::session::storage::{imerge_dir, write_atomic};
use crate::types::Goal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filename for the configuration.
const CONFIG_FILE: &str = "config.toml";

/// Repository-wide defaults
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Goal used when a session is started without one
    #[serde(default)]
    pub default_goal: Goal,

    /// Follow only first parents when computing commit sequences
    #[serde(default)]
    pub first_parent: bool,

    /// Most recently started session; used when no name is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_session: Option<String>,
}

impl Config {
    /// Get path to the configuration file.
    pub fn path(repo_root: &Path) -> PathBuf {
        imerge_dir(repo_root).join(CONFIG_FILE)
    }

    /// Load configuration from disk.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::path(repo_root);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::State(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| Error::State(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save configuration to disk.
    pub fn save(&self, repo_root: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::State(format!("failed to serialize config: {e}")))?;

        write_atomic(
            &Self::path(repo_root),
            &format!("# imerge configuration\n# Auto-generated - manual edits may be overwritten\n\n{content}"),
        )
    }
}
