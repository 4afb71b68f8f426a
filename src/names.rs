//! Session and branch name validation
//!
//! Branch names follow git's ref-format rules. Session names are stricter:
//! each session is stored as `<name>.toml`, so a session name must be a
//! single path component.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Session names that would collide with other files in the metadata directory.
const RESERVED_SESSION_NAMES: &[&str] = &["config"];

static SESSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// ```
/// use imerge::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid(name, "contains a control character"));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") || name == "@" {
        return Err(invalid(name, "must not contain '@{' or be '@'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    if name.ends_with('.') {
        return Err(invalid(name, "must not end with '.'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
        if component.ends_with(".lock") {
            return Err(invalid(
                name,
                format!("component must not end with '.lock': {component:?}"),
            ));
        }
    }

    Ok(())
}

/// Validate a session name.
///
/// Letters, digits, `.`, `_` and `-`, starting with a letter or digit, and
/// otherwise acceptable as a branch name (the session name doubles as the
/// default target branch).
pub fn validate_session_name(name: &str) -> Result<()> {
    if !SESSION_NAME.is_match(name) {
        return Err(invalid(
            name,
            "session names may only contain letters, digits, '.', '_' and '-', \
             and must start with a letter or digit",
        ));
    }
    if RESERVED_SESSION_NAMES.contains(&name) {
        return Err(invalid(name, "name is reserved"));
    }
    validate_branch_name(name)
}
