//! Argument types and helper functions for MCP tools.
//!
//! Every tool argument is a string. Missing arguments default to empty
//! strings so that blank-argument validation produces the tool's own
//! "X is required" message instead of a deserialization error.
//!
//! # Security
//!
//! All argument types use `#[serde(deny_unknown_fields)]` to prevent
//! parameter pollution attacks where unexpected fields could slip past
//! validation.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Commit limit used when the caller's value is missing or unusable.
pub const DEFAULT_LIMIT: usize = 10;

/// Largest accepted commit limit.
pub const MAX_LIMIT: usize = 100;

/// Arguments for `list_repos`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ListReposArgs {
    /// Case-insensitive substring filter on repository names.
    pub filter_name: String,
}

/// Arguments for tools that only take a repository.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RepoArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
}

/// Arguments for `repo_log`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
    /// Number of commits, "1" to "100".
    #[serde(deserialize_with = "lenient_string")]
    pub limit: String,
}

/// Arguments for `repo_diff`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DiffArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
    /// Optional file to restrict the diff to.
    pub file_path: String,
}

/// Arguments for `repo_show_commit`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ShowCommitArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
    /// Full or abbreviated commit hash.
    pub commit_hash: String,
}

/// Arguments for `repo_file_history`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileHistoryArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
    /// File whose history is listed.
    pub file_path: String,
    /// Number of commits, "1" to "100".
    #[serde(deserialize_with = "lenient_string")]
    pub limit: String,
}

/// Arguments for `repo_search`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchArgs {
    /// Repository directory name under the root.
    pub repo_name: String,
    /// Pattern passed to `git grep`.
    pub search_term: String,
}

/// Accepts any JSON value and yields a string.
///
/// Clients routinely send `"limit": 5` despite the string schema. Values
/// that are neither strings nor numbers become blank, which
/// [`parse_limit`] turns into the default.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Ok(String::new()),
    }
}

/// Parses JSON arguments, converting errors to crate Error type.
pub fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Fails with "`what` is required" when `value` is blank.
pub fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{what} is required")));
    }
    Ok(())
}

/// Parses a commit limit leniently.
///
/// Blank, non-numeric, and out-of-range values all fall back to
/// [`DEFAULT_LIMIT`].
#[must_use]
pub fn parse_limit(raw: &str) -> usize {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| (1..=MAX_LIMIT).contains(n))
        .unwrap_or(DEFAULT_LIMIT)
}

/// Keeps only the hexadecimal characters of a commit hash.
///
/// Returns `None` when nothing remains.
#[must_use]
pub fn filter_commit_hash(raw: &str) -> Option<String> {
    let hash: String = raw.chars().filter(char::is_ascii_hexdigit).collect();
    (!hash.is_empty()).then_some(hash)
}
