//! Repository discovery.

use super::text_result;
use crate::mcp::tool_types::{ListReposArgs, parse_args};
use crate::mcp::tools::{ToolContext, ToolResult};
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Lists the immediate subdirectories of `root` that contain a `.git` entry.
///
/// A non-blank `filter` keeps only names containing it, ignoring case.
/// Names are sorted.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the directory cannot be read.
pub fn find_repositories(root: &Path, filter: &str) -> Result<Vec<String>> {
    let needle = filter.trim().to_lowercase();
    let entries = std::fs::read_dir(root).map_err(|e| Error::OperationFailed {
        operation: "list_repos".to_string(),
        cause: e.to_string(),
    })?;

    let mut repos: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| {
            let path = entry.path();
            path.is_dir() && path.join(".git").exists()
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
        .collect();

    repos.sort();
    Ok(repos)
}

/// Executes the `list_repos` tool.
///
/// # Errors
///
/// Returns an error if the arguments do not deserialize or the root cannot
/// be read.
pub fn execute_list_repos(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: ListReposArgs = parse_args(arguments)?;
    let root = &ctx.config().repos_root;

    if !root.exists() {
        return Ok(ToolResult::error(format!(
            "❌ Base path does not exist: {}",
            root.display()
        )));
    }

    let repos = find_repositories(root, &args.filter_name)?;
    tracing::debug!(count = repos.len(), filter = %args.filter_name, "Listed repositories");

    if repos.is_empty() {
        return Ok(text_result("📁 No git repositories found".to_string()));
    }

    let listing = repos
        .iter()
        .map(|name| format!("  - {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text_result(format!(
        "📁 Found {} repositories:\n{listing}",
        repos.len()
    )))
}
