//! Commit history queries.

use super::decorated;
use crate::git::{GitInvocation, sanitize_pathspec};
use crate::mcp::tool_types::{
    FileHistoryArgs, LogArgs, ShowCommitArgs, filter_commit_hash, parse_args, parse_limit,
    require,
};
use crate::mcp::tools::{ToolContext, ToolResult};
use crate::{Error, Result};
use serde_json::Value;

/// `git log --oneline -n <limit>`.
fn oneline_log(limit: usize) -> GitInvocation {
    GitInvocation::new("log")
        .arg("--oneline")
        .arg("-n")
        .arg(limit.to_string())
}

/// Executes the `repo_log` tool.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name.
pub async fn execute_log(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: LogArgs = parse_args(arguments)?;
    require(&args.repo_name, "Repository name")?;
    let repo = ctx.resolve(&args.repo_name)?;
    let limit = parse_limit(&args.limit);

    let outcome = ctx.git(&repo, &oneline_log(limit)).await?;
    Ok(decorated(
        &format!("📜 Last {limit} commits for {}:", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_show_commit` tool.
///
/// # Errors
///
/// Returns an error for a blank repository name or hash, an unresolvable
/// repository, or a hash with no hexadecimal characters.
pub async fn execute_show_commit(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: ShowCommitArgs = parse_args(arguments)?;
    require(&args.repo_name, "Repository name")?;
    require(&args.commit_hash, "Commit hash")?;
    let repo = ctx.resolve(&args.repo_name)?;

    let hash = filter_commit_hash(&args.commit_hash)
        .ok_or_else(|| Error::InvalidInput("Invalid commit hash format".to_string()))?;

    let outcome = ctx
        .git(&repo, &GitInvocation::new("show").arg(hash.as_str()))
        .await?;
    Ok(decorated(
        &format!("📝 Commit {hash} in {}:", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_file_history` tool.
///
/// # Errors
///
/// Returns an error for a blank repository name or file path, an
/// unresolvable repository, or a file path that sanitizes to nothing usable.
pub async fn execute_file_history(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: FileHistoryArgs = parse_args(arguments)?;
    require(&args.repo_name, "Repository name")?;
    require(&args.file_path, "File path")?;
    let repo = ctx.resolve(&args.repo_name)?;

    let file = sanitize_pathspec(&args.file_path)?;
    let limit = parse_limit(&args.limit);

    let outcome = ctx
        .git(&repo, &oneline_log(limit).pathspec(file.as_str()))
        .await?;
    Ok(decorated(
        &format!("📜 History for {file} in {}:", args.repo_name),
        &outcome,
    ))
}
