//! Working tree, branch, remote, and diff queries.

use super::{decorated, meaningful_output, text_result};
use crate::git::{GitInvocation, GitOutcome, sanitize_pathspec};
use crate::mcp::tool_types::{DiffArgs, RepoArgs, parse_args, require};
use crate::mcp::tools::{ToolContext, ToolResult};
use crate::Result;
use serde_json::Value;

const REPO_NAME: &str = "Repository name";

/// Executes the `repo_status` tool.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name.
pub async fn execute_status(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: RepoArgs = parse_args(arguments)?;
    require(&args.repo_name, REPO_NAME)?;
    let repo = ctx.resolve(&args.repo_name)?;

    let outcome = ctx.git(&repo, &GitInvocation::new("status")).await?;
    Ok(decorated(
        &format!("📊 Status for {}:", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_branches` tool.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name.
pub async fn execute_branches(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: RepoArgs = parse_args(arguments)?;
    require(&args.repo_name, REPO_NAME)?;
    let repo = ctx.resolve(&args.repo_name)?;

    let outcome = ctx
        .git(&repo, &GitInvocation::new("branch").arg("-a"))
        .await?;
    Ok(decorated(
        &format!("🌿 Branches for {}:", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_diff` tool.
///
/// Shows the unstaged working-tree diff, optionally for one file.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name, or a file
/// path that sanitizes to nothing usable.
pub async fn execute_diff(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: DiffArgs = parse_args(arguments)?;
    require(&args.repo_name, REPO_NAME)?;
    let repo = ctx.resolve(&args.repo_name)?;

    let (invocation, target) = if args.file_path.trim().is_empty() {
        (GitInvocation::new("diff"), "repository".to_string())
    } else {
        let file = sanitize_pathspec(&args.file_path)?;
        let target = format!("file {file}");
        (GitInvocation::new("diff").pathspec(file), target)
    };

    let outcome = ctx.git(&repo, &invocation).await?;
    if matches!(outcome, GitOutcome::Completed) {
        return Ok(text_result(format!("✅ No changes in {target}")));
    }

    Ok(decorated(
        &format!("📝 Changes in {} ({target}):", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_remote` tool.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name.
pub async fn execute_remote(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: RepoArgs = parse_args(arguments)?;
    require(&args.repo_name, REPO_NAME)?;
    let repo = ctx.resolve(&args.repo_name)?;

    let outcome = ctx
        .git(&repo, &GitInvocation::new("remote").arg("-v"))
        .await?;
    if matches!(outcome, GitOutcome::Completed) {
        return Ok(text_result(format!(
            "🌐 No remotes configured for {}",
            args.repo_name
        )));
    }

    Ok(decorated(
        &format!("🌐 Remotes for {}:", args.repo_name),
        &outcome,
    ))
}

/// Executes the `repo_current_branch` tool.
///
/// A detached HEAD prints nothing, which is reported as the plain success
/// sentinel.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name.
pub async fn execute_current_branch(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: RepoArgs = parse_args(arguments)?;
    require(&args.repo_name, REPO_NAME)?;
    let repo = ctx.resolve(&args.repo_name)?;

    let outcome = ctx
        .git(&repo, &GitInvocation::new("branch").arg("--show-current"))
        .await?;

    if let Some(branch) = meaningful_output(&outcome) {
        return Ok(text_result(format!("🌿 Current branch: {}", branch.trim())));
    }

    let text = outcome.render();
    Ok(if outcome.is_timeout() {
        ToolResult::error(text)
    } else {
        text_result(text)
    })
}
