//! Content search and repository statistics.

use super::{decorated, text_result};
use crate::git::{GitInvocation, GitOutcome};
use crate::mcp::tool_types::{RepoArgs, SearchArgs, parse_args, require};
use crate::mcp::tools::{ToolContext, ToolResult};
use crate::Result;
use serde_json::Value;

/// Number of contributor lines shown by `repo_stats`.
const TOP_CONTRIBUTORS: usize = 5;

/// Whether a `git grep` outcome means "nothing found".
///
/// grep exits 1 with no output when nothing matches; a failing exit with
/// a `fatal:` message (for example an empty repository) is reported the
/// same way. Successful output is always a match, even when the matched
/// line itself contains `fatal:`.
fn is_no_match(outcome: &GitOutcome) -> bool {
    match outcome {
        GitOutcome::Completed => true,
        GitOutcome::Degraded { code, text } => {
            (*code == Some(1) && text.as_str().trim().is_empty())
                || text.as_str().to_lowercase().contains("fatal:")
        },
        GitOutcome::Output(_) | GitOutcome::TimedOut(_) => false,
    }
}

/// Executes the `repo_search` tool.
///
/// The term is handed to `git grep` as a single argument after `-e`, so it
/// is matched literally as a pattern and never parsed as an option.
///
/// # Errors
///
/// Returns an error for a blank repository name or search term, or an
/// unresolvable repository.
pub async fn execute_search(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: SearchArgs = parse_args(arguments)?;
    require(&args.repo_name, "Repository name")?;
    require(&args.search_term, "Search term")?;
    let repo = ctx.resolve(&args.repo_name)?;

    let term = args.search_term.trim();
    let invocation = GitInvocation::new("grep")
        .args(["-n", "-e", term])
        .arg("--");

    let outcome = ctx.git(&repo, &invocation).await?;
    if is_no_match(&outcome) {
        return Ok(text_result(format!(
            "🔍 No matches found for '{term}' in {}",
            args.repo_name
        )));
    }

    Ok(decorated(
        &format!("🔍 Search results for '{term}' in {}:", args.repo_name),
        &outcome,
    ))
}

/// Non-blank report lines of an outcome.
///
/// A clean exit with no output contributes no lines; degraded and timed out
/// outcomes contribute their rendered text.
fn report_lines(outcome: &GitOutcome) -> Vec<String> {
    let text = match outcome {
        GitOutcome::Completed => return Vec::new(),
        GitOutcome::Output(text) => text.as_str().to_string(),
        other => other.render(),
    };

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Executes the `repo_stats` tool.
///
/// Runs three git commands one after another. They are not atomic: a
/// degraded sub-result is folded into the report instead of aborting it.
///
/// # Errors
///
/// Returns an error for a blank or unresolvable repository name, or if git
/// cannot be started.
pub async fn execute_stats(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: RepoArgs = parse_args(arguments)?;
    require(&args.repo_name, "Repository name")?;
    let repo = ctx.resolve(&args.repo_name)?;

    let commits = ctx
        .git(&repo, &GitInvocation::new("rev-list").args(["--count", "HEAD"]))
        .await?;
    let contributors = ctx
        .git(&repo, &GitInvocation::new("shortlog").args(["-sn", "--all"]))
        .await?;
    let branches = ctx
        .git(&repo, &GitInvocation::new("branch").arg("-a"))
        .await?;

    let commit_count = commits
        .output()
        .map_or_else(|| commits.render(), str::to_string);
    let contributor_lines = report_lines(&contributors);
    let branch_count = report_lines(&branches).len();

    let text = format!(
        "📊 Repository Statistics for {}:\n\n📝 Total Commits: {}\n👥 Contributors: {}\n🌿 Branches: {branch_count}\n\nTop Contributors:\n{}",
        args.repo_name,
        commit_count.trim(),
        contributor_lines.len(),
        contributor_lines
            .iter()
            .take(TOP_CONTRIBUTORS)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let timed_out = [&commits, &contributors, &branches]
        .iter()
        .any(|outcome| outcome.is_timeout());
    Ok(if timed_out {
        ToolResult::error(text)
    } else {
        text_result(text)
    })
}
