//! Tool definitions for MCP tools.
//!
//! Contains the JSON Schema definitions for all repository tools. Every
//! argument is declared as a string, including `limit`.

use super::ToolDefinition;
use serde_json::{Map, Value, json};

const REPO_NAME: &str = "Name of the repository directory under the repositories root";

/// Builds an object schema from `(name, description)` pairs.
fn schema(properties: &[(&str, &str)], required: &[&str]) -> Value {
    let props: Map<String, Value> = properties
        .iter()
        .map(|(name, description)| {
            (
                (*name).to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();

    let mut schema = json!({ "type": "object", "properties": props });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Defines the repository listing tool.
pub fn list_repos_tool() -> ToolDefinition {
    tool(
        "list_repos",
        "List all git repositories under the repositories root",
        schema(
            &[(
                "filter_name",
                "Optional case-insensitive substring to filter repository names",
            )],
            &[],
        ),
    )
}

/// Defines the status tool.
pub fn status_tool() -> ToolDefinition {
    tool(
        "repo_status",
        "Show the working tree status of a repository",
        schema(&[("repo_name", REPO_NAME)], &["repo_name"]),
    )
}

/// Defines the log tool.
pub fn log_tool() -> ToolDefinition {
    tool(
        "repo_log",
        "Show recent commits of a repository, one line each",
        schema(
            &[
                ("repo_name", REPO_NAME),
                ("limit", "Number of commits to show, 1-100 (default: 10)"),
            ],
            &["repo_name"],
        ),
    )
}

/// Defines the branches tool.
pub fn branches_tool() -> ToolDefinition {
    tool(
        "repo_branches",
        "List local and remote branches of a repository",
        schema(&[("repo_name", REPO_NAME)], &["repo_name"]),
    )
}

/// Defines the diff tool.
pub fn diff_tool() -> ToolDefinition {
    tool(
        "repo_diff",
        "Show uncommitted changes in a repository, optionally for a single file",
        schema(
            &[
                ("repo_name", REPO_NAME),
                ("file_path", "Optional file path relative to the repository"),
            ],
            &["repo_name"],
        ),
    )
}

/// Defines the remote tool.
pub fn remote_tool() -> ToolDefinition {
    tool(
        "repo_remote",
        "List the configured remotes of a repository",
        schema(&[("repo_name", REPO_NAME)], &["repo_name"]),
    )
}

/// Defines the current branch tool.
pub fn current_branch_tool() -> ToolDefinition {
    tool(
        "repo_current_branch",
        "Show the currently checked-out branch of a repository",
        schema(&[("repo_name", REPO_NAME)], &["repo_name"]),
    )
}

/// Defines the show commit tool.
pub fn show_commit_tool() -> ToolDefinition {
    tool(
        "repo_show_commit",
        "Show the details and patch of a single commit",
        schema(
            &[
                ("repo_name", REPO_NAME),
                ("commit_hash", "Full or abbreviated commit hash"),
            ],
            &["repo_name", "commit_hash"],
        ),
    )
}

/// Defines the file history tool.
pub fn file_history_tool() -> ToolDefinition {
    tool(
        "repo_file_history",
        "Show the commits that touched a file",
        schema(
            &[
                ("repo_name", REPO_NAME),
                ("file_path", "File path relative to the repository"),
                ("limit", "Number of commits to show, 1-100 (default: 10)"),
            ],
            &["repo_name", "file_path"],
        ),
    )
}

/// Defines the search tool.
pub fn search_tool() -> ToolDefinition {
    tool(
        "repo_search",
        "Search tracked files of a repository with git grep",
        schema(
            &[
                ("repo_name", REPO_NAME),
                ("search_term", "Pattern to search for"),
            ],
            &["repo_name", "search_term"],
        ),
    )
}

/// Defines the stats tool.
pub fn stats_tool() -> ToolDefinition {
    tool(
        "repo_stats",
        "Summarize commit count, contributors, and branches of a repository",
        schema(&[("repo_name", REPO_NAME)], &["repo_name"]),
    )
}

/// Every tool definition.
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![
        list_repos_tool(),
        status_tool(),
        log_tool(),
        branches_tool(),
        diff_tool(),
        remote_tool(),
        current_branch_tool(),
        show_commit_tool(),
        file_history_tool(),
        search_tool(),
        stats_tool(),
    ]
}
