//! MCP tool implementations.
//!
//! Provides the eleven repository tools exposed over the Model Context
//! Protocol.
//!
//! # Module Structure
//!
//! - [`definitions`]: Tool schema definitions (JSON Schema for input validation)
//! - [`handlers`]: Tool execution logic
//!   - `listing`: repository discovery under the root
//!   - `inspect`: working tree, branch, remote, and diff queries
//!   - `history`: log, commit, and per-file history queries
//!   - `search`: content search and repository statistics

mod definitions;
mod handlers;

pub use handlers::find_repositories;

use crate::config::GitRepoConfig;
use crate::git::{GitExecutor, GitInvocation, GitOutcome, PathResolver, ResolvedRepoPath};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Shared state handed to every tool handler.
///
/// Built once from the loaded configuration; handlers never read the
/// environment themselves.
#[derive(Debug, Clone)]
pub struct ToolContext {
    config: Arc<GitRepoConfig>,
    resolver: PathResolver,
    executor: GitExecutor,
}

impl ToolContext {
    /// Creates a context from configuration.
    #[must_use]
    pub fn new(config: Arc<GitRepoConfig>) -> Self {
        let resolver = PathResolver::new(&config);
        let executor = GitExecutor::new(&config);
        Self {
            config,
            resolver,
            executor,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GitRepoConfig {
        &self.config
    }

    /// Resolves a repository name inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRepository`] if the name does not resolve to a
    /// directory strictly inside the root.
    pub fn resolve(&self, name: &str) -> Result<ResolvedRepoPath> {
        self.resolver.resolve(name)
    }

    /// Runs git in a resolved repository.
    ///
    /// # Errors
    ///
    /// Propagates executor failures (missing directory, not a repository,
    /// spawn failure).
    pub async fn git(
        &self,
        repo: &ResolvedRepoPath,
        invocation: &GitInvocation,
    ) -> Result<GitOutcome> {
        self.executor.run(repo, invocation).await
    }
}

/// Registry of MCP tools.
pub struct ToolRegistry {
    /// Available tools, ordered by name.
    tools: BTreeMap<String, ToolDefinition>,
    /// Handler state.
    context: ToolContext,
}

impl ToolRegistry {
    /// Creates a new tool registry with all repository tools.
    #[must_use]
    pub fn new(config: Arc<GitRepoConfig>) -> Self {
        let tools = definitions::all_tools()
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();

        Self {
            tools,
            context: ToolContext::new(config),
        }
    }

    /// Returns all tool definitions.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Returns the handler context.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Executes a tool with the given arguments.
    ///
    /// Handler failures (validation, confinement, spawn) are folded into an
    /// error [`ToolResult`] so the client always sees text.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool name is unknown.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let start = Instant::now();
        let ctx = &self.context;

        let result = match name {
            "list_repos" => handlers::execute_list_repos(ctx, arguments),
            "repo_status" => handlers::execute_status(ctx, arguments).await,
            "repo_log" => handlers::execute_log(ctx, arguments).await,
            "repo_branches" => handlers::execute_branches(ctx, arguments).await,
            "repo_diff" => handlers::execute_diff(ctx, arguments).await,
            "repo_remote" => handlers::execute_remote(ctx, arguments).await,
            "repo_current_branch" => handlers::execute_current_branch(ctx, arguments).await,
            "repo_show_commit" => handlers::execute_show_commit(ctx, arguments).await,
            "repo_file_history" => handlers::execute_file_history(ctx, arguments).await,
            "repo_search" => handlers::execute_search(ctx, arguments).await,
            "repo_stats" => handlers::execute_stats(ctx, arguments).await,
            _ => return Err(Error::InvalidInput(format!("Unknown tool: {name}"))),
        };

        let result = result.unwrap_or_else(|e| {
            match &e {
                Error::OperationFailed { .. } | Error::Spawn { .. } => {
                    tracing::error!(tool = %name, error = %e, "Tool execution failed");
                },
                _ => tracing::debug!(tool = %name, error = %e, "Tool rejected input"),
            }
            ToolResult::from_error(&e)
        });

        let status = if result.is_error { "error" } else { "success" };
        metrics::counter!("mcp_tool_calls_total", "tool" => name.to_string(), "status" => status)
            .increment(1);
        metrics::histogram!("mcp_tool_duration_ms", "tool" => name.to_string())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(result)
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful single-text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// An error single-text result.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Renders a handler error as "❌ Error: ...".
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self::error(format!("❌ Error: {error}"))
    }

    /// Concatenated text of every content item.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TOOL_NAMES: [&str; 11] = [
        "list_repos",
        "repo_status",
        "repo_log",
        "repo_branches",
        "repo_diff",
        "repo_remote",
        "repo_current_branch",
        "repo_show_commit",
        "repo_file_history",
        "repo_search",
        "repo_stats",
    ];

    fn registry_for(root: &std::path::Path) -> ToolRegistry {
        ToolRegistry::new(Arc::new(GitRepoConfig::new().with_repos_root(root)))
    }

    fn text_of(result: &ToolResult) -> &str {
        let ToolContent::Text { text } = &result.content[0];
        text
    }

    #[test]
    fn test_tool_registry_creation() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        assert_eq!(registry.list_tools().len(), TOOL_NAMES.len());
        for name in TOOL_NAMES {
            assert!(registry.get_tool(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_every_property_is_a_string() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        for tool in registry.list_tools() {
            assert_eq!(tool.input_schema["type"], "object");
            let properties = tool.input_schema["properties"].as_object().unwrap();
            for (name, schema) in properties {
                assert_eq!(schema["type"], "string", "{}.{name}", tool.name);
            }
        }
    }

    #[test]
    fn test_required_arguments() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        let show = registry.get_tool("repo_show_commit").unwrap();
        let required = show.input_schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("repo_name")));
        assert!(required.contains(&json!("commit_hash")));

        let list = registry.get_tool("list_repos").unwrap();
        assert!(list.input_schema.get("required").is_none());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        let err = registry
            .execute("nonexistent_tool", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_validation_errors_become_tool_errors() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        let result = registry.execute("repo_status", json!({})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(text_of(&result), "❌ Error: Repository name is required");

        let result = registry
            .execute("repo_status", json!({"repo_name": "../../etc"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(text_of(&result), "❌ Error: Invalid repository name");
    }

    #[tokio::test]
    async fn test_unknown_argument_is_tool_error() {
        let dir = TempDir::new().unwrap();
        let registry = registry_for(dir.path());

        let result = registry
            .execute("repo_status", json!({"repo_name": "a", "extra": true}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(text_of(&result).starts_with("❌ Error:"));
    }

    #[test]
    fn test_tool_result_serialization() {
        let value = serde_json::to_value(ToolResult::text("hi")).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hi");
        assert_eq!(value["is_error"], false);
    }

    #[test]
    fn test_joined_text() {
        let result = ToolResult {
            content: vec![
                ToolContent::Text { text: "a".into() },
                ToolContent::Text { text: "b".into() },
            ],
            is_error: false,
        };
        assert_eq!(result.joined_text(), "a\nb");
    }
}
