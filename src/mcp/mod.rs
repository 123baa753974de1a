//! MCP server implementation.
//!
//! Exposes read-only git repository tools over the Model Context Protocol.
//!
//! ## Features
//!
//! - **Tools**: `list_repos`, `repo_status`, `repo_log`, `repo_branches`,
//!   `repo_diff`, `repo_remote`, `repo_current_branch`, `repo_show_commit`,
//!   `repo_file_history`, `repo_search`, `repo_stats`
//!
//! ## Usage
//!
//! ### Stdio Transport
//!
//! ```bash
//! GIT_REPOS_PATH=/srv/repos gitrepo serve
//! ```
//!
//! ### Client Configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "gitrepo": {
//!       "command": "gitrepo",
//!       "args": ["serve"],
//!       "env": { "GIT_REPOS_PATH": "/srv/repos" }
//!     }
//!   }
//! }
//! ```

mod dispatch;
mod server;
pub mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use server::{
    ENV_RATE_LIMIT_MAX_REQUESTS, ENV_RATE_LIMIT_WINDOW_SECS, McpServer, RateLimitConfig,
};
pub use tools::{
    ToolContent, ToolContext, ToolDefinition, ToolRegistry, ToolResult, find_repositories,
};
