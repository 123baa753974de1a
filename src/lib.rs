//! # gitrepo
//!
//! Read-only git inspection for a set of repositories living under one
//! configured base directory, exposed as MCP tools over stdio.
//!
//! ## Features
//!
//! - Eleven inspection tools: status, log, branches, diff, remotes, current
//!   branch, show commit, file history, search, stats, and repository listing
//! - Repository names confined to the base directory by canonical path
//!   component comparison
//! - Git spawned with a discrete argument vector (never through a shell),
//!   bounded by a per-command timeout and an output size cap
//! - Structured logging via `tracing`, optional Prometheus metrics
//!
//! ## Example
//!
//! ```rust,ignore
//! use gitrepo::{GitExecutor, GitInvocation, GitRepoConfig, PathResolver};
//!
//! let config = GitRepoConfig::default().with_repos_root("/srv/repos");
//! let repo = PathResolver::new(&config).resolve("my-project")?;
//! let outcome = GitExecutor::new(&config)
//!     .run(&repo, &GitInvocation::new("status"))
//!     .await?;
//! println!("{}", outcome.render());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod git;
pub mod mcp;
pub mod observability;

// Re-exports for convenience
pub use config::GitRepoConfig;
pub use git::{
    CapturedText, GitExecutor, GitInvocation, GitOutcome, PathResolver, ResolvedRepoPath,
};

/// Error type for gitrepo operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
/// Every variant is converted to a text result at the tool boundary; none of
/// them terminates the server.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Blank required arguments, bad commit hash, bad file path, malformed JSON arguments |
/// | `InvalidRepository` | Repository name rejected by sanitization or confinement |
/// | `InvalidPath` | Executor target is not an existing directory |
/// | `NotARepository` | Executor target has no `.git` entry |
/// | `Spawn` | The git binary could not be started at all |
/// | `OperationFailed` | I/O errors, directory enumeration, transport failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A required tool argument is blank ("Repository name is required")
    /// - A commit hash has no hexadecimal characters
    /// - A file path is empty after sanitization, absolute, or traverses upwards
    /// - Tool arguments fail to deserialize
    #[error("{0}")]
    InvalidInput(String),

    /// The repository name was rejected.
    ///
    /// Deliberately carries no detail: traversal attempts and missing
    /// directories are indistinguishable to the caller.
    #[error("Invalid repository name")]
    InvalidRepository,

    /// The resolved path is not an existing directory.
    #[error("Invalid repository path")]
    InvalidPath,

    /// The resolved directory has no `.git` entry.
    #[error("Not a git repository")]
    NotARepository,

    /// The git process could not be spawned.
    ///
    /// Raised when the binary is missing or not executable. Distinct from a
    /// non-zero exit status, which is a soft [`GitOutcome::Degraded`].
    #[error("Error executing git command: {cause}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - The repository root cannot be enumerated
    /// - Reading stdin or writing stdout fails in the transport
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for gitrepo operations.
pub type Result<T> = std::result::Result<T, Error>;
