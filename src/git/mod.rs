//! Git operations.
//!
//! The boundary between untrusted tool arguments and the git process:
//! repository name confinement, argument vectors, and bounded execution.

mod executor;
mod invocation;
mod path;

pub use executor::{CapturedText, GitExecutor, GitOutcome, SUCCESS_SENTINEL};
pub use invocation::GitInvocation;
pub use path::{
    PathResolver, ResolvedRepoPath, SHELL_METACHARACTERS, sanitize, sanitize_pathspec,
};
