//! Tool execution handlers.
//!
//! This module contains the execution logic for all MCP tools,
//! organized into submodules by the kind of question they answer.
//!
//! Handlers validate arguments first, then resolve the repository, then run
//! git. Validation and confinement failures are returned as `Err` and turned
//! into "❌ Error: ..." text by the registry.

mod history;
mod inspect;
mod listing;
mod search;

pub use history::{execute_file_history, execute_log, execute_show_commit};
pub use inspect::{
    execute_branches, execute_current_branch, execute_diff, execute_remote, execute_status,
};
pub use listing::{execute_list_repos, find_repositories};
pub use search::{execute_search, execute_stats};

use super::ToolResult;
use crate::git::GitOutcome;

/// Creates a success result with text content.
fn text_result(text: String) -> ToolResult {
    ToolResult::text(text)
}

/// Formats `header` followed by a blank line and the rendered outcome.
///
/// Timeouts are flagged as errors; degraded exits are not.
fn decorated(header: &str, outcome: &GitOutcome) -> ToolResult {
    let text = format!("{header}\n\n{}", outcome.render());
    if outcome.is_timeout() {
        ToolResult::error(text)
    } else {
        text_result(text)
    }
}

/// Returns the outcome text unless it carries nothing worth showing.
///
/// Both a clean exit with no output and whitespace-only output count as
/// empty.
fn meaningful_output(outcome: &GitOutcome) -> Option<&str> {
    outcome.output().filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::CapturedText;
    use std::time::Duration;

    #[test]
    fn test_decorated_output() {
        let outcome = GitOutcome::Output(CapturedText::bounded("clean", 100));
        let result = decorated("📊 Status for r:", &outcome);

        assert!(!result.is_error);
        assert_eq!(result.joined_text(), "📊 Status for r:\n\nclean");
    }

    #[test]
    fn test_decorated_timeout_is_error() {
        let result = decorated("h", &GitOutcome::TimedOut(Duration::from_secs(30)));

        assert!(result.is_error);
        assert_eq!(
            result.joined_text(),
            "h\n\n⏱️ Command timed out after 30 seconds"
        );
    }

    #[test]
    fn test_decorated_degraded_is_not_error() {
        let outcome = GitOutcome::Degraded {
            code: Some(128),
            text: CapturedText::bounded("fatal: bad revision", 100),
        };
        let result = decorated("h", &outcome);

        assert!(!result.is_error);
        assert!(result.joined_text().contains("status 128"));
    }

    #[test]
    fn test_meaningful_output() {
        assert_eq!(meaningful_output(&GitOutcome::Completed), None);
        let outcome = GitOutcome::Output(CapturedText::bounded("x", 10));
        assert_eq!(meaningful_output(&outcome), Some("x"));
    }
}
