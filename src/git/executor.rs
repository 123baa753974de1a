//! Git process execution.
//!
//! Runs git as a child process with [`tokio::process::Command`]: no shell,
//! `-C <repo>` instead of changing the working directory, stdin closed, a hard
//! timeout, and the captured text bounded to the configured character cap.
//!
//! A non-zero exit is not an error here. It is reported as
//! [`GitOutcome::Degraded`] so the caller still gets git's own message; only
//! failing to start the process at all is an [`Error`].

use super::{GitInvocation, ResolvedRepoPath};
use crate::config::GitRepoConfig;
use crate::{Error, Result};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Text shown when git succeeds without printing anything.
pub const SUCCESS_SENTINEL: &str = "✅ Command completed successfully";

/// Captured process output, bounded to a character cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedText {
    text: String,
    truncated: bool,
    original_chars: usize,
}

impl CapturedText {
    /// Bounds `raw` to `max_chars` characters.
    ///
    /// Text at or below the cap is kept unchanged. Longer text is cut to
    /// exactly `max_chars` characters and a marker with the original length
    /// is appended.
    #[must_use]
    pub fn bounded(raw: &str, max_chars: usize) -> Self {
        Self::bounded_with_overflow(raw, max_chars, 0)
    }

    /// Like [`Self::bounded`] for a prefix of a longer stream.
    ///
    /// `overflow_chars` is the number of characters that were read past
    /// `raw` and discarded; they count towards the reported total.
    #[must_use]
    pub fn bounded_with_overflow(raw: &str, max_chars: usize, overflow_chars: usize) -> Self {
        let original_chars = raw.chars().count().saturating_add(overflow_chars);
        if original_chars <= max_chars {
            return Self {
                text: raw.to_string(),
                truncated: false,
                original_chars,
            };
        }

        let mut text: String = raw.chars().take(max_chars).collect();
        let _ = write!(
            text,
            "\n\n... [Output truncated. Total: {original_chars} chars]"
        );

        Self {
            text,
            truncated: true,
            original_chars,
        }
    }

    /// Returns the (possibly truncated) text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the text was cut.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Character count before truncation.
    #[must_use]
    pub const fn original_chars(&self) -> usize {
        self.original_chars
    }
}

/// One drained pipe: the retained leading bytes and the number of
/// characters that followed them.
#[derive(Debug, Default)]
struct PipeCapture {
    bytes: Vec<u8>,
    overflow_chars: usize,
}

impl PipeCapture {
    fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.overflow_chars == 0
    }
}

/// Bytes kept from each pipe for a cap of `max_chars` characters.
///
/// Four bytes per character plus one spare character, so a stream that
/// overflows the budget always decodes to more than `max_chars`.
fn byte_budget(max_chars: usize) -> u64 {
    u64::try_from(max_chars.saturating_add(1).saturating_mul(4)).unwrap_or(u64::MAX)
}

/// Reads at most `budget` bytes and drains the rest, counting its characters.
///
/// Draining keeps the child from blocking on a full pipe. Characters are
/// counted as UTF-8 lead bytes, so a character split at the budget
/// boundary is counted once.
async fn read_bounded<R>(mut reader: R, budget: u64) -> std::io::Result<PipeCapture>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    (&mut reader).take(budget).read_to_end(&mut bytes).await?;

    let mut overflow_chars = 0_usize;
    let mut chunk = [0_u8; 8192];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        overflow_chars += chunk[..read]
            .iter()
            .filter(|byte| (**byte & 0xC0) != 0x80)
            .count();
    }

    Ok(PipeCapture {
        bytes,
        overflow_chars,
    })
}

/// Classified result of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome {
    /// Exit status 0 with output.
    Output(CapturedText),
    /// Exit status 0 with no output.
    Completed,
    /// Non-zero exit, or killed by a signal (`code` is `None`).
    Degraded {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// stdout if non-empty, otherwise stderr.
        text: CapturedText,
    },
    /// The process outlived the timeout and was killed.
    TimedOut(Duration),
}

impl GitOutcome {
    /// Classifies a finished process.
    ///
    /// stdout is reported when non-empty, otherwise stderr.
    #[must_use]
    pub fn classify(code: Option<i32>, stdout: &[u8], stderr: &[u8], max_chars: usize) -> Self {
        let stdout = PipeCapture {
            bytes: stdout.to_vec(),
            overflow_chars: 0,
        };
        let stderr = PipeCapture {
            bytes: stderr.to_vec(),
            overflow_chars: 0,
        };
        Self::classify_pipes(code, &stdout, &stderr, max_chars)
    }

    fn classify_pipes(
        code: Option<i32>,
        stdout: &PipeCapture,
        stderr: &PipeCapture,
        max_chars: usize,
    ) -> Self {
        let pipe = if stdout.is_empty() { stderr } else { stdout };
        let raw = String::from_utf8_lossy(&pipe.bytes);
        let text = || CapturedText::bounded_with_overflow(&raw, max_chars, pipe.overflow_chars);

        match code {
            Some(0) if pipe.overflow_chars == 0 && raw.trim().is_empty() => Self::Completed,
            Some(0) => Self::Output(text()),
            code => Self::Degraded { code, text: text() },
        }
    }

    /// Returns the output text of a successful run.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Output(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether git exited with status 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Output(_) | Self::Completed)
    }

    /// Whether the invocation timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Output(_) => "output",
            Self::Completed => "empty",
            Self::Degraded { .. } => "degraded",
            Self::TimedOut(_) => "timeout",
        }
    }

    /// Renders the outcome with its leading marker.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Output(text) => text.as_str().to_string(),
            Self::Completed => SUCCESS_SENTINEL.to_string(),
            Self::Degraded {
                code: Some(code),
                text,
            } => format!(
                "⚠️ Git command completed with status {code}:\n{}",
                text.as_str()
            ),
            Self::Degraded { code: None, text } => format!(
                "⚠️ Git command terminated by signal:\n{}",
                text.as_str()
            ),
            Self::TimedOut(timeout) => {
                format!("⏱️ Command timed out after {} seconds", format_secs(*timeout))
            },
        }
    }
}

/// Formats whole seconds without a fraction, shorter timeouts with one digit.
fn format_secs(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.1}", duration.as_secs_f64())
    }
}

/// Spawns git for confined repositories.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    git_binary: PathBuf,
    timeout: Duration,
    max_output_chars: usize,
}

impl GitExecutor {
    /// Creates an executor from configuration.
    #[must_use]
    pub fn new(config: &GitRepoConfig) -> Self {
        Self {
            git_binary: config.git_binary.clone(),
            timeout: config.command_timeout,
            max_output_chars: config.max_output_chars,
        }
    }

    /// Returns the per-command timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `invocation` inside `repo`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] if `repo` is no longer a directory
    /// - [`Error::NotARepository`] if `repo` has no `.git` entry
    /// - [`Error::Spawn`] if the git binary cannot be started
    /// - [`Error::OperationFailed`] if waiting on the child fails
    pub async fn run(
        &self,
        repo: &ResolvedRepoPath,
        invocation: &GitInvocation,
    ) -> Result<GitOutcome> {
        let path = repo.as_path();
        if !path.is_dir() {
            return Err(Error::InvalidPath);
        }
        if !path.join(".git").exists() {
            return Err(Error::NotARepository);
        }

        let mut cmd = Command::new(&self.git_binary);
        cmd.arg("-C")
            .arg(path)
            .arg("--no-pager")
            .args(invocation.as_args());

        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_PAGER", "cat");
        cmd.env("GIT_LITERAL_PATHSPECS", "1");

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(repo = %repo, command = %invocation, "Spawning git");
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|e| {
            tracing::error!(binary = %self.git_binary.display(), error = %e, "Failed to spawn git");
            Error::Spawn {
                program: self.git_binary.display().to_string(),
                cause: e.to_string(),
            }
        })?;

        let mut stdout = child.stdout.take().ok_or_else(|| Error::OperationFailed {
            operation: "capture_stdout".to_string(),
            cause: "stdout pipe missing".to_string(),
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| Error::OperationFailed {
            operation: "capture_stderr".to_string(),
            cause: "stderr pipe missing".to_string(),
        })?;

        let budget = byte_budget(self.max_output_chars);
        let waited = tokio::time::timeout(self.timeout, async {
            let (out, err, status) = tokio::join!(
                read_bounded(&mut stdout, budget),
                read_bounded(&mut stderr, budget),
                child.wait()
            );
            out.and_then(|out| err.map(|err| (out, err)))
                .and_then(|(out, err)| status.map(|status| (status, out, err)))
        })
        .await;

        let outcome = match waited {
            Ok(Ok((status, out, err))) => {
                GitOutcome::classify_pipes(status.code(), &out, &err, self.max_output_chars)
            },
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(Error::OperationFailed {
                    operation: "wait_git".to_string(),
                    cause: e.to_string(),
                });
            },
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out git process");
                }
                GitOutcome::TimedOut(self.timeout)
            },
        };

        let elapsed = start.elapsed();
        match &outcome {
            GitOutcome::TimedOut(_) => tracing::warn!(
                repo = %repo,
                command = %invocation,
                timeout_ms = self.timeout.as_millis(),
                "Git command timed out"
            ),
            GitOutcome::Degraded { code, .. } => tracing::warn!(
                repo = %repo,
                command = %invocation,
                code = ?code,
                "Git command exited with non-zero status"
            ),
            _ => tracing::debug!(
                command = %invocation,
                elapsed_ms = elapsed.as_millis(),
                outcome = outcome.label(),
                "Git command finished"
            ),
        }

        metrics::counter!(
            "git_commands_total",
            "subcommand" => invocation.subcommand().to_string(),
            "outcome" => outcome.label()
        )
        .increment(1);
        metrics::histogram!(
            "git_command_duration_ms",
            "subcommand" => invocation.subcommand().to_string()
        )
        .record(elapsed.as_secs_f64() * 1000.0);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::PathResolver;
    use tempfile::TempDir;

    #[test]
    fn test_bounded_keeps_short_text() {
        let captured = CapturedText::bounded("hello", 5);
        assert_eq!(captured.as_str(), "hello");
        assert!(!captured.is_truncated());
    }

    #[test]
    fn test_bounded_truncates_to_exact_cap() {
        let raw = "x".repeat(25);
        let captured = CapturedText::bounded(&raw, 10);

        assert!(captured.is_truncated());
        assert_eq!(captured.original_chars(), 25);
        assert_eq!(
            captured.as_str(),
            format!("{}\n\n... [Output truncated. Total: 25 chars]", "x".repeat(10))
        );
    }

    #[test]
    fn test_bounded_counts_characters_not_bytes() {
        let raw = "é".repeat(4);
        let captured = CapturedText::bounded(&raw, 4);
        assert!(!captured.is_truncated());

        let captured = CapturedText::bounded(&raw, 3);
        assert!(captured.as_str().starts_with("ééé\n"));
    }

    #[test]
    fn test_bounded_with_overflow_reports_full_total() {
        let captured = CapturedText::bounded_with_overflow("abcdef", 4, 10);
        assert!(captured.is_truncated());
        assert_eq!(captured.original_chars(), 16);
        assert_eq!(
            captured.as_str(),
            "abcd\n\n... [Output truncated. Total: 16 chars]"
        );
    }

    #[tokio::test]
    async fn test_read_bounded_keeps_budget_and_counts_rest() {
        let input = "é".repeat(10);
        let capture = read_bounded(input.as_bytes(), 5).await.unwrap();

        assert_eq!(capture.bytes.len(), 5);
        // Five bytes hold two whole characters and the lead byte of a third.
        assert_eq!(capture.overflow_chars, 7);

        let text = CapturedText::bounded_with_overflow(
            &String::from_utf8_lossy(&capture.bytes),
            2,
            capture.overflow_chars,
        );
        assert_eq!(text.original_chars(), 10);
    }

    #[tokio::test]
    async fn test_read_bounded_short_stream_has_no_overflow() {
        let capture = read_bounded(&b"short"[..], byte_budget(100)).await.unwrap();
        assert_eq!(capture.bytes, b"short");
        assert_eq!(capture.overflow_chars, 0);
    }

    #[test]
    fn test_classify_prefers_stdout() {
        let outcome = GitOutcome::classify(Some(0), b"on branch main\n", b"warning\n", 100);
        assert_eq!(outcome.output(), Some("on branch main\n"));
    }

    #[test]
    fn test_classify_empty_success() {
        let outcome = GitOutcome::classify(Some(0), b"", b"  \n", 100);
        assert_eq!(outcome, GitOutcome::Completed);
        assert_eq!(outcome.render(), SUCCESS_SENTINEL);
    }

    #[test]
    fn test_classify_degraded_uses_stderr() {
        let outcome = GitOutcome::classify(Some(128), b"", b"fatal: bad revision\n", 100);
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.render(),
            "⚠️ Git command completed with status 128:\nfatal: bad revision\n"
        );
    }

    #[test]
    fn test_classify_signal() {
        let outcome = GitOutcome::classify(None, b"", b"", 100);
        assert!(matches!(outcome, GitOutcome::Degraded { code: None, .. }));
    }

    #[test]
    fn test_render_timeout() {
        assert_eq!(
            GitOutcome::TimedOut(Duration::from_secs(30)).render(),
            "⏱️ Command timed out after 30 seconds"
        );
        assert_eq!(
            GitOutcome::TimedOut(Duration::from_millis(1500)).render(),
            "⏱️ Command timed out after 1.5 seconds"
        );
    }

    fn fixture(names: &[&str]) -> (TempDir, PathResolver) {
        let root = TempDir::new().unwrap();
        for name in names {
            std::fs::create_dir_all(root.path().join(name)).unwrap();
        }
        let resolver = PathResolver::with_root(root.path());
        (root, resolver)
    }

    #[tokio::test]
    async fn test_run_rejects_directory_without_git() {
        let (_root, resolver) = fixture(&["plain"]);
        let repo = resolver.resolve("plain").unwrap();
        let executor = GitExecutor::new(&GitRepoConfig::default());

        let result = executor.run(&repo, &GitInvocation::new("status")).await;
        assert!(matches!(result, Err(Error::NotARepository)));
    }

    #[tokio::test]
    async fn test_run_rejects_vanished_directory() {
        let (root, resolver) = fixture(&["gone/.git"]);
        let repo = resolver.resolve("gone").unwrap();
        std::fs::remove_dir_all(root.path().join("gone")).unwrap();
        let executor = GitExecutor::new(&GitRepoConfig::default());

        let result = executor.run(&repo, &GitInvocation::new("status")).await;
        assert!(matches!(result, Err(Error::InvalidPath)));
    }

    #[tokio::test]
    async fn test_run_reports_spawn_failure() {
        let (_root, resolver) = fixture(&["repo/.git"]);
        let repo = resolver.resolve("repo").unwrap();
        let config = GitRepoConfig::default().with_git_binary("/nonexistent/bin/git");
        let executor = GitExecutor::new(&config);

        let result = executor.run(&repo, &GitInvocation::new("status")).await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[cfg(unix)]
    fn fake_git(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-git");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_bounds_large_output() {
        let (root, resolver) = fixture(&["repo/.git"]);
        let repo = resolver.resolve("repo").unwrap();
        let bin = TempDir::new().unwrap();
        let config = GitRepoConfig::default()
            .with_repos_root(root.path())
            .with_max_output_chars(100)
            .with_git_binary(fake_git(
                bin.path(),
                "head -c 200000 /dev/zero | tr '\\000' x",
            ));

        let outcome = GitExecutor::new(&config)
            .run(&repo, &GitInvocation::new("show"))
            .await
            .unwrap();

        let GitOutcome::Output(text) = outcome else {
            unreachable!("expected output, got {outcome:?}");
        };
        assert!(text.is_truncated());
        assert_eq!(text.original_chars(), 200_000);
        assert_eq!(
            text.as_str(),
            format!(
                "{}\n\n... [Output truncated. Total: 200000 chars]",
                "x".repeat(100)
            )
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_degraded_reports_stderr() {
        let (root, resolver) = fixture(&["repo/.git"]);
        let repo = resolver.resolve("repo").unwrap();
        let bin = TempDir::new().unwrap();
        let config = GitRepoConfig::default()
            .with_repos_root(root.path())
            .with_git_binary(fake_git(bin.path(), "echo oops >&2\nexit 3"));

        let outcome = GitExecutor::new(&config)
            .run(&repo, &GitInvocation::new("status"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GitOutcome::Degraded {
                code: Some(3),
                text: CapturedText::bounded("oops\n", 10_000),
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_receives_discrete_arguments() {
        let (_root, resolver) = fixture(&["repo/.git"]);
        let repo = resolver.resolve("repo").unwrap();
        let bin = TempDir::new().unwrap();
        let config = GitRepoConfig::default()
            .with_git_binary(fake_git(bin.path(), "for a in \"$@\"; do echo \"[$a]\"; done"));

        let outcome = GitExecutor::new(&config)
            .run(&repo, &GitInvocation::new("grep").arg("-e").arg("a b; echo pwned"))
            .await
            .unwrap();

        let text = outcome.output().unwrap();
        assert!(text.contains("[-C]"));
        assert!(text.contains("[--no-pager]"));
        assert!(text.contains("[a b; echo pwned]"));
        assert!(!text.contains("[pwned]"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_run_timeout_kills_process() {
        let (_root, resolver) = fixture(&["repo/.git"]);
        let repo = resolver.resolve("repo").unwrap();
        let bin = TempDir::new().unwrap();
        let pid_file = bin.path().join("pid");
        let script = fake_git(
            bin.path(),
            &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
        );
        let config = GitRepoConfig::default()
            .with_git_binary(script)
            .with_command_timeout(Duration::from_millis(500));

        let started = Instant::now();
        let outcome = GitExecutor::new(&config)
            .run(&repo, &GitInvocation::new("status"))
            .await
            .unwrap();

        assert!(outcome.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(10));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_entry = PathBuf::from("/proc").join(pid.trim());
        assert!(!proc_entry.exists(), "git process {} still running", pid.trim());
    }
}
