//! Repository name resolution and pathspec validation.
//!
//! Caller-supplied repository names are untrusted. A name is accepted only if
//! it sanitizes to a relative path made of plain segments and its canonical
//! form (symlinks followed) lies strictly below the canonical root.
//! Containment is decided with [`Path::starts_with`], which compares whole
//! components, so `/srv/repos-evil` is never mistaken for a child of
//! `/srv/repos`.

use crate::config::GitRepoConfig;
use crate::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Characters stripped from every name and pathspec.
pub const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}'];

/// Strips shell metacharacters and every `..` sequence from `input`.
///
/// A run of dots shrinks to at most one dot, so the result never contains
/// `..`. Surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```rust
/// use gitrepo::git::sanitize;
///
/// assert_eq!(sanitize("../../etc/passwd"), "//etc/passwd");
/// assert_eq!(sanitize("repo;rm -rf $(pwd)"), "reporm -rf pwd");
/// ```
#[must_use]
pub fn sanitize(input: &str) -> String {
    let stripped: String = input
        .trim()
        .chars()
        .filter(|c| !SHELL_METACHARACTERS.contains(c))
        .collect();

    stripped.replace("..", "").trim().to_string()
}

/// Returns the plain segments of `sanitized` as a relative path.
///
/// `None` when the path is absolute, carries a drive prefix, contains a
/// parent reference, or has no plain segment at all.
fn plain_segments(sanitized: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for component in Path::new(sanitized).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Validates a file path that will be passed to git as a pathspec.
///
/// The value is sanitized like a repository name and must stay relative with
/// no parent references. It is not resolved on disk: git interprets it
/// relative to the already-confined repository and refuses paths outside the
/// work tree.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] with "Invalid file path" when nothing
/// usable remains.
pub fn sanitize_pathspec(input: &str) -> Result<String> {
    let sanitized = sanitize(input);

    if plain_segments(&sanitized).is_none() {
        return Err(Error::InvalidInput("Invalid file path".to_string()));
    }

    Ok(sanitized)
}

/// A repository directory proven to be inside the configured root.
///
/// Only [`PathResolver::resolve`] creates values of this type. The path is
/// absolute and canonical at the time of resolution; it is re-derived on every
/// call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepoPath(PathBuf);

impl ResolvedRepoPath {
    /// Returns the canonical path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedRepoPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResolvedRepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Resolves repository names against the configured root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for the configured repository root.
    #[must_use]
    pub fn new(config: &GitRepoConfig) -> Self {
        Self::with_root(&config.repos_root)
    }

    /// Creates a resolver for an explicit root.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured (non-canonical) root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` to a confined repository directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRepository`] for every rejection: blank name,
    /// nothing left after sanitization, absolute or traversing segments,
    /// nonexistent target, or a canonical target outside the root.
    pub fn resolve(&self, name: &str) -> Result<ResolvedRepoPath> {
        if name.trim().is_empty() {
            return Err(Error::InvalidRepository);
        }

        let sanitized = sanitize(name);
        let Some(relative) = plain_segments(&sanitized) else {
            tracing::debug!(sanitized = %sanitized, "Rejected repository name");
            return Err(Error::InvalidRepository);
        };

        let canonical_root = std::fs::canonicalize(&self.root).map_err(|e| {
            tracing::warn!(root = %self.root.display(), error = %e, "Repository root is not accessible");
            Error::InvalidRepository
        })?;

        let candidate = std::fs::canonicalize(canonical_root.join(&relative)).map_err(|e| {
            tracing::debug!(name = %relative.display(), error = %e, "Repository does not resolve");
            Error::InvalidRepository
        })?;

        if candidate == canonical_root || !candidate.starts_with(&canonical_root) {
            tracing::warn!(name = %relative.display(), "Repository name escapes the root");
            return Err(Error::InvalidRepository);
        }

        Ok(ResolvedRepoPath(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use test_case::test_case;

    fn root_with_repos(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            std::fs::create_dir_all(dir.path().join(name).join(".git")).unwrap();
        }
        dir
    }

    #[test_case("my-repo", "my-repo" ; "plain name")]
    #[test_case("  spaced  ", "spaced" ; "trims whitespace")]
    #[test_case("a;b&c|d`e$f(g)h{i}j", "abcdefghij" ; "strips metacharacters")]
    #[test_case("../etc", "/etc" ; "removes traversal")]
    #[test_case("....", "" ; "dot runs collapse")]
    #[test_case("...", "." ; "odd dot run keeps one")]
    #[test_case(".(.)", "" ; "metacharacters cannot hide traversal")]
    fn test_sanitize(input: &str, expected: &str) {
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn test_resolve_existing_repo() {
        let root = root_with_repos(&["alpha"]);
        let resolver = PathResolver::with_root(root.path());

        let resolved = resolver.resolve("alpha").unwrap();
        let canonical_root = std::fs::canonicalize(root.path()).unwrap();
        assert_eq!(resolved.as_path(), canonical_root.join("alpha"));
    }

    #[test]
    fn test_resolve_strips_metacharacters_before_lookup() {
        let root = root_with_repos(&["alpha"]);
        let resolver = PathResolver::with_root(root.path());

        assert!(resolver.resolve("al$(ph)a").is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "whitespace")]
    #[test_case(";;;" ; "only metacharacters")]
    #[test_case(".." ; "parent")]
    #[test_case("." ; "root itself")]
    #[test_case("/etc" ; "absolute")]
    #[test_case("../../../../etc" ; "deep traversal")]
    #[test_case("missing" ; "nonexistent")]
    fn test_resolve_rejects(name: &str) {
        let root = root_with_repos(&["alpha"]);
        let resolver = PathResolver::with_root(root.path());

        assert!(matches!(
            resolver.resolve(name),
            Err(Error::InvalidRepository)
        ));
    }

    #[test]
    fn test_resolve_missing_root() {
        let resolver = PathResolver::with_root("/nonexistent/gitrepo/root");
        assert!(resolver.resolve("alpha").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_to_sibling_with_shared_prefix() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("repos");
        let sibling = base.path().join("repos-evil").join("project");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(sibling.join(".git")).unwrap();
        std::os::unix::fs::symlink(&sibling, root.join("link")).unwrap();

        let resolver = PathResolver::with_root(&root);
        assert!(resolver.resolve("link").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_allows_symlink_inside_root() {
        let root = root_with_repos(&["real"]);
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias")).unwrap();

        let resolver = PathResolver::with_root(root.path());
        let resolved = resolver.resolve("alias").unwrap();
        assert!(resolved.as_path().ends_with("real"));
    }

    #[test_case("src/main.rs", "src/main.rs" ; "relative")]
    #[test_case("README.md;", "README.md" ; "strips metacharacters")]
    #[test_case("../secret", "/secret" ; "traversal becomes absolute")]
    fn test_sanitize_pathspec_values(input: &str, sanitized: &str) {
        let result = sanitize_pathspec(input);
        if Path::new(sanitized).is_absolute() {
            assert!(result.is_err());
        } else {
            assert_eq!(result.unwrap(), sanitized);
        }
    }

    #[test_case("" ; "empty")]
    #[test_case("$()" ; "only metacharacters")]
    #[test_case("/etc/passwd" ; "absolute")]
    #[test_case("." ; "current dir only")]
    fn test_sanitize_pathspec_rejects(input: &str) {
        let err = sanitize_pathspec(input).unwrap_err();
        assert_eq!(err.to_string(), "Invalid file path");
    }
}
