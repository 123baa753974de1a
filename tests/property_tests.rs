//! Property-based tests for repository confinement and argument parsing.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Sanitized names never contain metacharacters or `..`
//! - Every accepted repository name resolves strictly below the root
//! - Commit limits always land in 1..=100
//! - Filtered commit hashes are pure hex

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use gitrepo::PathResolver;
use gitrepo::git::{SHELL_METACHARACTERS, sanitize, sanitize_pathspec};
use gitrepo::mcp::tool_types::{filter_commit_hash, parse_limit};
use proptest::prelude::*;
use std::path::{Component, Path};
use tempfile::TempDir;

/// Names built from letters, separators, dots, and metacharacters.
fn hostile_name() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just("..".to_string()),
            Just("/".to_string()),
            Just(".".to_string()),
            Just("alpha".to_string()),
            Just("nested".to_string()),
            Just("repos-evil".to_string()),
            Just(" ".to_string()),
            proptest::sample::select(SHELL_METACHARACTERS.to_vec()).prop_map(|c| c.to_string()),
        ],
        0..8,
    )
    .prop_map(|parts| parts.concat())
}

fn fixture_root() -> (TempDir, PathResolver) {
    let base = TempDir::new().unwrap();
    let root = base.path().join("repos");
    std::fs::create_dir_all(root.join("alpha").join(".git")).unwrap();
    std::fs::create_dir_all(root.join("alpha").join("nested").join(".git")).unwrap();
    std::fs::create_dir_all(base.path().join("repos-evil").join(".git")).unwrap();
    let resolver = PathResolver::with_root(&root);
    (base, resolver)
}

proptest! {
    /// Property: sanitization removes every metacharacter and every `..`.
    #[test]
    fn prop_sanitize_strips_dangerous_sequences(input in ".{0,64}") {
        let sanitized = sanitize(&input);
        prop_assert!(!sanitized.contains(".."));
        prop_assert!(!sanitized.contains(SHELL_METACHARACTERS));
        prop_assert_eq!(sanitized.trim(), sanitized.as_str());
    }

    /// Property: sanitization is idempotent.
    #[test]
    fn prop_sanitize_idempotent(input in ".{0,64}") {
        let once = sanitize(&input);
        prop_assert_eq!(sanitize(&once), once);
    }

    /// Property: an accepted name resolves to a strict descendant of the
    /// canonical root, never to a sibling sharing its prefix.
    #[test]
    fn prop_resolved_paths_stay_below_root(name in hostile_name()) {
        let (_base, resolver) = fixture_root();
        let canonical_root = std::fs::canonicalize(resolver.root()).unwrap();

        if let Ok(resolved) = resolver.resolve(&name) {
            let path = resolved.as_path();
            prop_assert!(path.starts_with(&canonical_root));
            prop_assert_ne!(path, canonical_root.as_path());
            prop_assert!(!path.components().any(|c| c == Component::ParentDir));
        }
    }

    /// Property: accepted pathspecs are relative and never climb.
    #[test]
    fn prop_pathspecs_are_relative(input in hostile_name()) {
        if let Ok(spec) = sanitize_pathspec(&input) {
            let path = Path::new(&spec);
            prop_assert!(path.is_relative());
            prop_assert!(!path.components().any(|c| c == Component::ParentDir));
        }
    }

    /// Property: limits always fall back into range.
    #[test]
    fn prop_limit_in_range(raw in ".{0,24}") {
        let limit = parse_limit(&raw);
        prop_assert!((1..=100).contains(&limit));
    }

    /// Property: in-range numbers are kept as given.
    #[test]
    fn prop_limit_keeps_valid_numbers(n in 1_usize..=100) {
        prop_assert_eq!(parse_limit(&n.to_string()), n);
    }

    /// Property: out-of-range numbers become the default.
    #[test]
    fn prop_limit_out_of_range_defaults(n in prop_oneof![-1000_i64..=0, 101_i64..10_000]) {
        prop_assert_eq!(parse_limit(&n.to_string()), 10);
    }

    /// Property: filtered hashes contain only hex digits, in input order.
    #[test]
    fn prop_commit_hash_is_hex(raw in ".{0,48}") {
        match filter_commit_hash(&raw) {
            Some(hash) => {
                prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
                let expected: String = raw.chars().filter(char::is_ascii_hexdigit).collect();
                prop_assert_eq!(hash, expected);
            },
            None => prop_assert!(!raw.chars().any(|c| c.is_ascii_hexdigit())),
        }
    }
}

#[test]
fn test_known_hostile_names() {
    let (_base, resolver) = fixture_root();

    for name in [
        "../repos-evil",
        "..",
        "../../..",
        "/",
        "alpha/../../repos-evil",
        ";",
        "$(whoami)",
    ] {
        let resolved = resolver.resolve(name);
        if let Ok(path) = &resolved {
            assert!(
                path.as_path().ends_with("alpha") || path.as_path().ends_with("nested"),
                "{name} resolved to {path}"
            );
        }
    }

    assert!(resolver.resolve("alpha/nested").is_ok());
    assert!(resolver.resolve("../repos-evil").is_err());
}
