//! Configuration management.
//!
//! Configuration is read once at startup and then passed by reference into
//! every component. Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file
//! 3. Environment variables (`GIT_REPOS_PATH`, `GITREPO_*`)
//! 4. CLI flags (applied by the binary through the `with_*` builders)
//!
//! Loading happens before logging is initialized, so values that are
//! skipped are recorded as [`ConfigWarning`]s for the binary to log once a
//! subscriber exists.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default repository root.
pub const DEFAULT_REPOS_ROOT: &str = "/repos";

/// Default cap on captured git output, in characters.
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 10_000;

/// Default per-command timeout, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Environment variable selecting the repository root.
pub const ENV_REPOS_PATH: &str = "GIT_REPOS_PATH";

/// Environment variable overriding the output cap.
pub const ENV_MAX_OUTPUT: &str = "GITREPO_MAX_OUTPUT";

/// Environment variable overriding the per-command timeout.
pub const ENV_TIMEOUT_SECS: &str = "GITREPO_TIMEOUT_SECS";

/// Environment variable overriding the git binary.
pub const ENV_GIT_BINARY: &str = "GITREPO_GIT_BINARY";

/// Main configuration for gitrepo.
#[derive(Debug, Clone)]
pub struct GitRepoConfig {
    /// Directory under which every served repository must live.
    pub repos_root: PathBuf,
    /// Maximum number of characters of git output returned to the caller.
    pub max_output_chars: usize,
    /// Hard timeout applied to each spawned git process.
    pub command_timeout: Duration,
    /// Git binary to spawn.
    pub git_binary: PathBuf,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
    warnings: Vec<ConfigWarning>,
}

/// A configuration source or value that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Where the value came from: an environment variable, file key, or path.
    pub source: String,
    /// What was wrong with it.
    pub detail: String,
}

impl ConfigWarning {
    fn new(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.detail)
    }
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Output format: "pretty" (default) or "json".
    pub format: Option<String>,
    /// Filter directive, e.g. "info" or "gitrepo=debug".
    pub level: Option<String>,
    /// Optional log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Metrics section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Port for the Prometheus HTTP listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Repository root.
    pub repos_root: Option<String>,
    /// Output cap in characters.
    pub max_output_chars: Option<usize>,
    /// Per-command timeout in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Git binary.
    pub git_binary: Option<String>,
    /// Logging configuration.
    pub logging: Option<LoggingSettings>,
    /// Metrics configuration.
    pub metrics: Option<MetricsSettings>,
}

impl Default for GitRepoConfig {
    fn default() -> Self {
        Self {
            repos_root: PathBuf::from(DEFAULT_REPOS_ROOT),
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            git_binary: PathBuf::from("git"),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
            warnings: Vec::new(),
        }
    }
}

impl GitRepoConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has unknown keys.
    pub fn parse_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<config_dir>/gitrepo/config.toml` and then
    /// `~/.config/gitrepo/config.toml`. Returns the defaults when neither
    /// exists or parses.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("gitrepo").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("gitrepo")
                .join("config.toml"),
        ];

        let mut skipped = Vec::new();
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(mut config) => {
                    skipped.append(&mut config.warnings);
                    config.warnings = skipped;
                    return config;
                },
                Err(e) => skipped.push(ConfigWarning::new(
                    path.display().to_string(),
                    format!("ignoring config file: {e}"),
                )),
            }
        }

        Self {
            warnings: skipped,
            ..Self::default()
        }
    }

    /// Converts a `ConfigFile` to `GitRepoConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(root) = file.repos_root {
            config.repos_root = PathBuf::from(root);
        }
        match file.max_output_chars {
            Some(0) => config.skip("max_output_chars", "0"),
            Some(max) => config.max_output_chars = max,
            None => {},
        }
        match file.command_timeout_secs {
            Some(0) => config.skip("command_timeout_secs", "0"),
            Some(secs) => config.command_timeout = Duration::from_secs(secs),
            None => {},
        }
        if let Some(binary) = file.git_binary {
            config.git_binary = PathBuf::from(binary);
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Unparseable or non-positive numeric values are ignored and recorded
    /// in [`Self::warnings`].
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(root) = get(ENV_REPOS_PATH) {
            self.repos_root = PathBuf::from(root);
        }
        if let Some(raw) = get(ENV_MAX_OUTPUT) {
            match raw.parse::<usize>() {
                Ok(max) if max > 0 => self.max_output_chars = max,
                _ => self.skip(ENV_MAX_OUTPUT, &raw),
            }
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.command_timeout = Duration::from_secs(secs),
                _ => self.skip(ENV_TIMEOUT_SECS, &raw),
            }
        }
        if let Some(binary) = get(ENV_GIT_BINARY) {
            self.git_binary = PathBuf::from(binary);
        }

        self
    }

    /// Values skipped while loading, in the order they were seen.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    fn skip(&mut self, source: &str, value: &str) {
        self.warnings.push(ConfigWarning::new(
            source,
            format!("ignoring invalid value '{value}'; expected a positive integer"),
        ));
    }

    /// Sets the repository root.
    #[must_use]
    pub fn with_repos_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.repos_root = path.into();
        self
    }

    /// Sets the output cap.
    #[must_use]
    pub const fn with_max_output_chars(mut self, max: usize) -> Self {
        self.max_output_chars = max;
        self
    }

    /// Sets the per-command timeout.
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the git binary.
    #[must_use]
    pub fn with_git_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.git_binary = binary.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GitRepoConfig::default();
        assert_eq!(config.repos_root, PathBuf::from("/repos"));
        assert_eq!(config.max_output_chars, 10_000);
        assert_eq!(config.command_timeout, Duration::from_secs(30));
        assert_eq!(config.git_binary, PathBuf::from("git"));
    }

    #[test]
    fn test_parse_toml() {
        let config = GitRepoConfig::parse_toml(
            r#"
            repos_root = "/srv/git"
            max_output_chars = 500
            command_timeout_secs = 5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.repos_root, PathBuf::from("/srv/git"));
        assert_eq!(config.max_output_chars, 500);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_toml_rejects_unknown_keys() {
        assert!(GitRepoConfig::parse_toml("repo_root = \"/x\"").is_err());
    }

    #[test]
    fn test_zero_values_keep_defaults() {
        let config =
            GitRepoConfig::parse_toml("max_output_chars = 0\ncommand_timeout_secs = 0").unwrap();
        assert_eq!(config.max_output_chars, DEFAULT_MAX_OUTPUT_CHARS);
        assert_eq!(
            config.command_timeout,
            Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)
        );
        let sources: Vec<&str> = config.warnings().iter().map(|w| w.source.as_str()).collect();
        assert_eq!(sources, ["max_output_chars", "command_timeout_secs"]);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_REPOS_PATH, "/data/repos"),
            (ENV_MAX_OUTPUT, "2048"),
            (ENV_TIMEOUT_SECS, "not-a-number"),
            (ENV_GIT_BINARY, "  "),
        ]);

        let config = GitRepoConfig::default()
            .with_overrides_from(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.repos_root, PathBuf::from("/data/repos"));
        assert_eq!(config.max_output_chars, 2048);
        assert_eq!(config.command_timeout, Duration::from_secs(30));
        assert_eq!(config.git_binary, PathBuf::from("git"));
        assert_eq!(
            config.warnings(),
            [ConfigWarning::new(
                ENV_TIMEOUT_SECS,
                "ignoring invalid value 'not-a-number'; expected a positive integer"
            )]
        );
    }

    #[test]
    fn test_valid_overrides_record_no_warnings() {
        let config = GitRepoConfig::default().with_overrides_from(|key| {
            (key == ENV_TIMEOUT_SECS).then(|| "12".to_string())
        });

        assert_eq!(config.command_timeout, Duration::from_secs(12));
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = GitRepoConfig::load_from_file(Path::new("/nonexistent/gitrepo.toml"));
        assert!(result.is_err());
    }
}
