//! Structured logging configuration.
//!
//! Stdout belongs to the JSON-RPC transport, so log output always goes to
//! stderr or to a file.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Environment variable naming the log level when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "GITREPO_LOG_LEVEL";

/// Environment variable selecting `pretty` or `json` output.
pub const ENV_LOG_FORMAT: &str = "GITREPO_LOG_FORMAT";

/// Environment variable naming a log file.
pub const ENV_LOG_FILE: &str = "GITREPO_LOG_FILE";

const DEFAULT_LEVEL: &str = "info";
const VERBOSE_LEVEL: &str = "debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// The filter comes from the first of `RUST_LOG`, `GITREPO_LOG_LEVEL`,
    /// the config file level, `--verbose`, and finally `info`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::from_settings_with(settings, verbose, |key| std::env::var(key).ok())
    }

    /// Like [`Self::from_settings`] with an explicit variable lookup.
    #[must_use]
    pub fn from_settings_with(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let filter = non_blank(lookup("RUST_LOG"))
            .or_else(|| non_blank(lookup(ENV_LOG_LEVEL)))
            .or_else(|| non_blank(settings.and_then(|s| s.level.clone())))
            .unwrap_or_else(|| {
                if verbose {
                    VERBOSE_LEVEL.to_string()
                } else {
                    DEFAULT_LEVEL.to_string()
                }
            });

        let format = non_blank(lookup(ENV_LOG_FORMAT))
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or(LogFormat::Pretty, |value| LogFormat::parse(&value));

        let file = non_blank(lookup(ENV_LOG_FILE))
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        Self {
            format,
            filter,
            file,
        }
    }
}
