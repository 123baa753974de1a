//! Git argument vectors.
//!
//! Arguments are pushed one element at a time and handed to the process as a
//! discrete vector. Nothing here is ever joined into a string that a shell or
//! a whitespace splitter would re-tokenize, so a search term or path
//! containing spaces stays a single argument.

use std::fmt;

/// An ordered list of git arguments, starting with the subcommand.
///
/// The repository directory is not part of the invocation; the executor
/// prepends `-C <repo>` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInvocation {
    args: Vec<String>,
}

impl GitInvocation {
    /// Starts an invocation for `subcommand`.
    #[must_use]
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            args: vec![subcommand.into()],
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `--` followed by a single pathspec.
    #[must_use]
    pub fn pathspec(self, path: impl Into<String>) -> Self {
        self.arg("--").arg(path)
    }

    /// Returns the subcommand.
    #[must_use]
    pub fn subcommand(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    /// Returns every argument, subcommand first.
    #[must_use]
    pub fn as_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for GitInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args.join(" "))
    }
}
