//! Binary entry point for gitrepo.
//!
//! This binary serves the repository tools over MCP stdio and offers a
//! couple of local commands for trying them out.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use gitrepo::config::GitRepoConfig;
use gitrepo::mcp::{McpServer, ToolRegistry};
use gitrepo::observability::{self, ObservabilityConfig};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Environment variable naming the configuration file.
const ENV_CONFIG_PATH: &str = "GITREPO_CONFIG_PATH";

/// gitrepo - read-only git tools for a directory of repositories.
#[derive(Parser)]
#[command(name = "gitrepo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the repositories (overrides `GIT_REPOS_PATH`).
    #[arg(long, global = true)]
    repos_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio (default).
    Serve,

    /// Run one tool and print its text output.
    Call {
        /// Tool name, e.g. `repo_status`.
        tool: String,

        /// Tool argument as key=value; repeatable.
        #[arg(short, long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },

    /// List the available tools.
    Tools,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let _observability =
        match observability::init(ObservabilityConfig::from_config(&config, cli.verbose)) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Failed to initialize observability: {e}");
                return ExitCode::FAILURE;
            },
        };

    tracing::info!(
        root = %config.repos_root.display(),
        timeout_secs = config.command_timeout.as_secs(),
        max_output_chars = config.max_output_chars,
        "Starting gitrepo"
    );
    for warning in config.warnings() {
        tracing::warn!(
            source = %warning.source,
            detail = %warning.detail,
            "Ignoring configuration value"
        );
    }
    if !config.repos_root.exists() {
        tracing::warn!(root = %config.repos_root.display(), "Repository root does not exist");
    }

    match run_command(cli.command.unwrap_or(Commands::Serve), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: Arc<GitRepoConfig>) -> anyhow::Result<()> {
    match command {
        Commands::Serve => McpServer::new(config)
            .run_stdio()
            .await
            .context("MCP server stopped"),
        Commands::Call { tool, args } => cmd_call(config, &tool, &args).await,
        Commands::Tools => {
            cmd_tools(&config);
            Ok(())
        },
    }
}

/// Loads configuration: file, then environment, then CLI flags.
fn load_config(cli: &Cli) -> anyhow::Result<GitRepoConfig> {
    let from_env = std::env::var(ENV_CONFIG_PATH)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from);

    let config = match cli.config.clone().or(from_env) {
        Some(path) => load_file(&path)?,
        None => GitRepoConfig::load_default(),
    };

    let config = config.with_env_overrides();
    Ok(match &cli.repos_path {
        Some(path) => config.with_repos_root(path),
        None => config,
    })
}

fn load_file(path: &Path) -> anyhow::Result<GitRepoConfig> {
    GitRepoConfig::load_from_file(path)
        .with_context(|| format!("reading {}", path.display()))
}

/// Parses `key=value` pairs into a JSON argument object.
fn parse_tool_args(pairs: &[String]) -> anyhow::Result<Value> {
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("argument '{pair}' is not of the form key=value");
        };
        map.insert(key.trim().to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(map))
}

/// Call command.
async fn cmd_call(config: Arc<GitRepoConfig>, tool: &str, pairs: &[String]) -> anyhow::Result<()> {
    let arguments = parse_tool_args(pairs)?;
    let registry = ToolRegistry::new(config);
    let result = registry.execute(tool, arguments).await?;

    println!("{}", result.joined_text());
    if result.is_error {
        bail!("tool '{tool}' reported an error");
    }
    Ok(())
}

/// Tools command.
fn cmd_tools(config: &Arc<GitRepoConfig>) {
    let registry = ToolRegistry::new(Arc::clone(config));
    for tool in registry.list_tools() {
        println!("{:<22} {}", tool.name, tool.description);
    }
}
