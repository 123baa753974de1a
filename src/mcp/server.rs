//! MCP server setup and lifecycle.
//!
//! Implements newline-delimited JSON-RPC 2.0 over stdio. Stdout carries
//! protocol messages only; all logging goes to stderr or a log file.
//!
//! ## Transport Authentication
//!
//! None. The server is a trusted local child process of its client; the
//! only access control is repository confinement.

use crate::config::GitRepoConfig;
use crate::mcp::ToolRegistry;
use crate::mcp::dispatch::McpMethod;
use crate::mcp::tools::ToolResult;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{Instrument, info_span};

/// Default maximum requests per rate limit window.
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 1000;

/// Default rate limit window duration (1 minute).
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Maximum request size (1MB) to prevent `DoS` via large payloads.
const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// Environment variable overriding the requests allowed per window.
pub const ENV_RATE_LIMIT_MAX_REQUESTS: &str = "GITREPO_MCP_RATE_LIMIT_MAX_REQUESTS";

/// Environment variable overriding the window length in seconds.
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "GITREPO_MCP_RATE_LIMIT_WINDOW_SECS";

/// MCP protocol version.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
const SERVER_NAME: &str = "gitrepo";

/// MCP rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: usize,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Creates config from environment variables.
    ///
    /// Reads `GITREPO_MCP_RATE_LIMIT_MAX_REQUESTS` and
    /// `GITREPO_MCP_RATE_LIMIT_WINDOW_SECS` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let max_requests = std::env::var(ENV_RATE_LIMIT_MAX_REQUESTS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);

        let window_secs = std::env::var(ENV_RATE_LIMIT_WINDOW_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Sets maximum requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    /// Sets window duration in seconds.
    #[must_use]
    pub const fn with_window_secs(mut self, secs: u64) -> Self {
        self.window = Duration::from_secs(secs);
        self
    }
}

/// Fixed-window request counter.
struct RateLimiter {
    config: RateLimitConfig,
    count: usize,
    window_start: Instant,
}

impl RateLimiter {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Counts one request; `false` once the window's budget is spent.
    fn admit(&mut self) -> bool {
        if self.window_start.elapsed() > self.config.window {
            self.count = 0;
            self.window_start = Instant::now();
        }

        if self.count >= self.config.max_requests {
            return false;
        }

        self.count += 1;
        true
    }
}

/// MCP server for git repositories.
pub struct McpServer {
    /// Tool registry.
    tools: ToolRegistry,
    /// Rate limit configuration.
    rate_limit: RateLimitConfig,
}

impl McpServer {
    /// Creates a new MCP server.
    #[must_use]
    pub fn new(config: Arc<GitRepoConfig>) -> Self {
        Self {
            tools: ToolRegistry::new(config),
            rate_limit: RateLimitConfig::from_env(),
        }
    }

    /// Sets the rate limit configuration.
    #[must_use]
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Runs the server over stdio until stdin reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if reading stdin or writing stdout fails.
    pub async fn run_stdio(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serves newline-delimited requests from `reader`, writing responses
    /// to `writer`.
    ///
    /// Requests are handled one at a time in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut limiter = RateLimiter::new(self.rate_limit.clone());

        while let Some(line) = lines.next_line().await.map_err(|e| io_error("read_stdin", &e))? {
            if line.trim().is_empty() {
                continue;
            }

            let response = if limiter.admit() {
                self.handle_request(&line).await
            } else {
                let max_requests = self.rate_limit.max_requests;
                let window = self.rate_limit.window;
                tracing::warn!(max_requests, ?window, "Rate limit exceeded");
                metrics::counter!("mcp_rate_limit_exceeded_total").increment(1);
                Some(format_error(
                    None,
                    -32000,
                    &format!("Rate limit exceeded: max {max_requests} requests per {window:?}"),
                ))
            };

            let Some(response) = response else {
                continue;
            };

            writer
                .write_all(response.as_bytes())
                .await
                .map_err(|e| io_error("write_stdout", &e))?;
            writer
                .write_all(b"\n")
                .await
                .map_err(|e| io_error("write_stdout", &e))?;
            writer
                .flush()
                .await
                .map_err(|e| io_error("flush_stdout", &e))?;
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handles a JSON-RPC request.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_request(&self, request: &str) -> Option<String> {
        if request.len() > MAX_REQUEST_BODY_SIZE {
            tracing::warn!(
                request_size = request.len(),
                max_size = MAX_REQUEST_BODY_SIZE,
                "Request exceeds maximum size limit"
            );
            return Some(format_error(
                None,
                -32600,
                &format!(
                    "Request too large: {} bytes (max: {} bytes)",
                    request.len(),
                    MAX_REQUEST_BODY_SIZE
                ),
            ));
        }

        let start = Instant::now();
        let span = info_span!(
            "mcp.request",
            rpc.method = tracing::field::Empty,
            rpc.id = tracing::field::Empty,
            status = tracing::field::Empty
        );

        let parsed: std::result::Result<JsonRpcRequest, _> = serde_json::from_str(request);
        let (response, method_label, status_label) = match parsed {
            Ok(req) => {
                span.record("rpc.method", req.method.as_str());
                if let Some(id) = &req.id {
                    span.record("rpc.id", id.to_string().as_str());
                }

                let method = McpMethod::from(req.method.as_str());
                if method.is_notification() && req.id.is_none() {
                    tracing::debug!(parent: &span, method = %method, "Received notification");
                    return None;
                }

                let result = self
                    .dispatch_method(method, req.params)
                    .instrument(span.clone())
                    .await;
                let status_label = if result.is_ok() { "success" } else { "error" };
                span.record("status", status_label);
                (format_response(req.id, result), req.method, status_label)
            },
            Err(e) => {
                span.record("status", "parse_error");
                tracing::debug!(parent: &span, error = %e, "Unparseable request");
                (
                    format_error(None, -32700, &format!("Parse error: {e}")),
                    "parse_error".to_string(),
                    "error",
                )
            },
        };

        metrics::counter!(
            "mcp_requests_total",
            "method" => method_label.clone(),
            "status" => status_label
        )
        .increment(1);
        metrics::histogram!("mcp_request_duration_ms", "method" => method_label)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Some(response)
    }

    /// Dispatches a method call using the command pattern.
    async fn dispatch_method(&self, method: McpMethod, params: Option<Value>) -> DispatchResult {
        tracing::info!(method = %method, "Processing MCP request");

        match method {
            McpMethod::Initialize => Ok(handle_initialize()),
            McpMethod::ListTools => Ok(self.handle_list_tools()),
            McpMethod::CallTool => self.handle_call_tool(params).await,
            McpMethod::Ping | McpMethod::Notification(_) => Ok(serde_json::json!({})),
            McpMethod::Unknown(name) => Err((-32601, format!("Method not found: {name}"))),
        }
    }

    /// Handles tools/list.
    fn handle_list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .list_tools()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        serde_json::json!({ "tools": tools })
    }

    /// Handles tools/call.
    async fn handle_call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or((-32602, "Missing params".to_string()))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or((-32602, "Missing tool name".to_string()))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let span = info_span!("mcp.tool.call", tool.name = name);
        let result = self
            .tools
            .execute(name, arguments)
            .instrument(span)
            .await
            .unwrap_or_else(|e| ToolResult::from_error(&e));

        Ok(serde_json::json!({
            "content": result.content,
            "isError": result.is_error
        }))
    }
}

/// Handles the initialize method.
fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn io_error(operation: &str, e: &std::io::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

/// Formats a successful response.
fn format_response(id: Option<Value>, result: DispatchResult) -> String {
    match result {
        Ok(value) => {
            let response = JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(value),
                error: None,
            };
            serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
        },
        Err((code, message)) => format_error(id, code, &message),
    }
}

/// Formats an error response.
fn format_error(id: Option<Value>, code: i32, message: &str) -> String {
    let response = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}

/// Result type for method dispatch.
type DispatchResult = std::result::Result<Value, (i32, String)>;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC version (required by protocol but not used in code).
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}
