//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Stdio-based server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null if notification, must always be present per spec).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// The MCP protocol version supported.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: Capabilities,
    /// Server identification information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Unique tool name (used in tool calls).
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// The name of the tool to invoke.
    pub name: String,
    /// Optional arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (e.g., "text").
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text content of the result.
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// The result content items.
    pub content: Vec<ToolResultContent>,
    /// Whether the result represents an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
///
/// Handles JSON-RPC 2.0 messages over stdin/stdout for MCP protocol
/// communication with clients.
pub struct McpServer {
    /// Shared application state.
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("MCP Strategic Reasoning Server starting...");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Only send response if not a notification (per JSON-RPC 2.0 spec)
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request
    /// Returns None for notifications (requests without id) per JSON-RPC 2.0 spec
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Check if this is a notification (no id = no response required)
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                // Notification - no response per JSON-RPC 2.0
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                // Notification - no response
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                // For unknown methods, only respond if it's a request (has id)
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "mcp-strategic-reasoning".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        let tools = vec![
            get_process_tool(),
            get_best_path_tool(),
            get_stats_tool(),
            get_set_strategy_tool(),
            get_strategies_tool(),
            get_export_tool(),
            get_clear_tool(),
        ];

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tools
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => (
                    ToolResultContent {
                        content_type: "text".to_string(),
                        text: format!("Error: {}", e),
                    },
                    Some(true),
                ),
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id.clone(), -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Get the main reasoning tool definition
fn get_process_tool() -> Tool {
    Tool {
        name: "reasoning_process".to_string(),
        description: "Process one reasoning step in the thought tree. Returns the new node's id \
                      (use it as parent_id to continue the path), its score, and strategy-specific \
                      progress metrics. Strategies: beam_search (default), mcts, a_star, csp, hybrid."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The reasoning step to record"
                },
                "thought_number": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "One-based step index; depth = thought_number - 1"
                },
                "total_thoughts": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Estimated total number of steps"
                },
                "next_thought_needed": {
                    "type": "boolean",
                    "description": "False marks this path complete"
                },
                "parent_id": {
                    "type": "string",
                    "description": "Node id to branch from"
                },
                "strategy_type": {
                    "type": "string",
                    "enum": ["beam_search", "mcts", "a_star", "csp", "hybrid"],
                    "description": "Switch the session to this strategy before processing"
                },
                "branching_factor": {
                    "type": "integer",
                    "description": "How many alternatives to explore per step"
                },
                "evaluations": {
                    "type": "object",
                    "additionalProperties": { "type": "number" },
                    "description": "Named sub-metric scores (0-10) for this thought"
                },
                "evaluation_metrics": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Metric names the session scores against"
                },
                "constraints": {
                    "type": "object",
                    "description": "CSP payload: 'domains' and 'assignments' objects"
                },
                "problem_type": {
                    "type": "string",
                    "description": "Game-design category (mechanics, balance, narrative, progression, economy); applies category defaults"
                }
            },
            "required": ["thought", "thought_number", "total_thoughts", "next_thought_needed"]
        }),
    }
}

/// Get the best path tool definition
fn get_best_path_tool() -> Tool {
    Tool {
        name: "reasoning_best_path".to_string(),
        description: "Return the current best root-to-node reasoning path.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "strategy": {
                    "type": "string",
                    "enum": ["beam_search", "mcts", "a_star", "csp", "hybrid"],
                    "description": "Strategy whose selection rule to use (defaults to the active one)"
                }
            }
        }),
    }
}

/// Get the stats tool definition
fn get_stats_tool() -> Tool {
    Tool {
        name: "reasoning_stats".to_string(),
        description: "Session statistics: node count, mean score, max depth, branching factor, and per-strategy metrics.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Get the set-strategy tool definition
fn get_set_strategy_tool() -> Tool {
    Tool {
        name: "reasoning_set_strategy".to_string(),
        description: "Switch the session's default reasoning strategy.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "strategy": {
                    "type": "string",
                    "enum": ["beam_search", "mcts", "a_star", "csp", "hybrid"],
                    "description": "Strategy to activate"
                }
            },
            "required": ["strategy"]
        }),
    }
}

/// Get the strategy listing tool definition
fn get_strategies_tool() -> Tool {
    Tool {
        name: "reasoning_strategies".to_string(),
        description: "List the registered strategies and the active one.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Get the export tool definition
fn get_export_tool() -> Tool {
    Tool {
        name: "reasoning_export".to_string(),
        description: "Reformat a reasoning_process response as an export payload for downstream tools.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "description": "A full reasoning_process response object",
            "properties": {
                "node_id": { "type": "string" },
                "thought": { "type": "string" },
                "score": { "type": "number" },
                "depth": { "type": "integer" },
                "is_complete": { "type": "boolean" },
                "next_thought_needed": { "type": "boolean" }
            },
            "required": ["node_id", "thought", "score", "depth", "is_complete", "next_thought_needed"]
        }),
    }
}

/// Get the clear tool definition
fn get_clear_tool() -> Tool {
    Tool {
        name: "reasoning_clear".to_string(),
        description: "Reset the session: empty the thought store and every strategy's auxiliary state.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_response_success_with_id() {
        let response = JsonRpcResponse::success(Some(Value::from(1)), Value::from("ok"));
        assert_eq!(response.jsonrpc, "2.0");
        assert_eq!(response.id, Value::from(1));
        assert_eq!(response.result, Some(Value::from("ok")));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_jsonrpc_response_success_without_id() {
        let response = JsonRpcResponse::success(None, Value::from("ok"));
        assert_eq!(response.id, Value::Null);
    }

    #[test]
    fn test_jsonrpc_response_error() {
        let response = JsonRpcResponse::error(Some(Value::from(7)), -32601, "Method not found");
        assert_eq!(response.jsonrpc, "2.0");
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
    }

    #[test]
    fn test_jsonrpc_response_serialization() {
        let response = JsonRpcResponse::success(Some(Value::from(1)), Value::from(true));
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
        assert!(!serialized.contains("\"error\""));
    }

    #[test]
    fn test_jsonrpc_request_parse() {
        let request: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#,
        )
        .unwrap();
        assert_eq!(request.method, "tools/list");
        assert!(request.params.is_none());
    }

    #[test]
    fn test_tool_definitions_are_complete() {
        let tools = [
            get_process_tool(),
            get_best_path_tool(),
            get_stats_tool(),
            get_set_strategy_tool(),
            get_strategies_tool(),
            get_export_tool(),
            get_clear_tool(),
        ];
        for tool in &tools {
            assert!(tool.name.starts_with("reasoning_"));
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_process_tool_schema_required_fields() {
        let tool = get_process_tool();
        let required = tool.input_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert!(required.contains(&Value::from("thought")));
        assert!(required.contains(&Value::from("next_thought_needed")));
    }

    #[test]
    fn test_tool_result_serialization_uses_camel_case_flags() {
        let result = ToolCallResult {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text: "{}".to_string(),
            }],
            is_error: Some(true),
        };
        let serialized = serde_json::to_string(&result).unwrap();
        assert!(serialized.contains("\"isError\":true"));
        assert!(serialized.contains("\"type\":\"text\""));
    }
}
