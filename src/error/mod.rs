use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Thought store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Node not found: {node_id}")]
    NotFound { node_id: String },

    #[error("Cycle detected walking parent links from {node_id} (bound: {bound})")]
    CycleDetected { node_id: String, bound: usize },
}

/// Strategy layer errors
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
