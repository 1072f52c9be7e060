use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::SharedState;
use crate::domain::export_payload;
use crate::error::{McpError, McpResult};
use crate::strategies::{ReasoningRequest, ReasoningResponse};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "reasoning_process" => handle_process(state, arguments).await,
        "reasoning_best_path" => handle_best_path(state, arguments).await,
        "reasoning_stats" => handle_stats(state).await,
        "reasoning_set_strategy" => handle_set_strategy(state, arguments).await,
        "reasoning_strategies" => handle_strategies(state).await,
        "reasoning_export" => handle_export(arguments),
        "reasoning_clear" => handle_clear(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// Handle reasoning_process: the main step-by-step reasoning tool.
///
/// Failures inside the reasoner surface as a well-formed error response
/// (empty node id, `error` message) rather than a protocol-level fault, so
/// a client can keep its session alive across a bad request.
async fn handle_process(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let request: ReasoningRequest = parse_arguments("reasoning_process", arguments)?;

    let response = state.reasoner.lock().await.process_thought(request);
    serde_json::to_value(response).map_err(McpError::Json)
}

/// Handle reasoning_best_path: current best root-to-node path.
async fn handle_best_path(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct BestPathParams {
        #[serde(default)]
        strategy: Option<String>,
    }

    // Arguments are optional here; absent means "use the current strategy".
    let params: BestPathParams = match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: "reasoning_best_path".to_string(),
            message: e.to_string(),
        })?,
        None => BestPathParams { strategy: None },
    };

    let reasoner = state.reasoner.lock().await;
    let path = reasoner
        .get_best_path(params.strategy.as_deref())
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(json!({
        "length": path.len(),
        "path": path,
    }))
}

/// Handle reasoning_stats: cross-strategy session aggregates.
async fn handle_stats(state: &SharedState) -> McpResult<Value> {
    let stats = state.reasoner.lock().await.get_stats();
    serde_json::to_value(stats).map_err(McpError::Json)
}

/// Handle reasoning_set_strategy: switch the session default.
async fn handle_set_strategy(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct SetStrategyParams {
        strategy: String,
    }

    let params: SetStrategyParams = parse_arguments("reasoning_set_strategy", arguments)?;

    let mut reasoner = state.reasoner.lock().await;
    reasoner
        .set_strategy(&params.strategy)
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(json!({
        "active_strategy": reasoner.current_strategy().to_string(),
    }))
}

/// Handle reasoning_strategies: list registered strategies.
async fn handle_strategies(state: &SharedState) -> McpResult<Value> {
    let reasoner = state.reasoner.lock().await;
    Ok(json!({
        "available": reasoner.get_available_strategies(),
        "active": reasoner.current_strategy().to_string(),
    }))
}

/// Handle reasoning_export: reformat a response for downstream tools.
/// Pure data shaping, no session state involved.
fn handle_export(arguments: Option<Value>) -> McpResult<Value> {
    let response: ReasoningResponse = parse_arguments("reasoning_export", arguments)?;
    Ok(export_payload(&response))
}

/// Handle reasoning_clear: reset the session.
async fn handle_clear(state: &SharedState) -> McpResult<Value> {
    state.reasoner.lock().await.clear();
    Ok(json!({ "cleared": true }))
}

/// Parse tool arguments into a typed parameter struct
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
