//! Search strategy implementations.
//!
//! This module provides the five interchangeable strategies that drive
//! thought-tree exploration:
//! - [`BeamSearchStrategy`]: scan-based frontier over the shared store
//! - [`MctsStrategy`]: Monte-Carlo visit/reward accounting with backpropagation
//! - [`AStarStrategy`]: open/closed set expansion with a cost heuristic
//! - [`CspStrategy`]: finite-domain constraint propagation
//! - [`HybridStrategy`]: signal-driven arbiter over the other four
//!
//! All strategies share the node lifecycle in [`create_node`] and the scoring
//! blend in [`score_thought`]; each keeps its own auxiliary index next to the
//! shared [`ThoughtStore`].

mod astar;
mod beam;
mod csp;
mod hybrid;
mod mcts;

pub use astar::*;
pub use beam::*;
pub use csp::*;
pub use hybrid::*;
pub use mcts::*;

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::{AppResult, StoreError, StrategyError};
use crate::store::{SimulationStats, ThoughtNode, ThoughtStore};

// ============================================================================
// Scoring policy
// ============================================================================

/// Upper bound of the nominal score range.
pub const SCORE_MAX: f64 = 10.0;
/// Weight of the caller-supplied evaluation mean in the score blend.
pub const EVALUATION_WEIGHT: f64 = 0.6;
/// Weight of the inherited parent score in the score blend.
pub const PARENT_INHERIT_WEIGHT: f64 = 0.4;
/// Score assumed when the caller supplies no evaluations.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Score a new thought by blending caller-supplied evaluations with the
/// inherited parent score.
///
/// Roots take the evaluation mean directly; children mix it with the parent
/// score using the policy weights above. The result is clamped to the
/// nominal 0-10 range and never NaN.
pub fn score_thought(request: &ReasoningRequest, parent: Option<&ThoughtNode>) -> f64 {
    let base = match &request.evaluations {
        Some(evals) if !evals.is_empty() => {
            evals.values().sum::<f64>() / evals.len() as f64
        }
        _ => NEUTRAL_SCORE,
    };
    let raw = match parent {
        Some(parent) => EVALUATION_WEIGHT * base + PARENT_INHERIT_WEIGHT * parent.score,
        None => base,
    };
    sanitize_score(raw)
}

/// Clamp a score to 0-10, substituting the neutral score for NaN/infinite
/// values so a bad evaluation payload cannot poison downstream ordering.
pub(crate) fn sanitize_score(score: f64) -> f64 {
    if score.is_nan() || score.is_infinite() {
        tracing::warn!(score, "Non-finite score replaced with neutral value");
        NEUTRAL_SCORE
    } else {
        score.clamp(0.0, SCORE_MAX)
    }
}

// ============================================================================
// Request / response contract
// ============================================================================

/// One incoming reasoning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRequest {
    /// The thought text to record (opaque to the core).
    pub thought: String,
    /// One-based step index; `depth = thought_number - 1`.
    pub thought_number: usize,
    /// Caller's estimate of the total step budget.
    pub total_thoughts: usize,
    /// Whether the caller intends to continue after this step.
    pub next_thought_needed: bool,
    /// Parent node id for branching thoughts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Strategy to route this step through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_type: Option<String>,
    /// Number of alternative continuations the caller intends to explore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching_factor: Option<usize>,
    /// Named sub-metric values for this thought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<HashMap<String, f64>>,
    /// Metric names the caller plans to score against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_metrics: Option<Vec<String>>,
    /// Constraint payload (`domains` / `assignments` objects plus free keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Map<String, serde_json::Value>>,
    /// Problem category tag; presence routes through category defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
}

impl ReasoningRequest {
    /// Check the required fields, mirroring the wire contract.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.thought.trim().is_empty() {
            return Err(StrategyError::InvalidRequest {
                message: "thought must not be empty".to_string(),
            });
        }
        if self.thought_number < 1 {
            return Err(StrategyError::InvalidRequest {
                message: "thought_number must be >= 1".to_string(),
            });
        }
        if self.total_thoughts < 1 {
            return Err(StrategyError::InvalidRequest {
                message: "total_thoughts must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Response for one processed reasoning step.
///
/// The always-present fields echo the created node; the optional blocks are
/// populated only by the strategy that ran (and, for category requests, by
/// the domain enrichment layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResponse {
    /// Id of the created node (empty on failure).
    pub node_id: String,
    /// Echoed thought text.
    pub thought: String,
    /// Score assigned to the node.
    pub score: f64,
    /// Depth of the node in the tree.
    pub depth: usize,
    /// Whether the node was marked complete.
    pub is_complete: bool,
    /// Echo of the caller's continuation flag.
    pub next_thought_needed: bool,
    /// Resolved strategy name, stamped by the dispatcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,

    // Beam search / A*
    /// Best score currently tracked by the strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    /// Count of live (extendable) leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_paths: Option<usize>,

    // MCTS
    /// Visit/reward statistics recorded for the new node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationStats>,

    // A*
    /// Nodes discovered but not yet expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_set_size: Option<usize>,
    /// Nodes already expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_set_size: Option<usize>,
    /// Heuristic estimate of remaining distance for the new node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_distance_to_goal: Option<f64>,
    /// `g + h` for the new node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    // CSP
    /// Whether every applicable registered constraint held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints_satisfied: Option<bool>,
    /// Domain variables without a current assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned_variables: Option<usize>,

    // Hybrid
    /// Strategy the arbiter delegated to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_strategy: Option<String>,
    /// Strategies the arbiter can delegate to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_strategies: Option<Vec<String>>,
    /// Normalized score variance over recent nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<f64>,
    /// Weighted goal-clarity indicator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_clarity: Option<f64>,
    /// Explicit constraint keys plus obligation keywords in the thought.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_density: Option<f64>,

    // Category enrichment
    /// Suggested next steps for the tagged problem category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    /// How well the step tracks the category's metric profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_alignment: Option<HashMap<String, f64>>,

    /// Human-readable failure message; set only on the error path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReasoningResponse {
    /// Base response echoing a freshly created node.
    pub fn from_node(node: &ThoughtNode, next_thought_needed: bool) -> Self {
        Self {
            node_id: node.id.clone(),
            thought: node.thought.clone(),
            score: node.score,
            depth: node.depth,
            is_complete: node.is_complete,
            next_thought_needed,
            strategy_used: None,
            best_score: None,
            possible_paths: None,
            simulation: None,
            open_set_size: None,
            closed_set_size: None,
            estimated_distance_to_goal: None,
            total_cost: None,
            constraints_satisfied: None,
            unassigned_variables: None,
            active_strategy: None,
            available_strategies: None,
            uncertainty: None,
            goal_clarity: None,
            constraint_density: None,
            recommendations: None,
            category_alignment: None,
            error: None,
        }
    }

    /// Well-formed failure response for the outermost boundary: empty node
    /// id, not complete, message attached.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut response = Self::from_node(
            &ThoughtNode {
                id: String::new(),
                thought: String::new(),
                depth: 0,
                score: 0.0,
                children: vec![],
                parent_id: None,
                is_complete: false,
                evaluations: HashMap::new(),
                created_at: Utc::now(),
                simulation: None,
                heuristic_value: None,
                constraints: None,
            },
            false,
        );
        response.error = Some(message.into());
        response
    }
}

/// Per-strategy metric snapshot reported by [`Strategy::metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetrics {
    /// Display name of the strategy.
    pub name: String,
    /// Number of nodes visible to the strategy.
    pub nodes_explored: usize,
    /// Mean score across those nodes.
    pub average_score: f64,
    /// Deepest node seen.
    pub max_depth: usize,
    /// Set on the session's active strategy in aggregated stats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Strategy-specific figures (auxiliary index sizes and the like).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl StrategyMetrics {
    /// Store-wide base figures every strategy starts from.
    pub fn base(name: impl Into<String>, store: &ThoughtStore) -> Self {
        let nodes_explored = store.len();
        let average_score = if nodes_explored == 0 {
            0.0
        } else {
            store.iter().map(|n| n.score).sum::<f64>() / nodes_explored as f64
        };
        let max_depth = store.iter().map(|n| n.depth).max().unwrap_or(0);
        Self {
            name: name.into(),
            nodes_explored,
            average_score,
            max_depth,
            active: None,
            extra: HashMap::new(),
        }
    }
}

// ============================================================================
// Strategy identity and contract
// ============================================================================

/// Search strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Scan-based beam search.
    BeamSearch,
    /// Monte-Carlo tree search.
    Mcts,
    /// A* expansion over open/closed sets.
    AStar,
    /// Finite-domain constraint satisfaction.
    Csp,
    /// Signal-driven arbiter over the other four.
    Hybrid,
}

impl StrategyType {
    /// Every registered strategy, in dispatch-table order.
    pub const ALL: [StrategyType; 5] = [
        StrategyType::BeamSearch,
        StrategyType::Mcts,
        StrategyType::AStar,
        StrategyType::Csp,
        StrategyType::Hybrid,
    ];

    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::BeamSearch => "beam_search",
            StrategyType::Mcts => "mcts",
            StrategyType::AStar => "a_star",
            StrategyType::Csp => "csp",
            StrategyType::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyType {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beam_search" => Ok(StrategyType::BeamSearch),
            "mcts" => Ok(StrategyType::Mcts),
            "a_star" => Ok(StrategyType::AStar),
            "csp" => Ok(StrategyType::Csp),
            "hybrid" => Ok(StrategyType::Hybrid),
            _ => Err(StrategyError::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

/// Common capability contract implemented by all five strategies.
///
/// State mutation happens entirely within the synchronous extent of one
/// `process_thought` call; the dispatcher serializes calls, so no internal
/// locking is needed.
pub trait Strategy: Send {
    /// The strategy's identifier.
    fn kind(&self) -> StrategyType;

    /// Create, score, and link one node, updating the auxiliary index.
    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse>;

    /// Root-to-node path to the strategy's current best candidate, empty
    /// when the store holds nothing usable.
    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode>;

    /// Metric snapshot including auxiliary-index figures.
    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics;

    /// Drop the auxiliary index. The shared store is cleared by the owner.
    fn clear(&mut self);
}

/// Map a strategy identifier to a fresh instance bound to the session
/// configuration.
pub fn create_strategy(kind: StrategyType, config: &SearchConfig) -> Box<dyn Strategy> {
    match kind {
        StrategyType::BeamSearch => {
            Box::new(BeamSearchStrategy::new(config.beam_width).with_min_score(config.min_score))
        }
        StrategyType::Mcts => Box::new(MctsStrategy::new()),
        StrategyType::AStar => Box::new(AStarStrategy::new()),
        StrategyType::Csp => Box::new(CspStrategy::new()),
        StrategyType::Hybrid => Box::new(HybridStrategy::new(config)),
    }
}

// ============================================================================
// Shared node lifecycle
// ============================================================================

/// Create, score, link, and persist the node for one request.
///
/// This is the uniform lifecycle every strategy runs before updating its
/// auxiliary index: validate, resolve the parent, score against it, insert,
/// and append the new id to the parent's child list.
pub(crate) fn create_node(
    store: &mut ThoughtStore,
    request: &ReasoningRequest,
) -> AppResult<ThoughtNode> {
    request.validate()?;

    let parent = match &request.parent_id {
        Some(parent_id) => match store.get(parent_id) {
            Some(node) => Some(node.clone()),
            None => {
                return Err(StoreError::NotFound {
                    node_id: parent_id.clone(),
                }
                .into())
            }
        },
        None => None,
    };

    let node = ThoughtNode {
        id: Uuid::new_v4().to_string(),
        thought: request.thought.clone(),
        depth: request.thought_number - 1,
        score: score_thought(request, parent.as_ref()),
        children: vec![],
        parent_id: request.parent_id.clone(),
        is_complete: !request.next_thought_needed,
        evaluations: request.evaluations.clone().unwrap_or_default(),
        created_at: Utc::now(),
        simulation: None,
        heuristic_value: None,
        constraints: None,
    };

    store.insert(node.clone());
    if let Some(parent_id) = &request.parent_id {
        // The parent may have aged out between lookup and link on a tiny
        // store; a missing parent leaves the child reachable by id only.
        if let Some(parent) = store.get_mut(parent_id) {
            parent.children.push(node.id.clone());
        }
    }

    Ok(node)
}

#[cfg(test)]
pub(crate) fn test_request(thought: &str, number: usize, needed: bool) -> ReasoningRequest {
    ReasoningRequest {
        thought: thought.to_string(),
        thought_number: number,
        total_thoughts: 5,
        next_thought_needed: needed,
        parent_id: None,
        strategy_type: None,
        branching_factor: None,
        evaluations: None,
        evaluation_metrics: None,
        constraints: None,
        problem_type: None,
    }
}
