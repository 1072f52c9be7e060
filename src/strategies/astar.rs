//! A* expansion over open/closed node sets.

use std::collections::HashMap;

use serde_json::json;

use super::{
    create_node, ReasoningRequest, ReasoningResponse, Strategy, StrategyMetrics, StrategyType,
    SCORE_MAX,
};
use crate::error::AppResult;
use crate::store::{ThoughtNode, ThoughtStore};

/// A* search strategy.
///
/// Every node this strategy creates lives in exactly one of two disjoint
/// maps: `open_set` (discovered, not yet expanded) or `closed_set`
/// (expanded). Both hold copies keyed by id, so an id evicted from the
/// shared store degrades to a plain lookup miss instead of a crash.
///
/// The heuristic estimates remaining steps scaled by a quality factor
/// derived from the score (lower score reads as higher remaining cost). It
/// is an approximation, not an admissible heuristic.
pub struct AStarStrategy {
    open_set: HashMap<String, ThoughtNode>,
    closed_set: HashMap<String, ThoughtNode>,
}

impl AStarStrategy {
    /// Create an A* strategy with empty open/closed sets.
    pub fn new() -> Self {
        Self {
            open_set: HashMap::new(),
            closed_set: HashMap::new(),
        }
    }

    /// Number of nodes awaiting expansion.
    pub fn open_set_size(&self) -> usize {
        self.open_set.len()
    }

    /// Number of nodes already expanded.
    pub fn closed_set_size(&self) -> usize {
        self.closed_set.len()
    }

    /// Remaining-step estimate scaled by score quality.
    fn heuristic(node: &ThoughtNode, request: &ReasoningRequest) -> f64 {
        let remaining = request.total_thoughts.saturating_sub(request.thought_number) as f64;
        let quality_factor = 1.0 + (SCORE_MAX - node.score) / SCORE_MAX;
        remaining * quality_factor
    }

    /// Path cost: sum of scores along the stored root path. A path broken
    /// by eviction degrades to the node's own score.
    fn path_cost(store: &ThoughtStore, node: &ThoughtNode) -> f64 {
        match store.path(&node.id) {
            Ok(path) => path.iter().map(|n| n.score).sum(),
            Err(_) => node.score,
        }
    }

    fn f_value(store: &ThoughtStore, node: &ThoughtNode) -> f64 {
        Self::path_cost(store, node) + node.heuristic_value.unwrap_or(0.0)
    }

    /// Move the minimum-f member of the open set into the closed set.
    /// Ties break on node id so expansion is deterministic.
    fn expand_lowest(&mut self, store: &ThoughtStore) -> Option<ThoughtNode> {
        let selected = self
            .open_set
            .values()
            .map(|n| (Self::f_value(store, n), n.id.clone()))
            .fold(None::<(f64, String)>, |best, candidate| match best {
                Some(current)
                    if candidate.0 > current.0
                        || (candidate.0 == current.0 && candidate.1 > current.1) =>
                {
                    Some(current)
                }
                _ => Some(candidate),
            })?
            .1;

        let node = self.open_set.remove(&selected)?;
        self.closed_set.insert(node.id.clone(), node.clone());
        Some(node)
    }
}

impl Default for AStarStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for AStarStrategy {
    fn kind(&self) -> StrategyType {
        StrategyType::AStar
    }

    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse> {
        let mut node = create_node(store, request)?;
        let heuristic = Self::heuristic(&node, request);
        node.heuristic_value = Some(heuristic);
        if let Some(stored) = store.get_mut(&node.id) {
            stored.heuristic_value = Some(heuristic);
        }

        let total_cost = Self::path_cost(store, &node) + heuristic;
        self.open_set.insert(node.id.clone(), node.clone());

        // One expansion step per request. A complete selection halts that
        // branch; new neighbors only arrive with subsequent caller requests.
        if let Some(expanded) = self.expand_lowest(store) {
            tracing::debug!(
                node_id = %expanded.id,
                complete = expanded.is_complete,
                "Expanded lowest-f node"
            );
        }

        let best_score = self
            .open_set
            .values()
            .map(|n| n.score)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut response = ReasoningResponse::from_node(&node, request.next_thought_needed);
        response.open_set_size = Some(self.open_set.len());
        response.closed_set_size = Some(self.closed_set.len());
        response.estimated_distance_to_goal = Some(heuristic);
        response.total_cost = Some(total_cost);
        response.best_score = if self.open_set.is_empty() {
            None
        } else {
            Some(best_score)
        };
        Ok(response)
    }

    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode> {
        // Prefer a complete node with the highest score across both sets.
        let complete = self
            .open_set
            .values()
            .chain(self.closed_set.values())
            .filter(|n| n.is_complete)
            .fold(None::<&ThoughtNode>, |best, candidate| match best {
                Some(current) if candidate.score > current.score => Some(candidate),
                Some(current) => Some(current),
                None => Some(candidate),
            });
        if let Some(node) = complete {
            return store.path(&node.id).unwrap_or_default();
        }

        // No complete node yet: lowest estimated total cost wins.
        let cheapest = self
            .open_set
            .values()
            .chain(self.closed_set.values())
            .fold(None::<(f64, &ThoughtNode)>, |best, candidate| {
                let f = Self::f_value(store, candidate);
                match best {
                    Some((best_f, _)) if f >= best_f => best,
                    _ => Some((f, candidate)),
                }
            });
        match cheapest {
            Some((_, node)) => store.path(&node.id).unwrap_or_default(),
            None => vec![],
        }
    }

    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::base("A* Search", store);
        metrics
            .extra
            .insert("open_set_size".to_string(), json!(self.open_set.len()));
        metrics
            .extra
            .insert("closed_set_size".to_string(), json!(self.closed_set.len()));
        metrics
    }

    fn clear(&mut self) {
        self.open_set.clear();
        self.closed_set.clear();
    }
}
