//! Beam search over the shared thought store.

use serde_json::json;

use super::{create_node, ReasoningRequest, ReasoningResponse, Strategy, StrategyMetrics, StrategyType};
use crate::error::AppResult;
use crate::store::{ThoughtNode, ThoughtStore};

/// Scan-based beam search.
///
/// Keeps no frontier of its own: selection is recomputed from a full store
/// scan on demand, so the strategy survives eviction and strategy switches
/// without reconciliation.
pub struct BeamSearchStrategy {
    beam_width: usize,
    min_score: f64,
}

impl BeamSearchStrategy {
    /// Create a beam search with the configured width.
    pub fn new(beam_width: usize) -> Self {
        Self {
            beam_width: beam_width.max(1),
            min_score: 0.0,
        }
    }

    /// Set the viability threshold used when counting live leaves.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Live leaves: nodes with no children, not complete, at or above the
    /// viability threshold. These are the paths a caller can still extend.
    fn live_leaves<'a>(&self, store: &'a ThoughtStore) -> Vec<&'a ThoughtNode> {
        store
            .iter()
            .filter(|n| n.is_leaf() && !n.is_complete && n.score >= self.min_score)
            .collect()
    }
}

impl Strategy for BeamSearchStrategy {
    fn kind(&self) -> StrategyType {
        StrategyType::BeamSearch
    }

    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse> {
        let node = create_node(store, request)?;

        let best_score = store
            .iter()
            .map(|n| n.score)
            .fold(f64::NEG_INFINITY, f64::max);
        let possible_paths = self.live_leaves(store).len();

        let mut response = ReasoningResponse::from_node(&node, request.next_thought_needed);
        response.best_score = Some(best_score);
        response.possible_paths = Some(possible_paths);
        Ok(response)
    }

    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode> {
        // Maximum-score complete node; ties go to the first one encountered
        // in insertion-order scan. That tie-break is stable and deliberate.
        let best = store
            .iter()
            .filter(|n| n.is_complete)
            .fold(None::<&ThoughtNode>, |best, candidate| match best {
                Some(current) if candidate.score > current.score => Some(candidate),
                Some(current) => Some(current),
                None => Some(candidate),
            });

        match best {
            Some(node) => store.path(&node.id).unwrap_or_default(),
            None => vec![],
        }
    }

    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::base("Beam Search", store);
        metrics
            .extra
            .insert("beam_width".to_string(), json!(self.beam_width));
        metrics
            .extra
            .insert("live_leaves".to_string(), json!(self.live_leaves(store).len()));
        metrics
    }

    fn clear(&mut self) {
        // No auxiliary index beyond the shared store.
    }
}
