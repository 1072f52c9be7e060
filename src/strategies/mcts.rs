//! Monte-Carlo tree search with per-node visit/reward accounting.

use std::cmp::Ordering;

use serde_json::json;

use super::{create_node, ReasoningRequest, ReasoningResponse, Strategy, StrategyMetrics, StrategyType};
use crate::error::AppResult;
use crate::store::{SimulationStats, ThoughtNode, ThoughtStore};

/// Monte-Carlo tree search strategy.
///
/// Each incoming thought is treated as a newly expanded rollout leaf: its
/// score seeds the node's simulation statistics and is backpropagated into
/// every ancestor on the stored root path. The accounting lives on the nodes
/// themselves, so it is cleared together with the store.
pub struct MctsStrategy;

impl MctsStrategy {
    /// Create an MCTS strategy.
    pub fn new() -> Self {
        Self
    }

    /// Exploitation value used for path selection: mean reward when visits
    /// were recorded, raw score otherwise.
    fn node_value(node: &ThoughtNode) -> f64 {
        node.simulation
            .and_then(|s| s.mean_reward())
            .unwrap_or(node.score)
    }

    /// Ordering for best-path selection. Tie-break: most visits, then
    /// highest score, then first-encountered in scan order.
    fn compare(a: &ThoughtNode, b: &ThoughtNode) -> Ordering {
        let value = Self::node_value(a)
            .partial_cmp(&Self::node_value(b))
            .unwrap_or(Ordering::Equal);
        if value != Ordering::Equal {
            return value;
        }
        let visits_a = a.simulation.map(|s| s.visits).unwrap_or(0);
        let visits_b = b.simulation.map(|s| s.visits).unwrap_or(0);
        match visits_a.cmp(&visits_b) {
            Ordering::Equal => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
            other => other,
        }
    }
}

impl Default for MctsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MctsStrategy {
    fn kind(&self) -> StrategyType {
        StrategyType::Mcts
    }

    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse> {
        let node = create_node(store, request)?;
        let reward = node.score;

        // Backpropagate the leaf reward along the stored root path. The new
        // node itself gets its seed stats through the same merge.
        let ancestor_ids: Vec<String> = store
            .path(&node.id)
            .map(|path| path.into_iter().map(|n| n.id).collect())
            .unwrap_or_else(|_| vec![node.id.clone()]);
        for id in &ancestor_ids {
            if let Some(visited) = store.get_mut(id) {
                let stats = visited.simulation.get_or_insert_with(SimulationStats::default);
                stats.visits += 1;
                stats.total_reward += reward;
            }
        }

        let best_value = store
            .iter()
            .map(Self::node_value)
            .fold(f64::NEG_INFINITY, f64::max);

        let node = store.get(&node.id).cloned().unwrap_or(node);
        let mut response = ReasoningResponse::from_node(&node, request.next_thought_needed);
        response.simulation = node.simulation;
        response.best_score = Some(best_value);
        Ok(response)
    }

    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode> {
        let best = store
            .iter()
            .filter(|n| n.is_complete)
            .fold(None::<&ThoughtNode>, |best, candidate| match best {
                Some(current) if Self::compare(candidate, current) == Ordering::Greater => {
                    Some(candidate)
                }
                Some(current) => Some(current),
                None => Some(candidate),
            });

        match best {
            Some(node) => store.path(&node.id).unwrap_or_default(),
            None => vec![],
        }
    }

    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::base("Monte Carlo Tree Search", store);
        let total_visits: u64 = store
            .iter()
            .filter_map(|n| n.simulation.map(|s| s.visits))
            .sum();
        let simulated_nodes = store.iter().filter(|n| n.simulation.is_some()).count();
        metrics
            .extra
            .insert("total_visits".to_string(), json!(total_visits));
        metrics
            .extra
            .insert("simulated_nodes".to_string(), json!(simulated_nodes));
        metrics
    }

    fn clear(&mut self) {
        // Visit/reward accounting lives on the nodes and clears with them.
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_request;
    use super::*;

    #[test]
    fn test_new_node_seeds_simulation_stats() {
        let mut strategy = MctsStrategy::new();
        let mut store = ThoughtStore::new(100);

        let response = strategy
            .process_thought(&mut store, &test_request("leaf", 1, true))
            .unwrap();
        let stats = response.simulation.unwrap();
        assert_eq!(stats.visits, 1);
        assert!((stats.total_reward - response.score).abs() < 1e-9);
    }

    #[test]
    fn test_reward_backpropagates_to_ancestors() {
        let mut strategy = MctsStrategy::new();
        let mut store = ThoughtStore::new(100);

        let root = strategy
            .process_thought(&mut store, &test_request("root", 1, true))
            .unwrap();

        let mut child = test_request("child", 2, true);
        child.parent_id = Some(root.node_id.clone());
        let child = strategy.process_thought(&mut store, &child).unwrap();

        let mut grandchild = test_request("grandchild", 3, true);
        grandchild.parent_id = Some(child.node_id.clone());
        strategy.process_thought(&mut store, &grandchild).unwrap();

        // Root saw all three rollouts, the middle node two, the leaf one.
        let root_stats = store.get(&root.node_id).unwrap().simulation.unwrap();
        assert_eq!(root_stats.visits, 3);
        let child_stats = store.get(&child.node_id).unwrap().simulation.unwrap();
        assert_eq!(child_stats.visits, 2);
    }

    #[test]
    fn test_best_path_prefers_mean_reward() {
        let mut strategy = MctsStrategy::new();
        let mut store = ThoughtStore::new(100);

        let mut low = test_request("low reward finish", 1, false);
        low.evaluations = Some([("value".to_string(), 3.0)].into());
        strategy.process_thought(&mut store, &low).unwrap();

        let mut high = test_request("high reward finish", 1, false);
        high.evaluations = Some([("value".to_string(), 9.0)].into());
        let high = strategy.process_thought(&mut store, &high).unwrap();

        let path = strategy.best_path(&store);
        assert_eq!(path.last().unwrap().id, high.node_id);
    }

    #[test]
    fn test_best_path_tie_break_prefers_more_visits() {
        let mut strategy = MctsStrategy::new();
        let mut store = ThoughtStore::new(100);

        // Complete root with one rollout.
        let lone = strategy
            .process_thought(&mut store, &test_request("lone finish", 1, false))
            .unwrap();

        // Complete root that later gains a descendant rollout with the same
        // reward, leaving equal mean but more visits.
        let busy = strategy
            .process_thought(&mut store, &test_request("busy finish", 1, false))
            .unwrap();
        let mut follow_up = test_request("follow up", 2, true);
        follow_up.parent_id = Some(busy.node_id.clone());
        strategy.process_thought(&mut store, &follow_up).unwrap();

        let path = strategy.best_path(&store);
        let tail = path.iter().find(|n| n.is_complete).unwrap();
        assert_eq!(tail.id, busy.node_id);
        assert_ne!(tail.id, lone.node_id);
    }

    #[test]
    fn test_metrics_count_visits() {
        let mut strategy = MctsStrategy::new();
        let mut store = ThoughtStore::new(100);

        let root = strategy
            .process_thought(&mut store, &test_request("root", 1, true))
            .unwrap();
        let mut child = test_request("child", 2, true);
        child.parent_id = Some(root.node_id);
        strategy.process_thought(&mut store, &child).unwrap();

        let metrics = strategy.metrics(&store);
        assert_eq!(metrics.name, "Monte Carlo Tree Search");
        // Root: 2 visits, child: 1 visit.
        assert_eq!(metrics.extra["total_visits"], json!(3));
        assert_eq!(metrics.extra["simulated_nodes"], json!(2));
    }
}
