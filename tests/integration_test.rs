//! Integration tests for the full MCP → Reasoner → Strategy → Store flow
//!
//! These tests verify the end-to-end behavior of the reasoning system,
//! ensuring all components work together correctly. The hybrid routing and
//! heuristic checks assert configured policy, not search-theoretic proofs.

use pretty_assertions::assert_eq;
use serde_json::json;

use mcp_strategic_reasoning::config::{
    Config, LogFormat, LoggingConfig, SearchConfig, StoreConfig, SwitchThresholds,
};
use mcp_strategic_reasoning::reasoner::Reasoner;
use mcp_strategic_reasoning::strategies::{ReasoningRequest, StrategyType};

/// Create test configuration with the given store capacity
fn create_test_config(capacity: usize) -> Config {
    Config {
        search: SearchConfig::default(),
        store: StoreConfig { capacity },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
    }
}

fn request(thought: &str, number: usize, needed: bool) -> ReasoningRequest {
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

#[test]
fn test_requests_without_parent_become_roots() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    for number in [1, 3, 7] {
        let response = reasoner.process_thought(request("a root", number, true));
        assert!(response.error.is_none());
        assert_eq!(response.depth, number - 1);
        let node = reasoner.store().get(&response.node_id).unwrap();
        assert!(node.parent_id.is_none());
    }
}

#[test]
fn test_parent_link_and_path_reconstruction() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    let root = reasoner.process_thought(request("root", 1, true));
    let siblings_before = reasoner
        .store()
        .get(&root.node_id)
        .unwrap()
        .children
        .len();

    let mut child = request("child", 2, true);
    child.parent_id = Some(root.node_id.clone());
    let child = reasoner.process_thought(child);

    // The parent gained exactly one new entry: the child's id.
    let parent = reasoner.store().get(&root.node_id).unwrap();
    assert_eq!(parent.children.len(), siblings_before + 1);
    assert_eq!(parent.children.last().unwrap(), &child.node_id);

    // The path ends with exactly parent, then child.
    let path = reasoner.store().path(&child.node_id).unwrap();
    let tail: Vec<&str> = path.iter().rev().take(2).map(|n| n.id.as_str()).collect();
    assert_eq!(tail, vec![child.node_id.as_str(), root.node_id.as_str()]);
}

#[test]
fn test_get_stats_is_idempotent() {
    let mut reasoner = Reasoner::new(create_test_config(100));
    reasoner.process_thought(request("one", 1, true));
    reasoner.process_thought(request("two", 1, false));

    let first = serde_json::to_value(reasoner.get_stats()).unwrap();
    let second = serde_json::to_value(reasoner.get_stats()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_astar_sets_cover_every_created_node() {
    let mut reasoner = Reasoner::new(create_test_config(100));
    reasoner.set_strategy("a_star").unwrap();

    let mut created = 0;
    let mut parent_id: Option<String> = None;
    for number in 1..=5 {
        let mut step = request("explore", number, true);
        step.parent_id = parent_id.clone();
        let response = reasoner.process_thought(step);
        assert!(response.error.is_none());
        created += 1;

        // Disjoint cover: the two sets always account for every node this
        // strategy has created, each in exactly one set.
        let open = response.open_set_size.unwrap();
        let closed = response.closed_set_size.unwrap();
        assert_eq!(open + closed, created);
        parent_id = Some(response.node_id);
    }
}

#[test]
fn test_csp_unassigned_is_domains_minus_assignments() {
    let mut reasoner = Reasoner::new(create_test_config(100));
    reasoner.set_strategy("csp").unwrap();

    let mut step = request("set up the variable space", 1, true);
    step.constraints = Some(
        json!({
            "domains": { "a": [1, 2], "b": [1], "c": [3, 4, 5] },
            "assignments": { "b": 1 }
        })
        .as_object()
        .unwrap()
        .clone(),
    );
    let response = reasoner.process_thought(step);
    assert_eq!(response.unassigned_variables, Some(2));

    let mut next = request("assign another variable", 2, true);
    next.constraints = Some(
        json!({ "assignments": { "a": 2 } })
            .as_object()
            .unwrap()
            .clone(),
    );
    let response = reasoner.process_thought(next);
    assert_eq!(response.unassigned_variables, Some(1));
}

#[test]
fn test_hybrid_routes_constraint_dense_requests_to_csp() {
    let mut config = create_test_config(100);
    config.search.thresholds = SwitchThresholds {
        constraint_density: 5.0,
        goal_clarity: 0.7,
        uncertainty: 0.3,
    };
    let mut reasoner = Reasoner::new(config);
    reasoner.set_strategy("hybrid").unwrap();

    // Six obligation keywords: density 6 >= threshold 5, so the density
    // rule fires before clarity or uncertainty are even consulted.
    let step = request(
        "the design must be fair, must be legible, should scale, and the \
         required resources place a necessary constraint on trading",
        1,
        true,
    );
    let response = reasoner.process_thought(step);

    assert_eq!(response.strategy_used.as_deref(), Some("hybrid"));
    assert_eq!(response.active_strategy.as_deref(), Some("csp"));
    assert!(response.constraint_density.unwrap() >= 5.0);
}

#[test]
fn test_clear_empties_state_but_keeps_strategies() {
    let mut reasoner = Reasoner::new(create_test_config(100));
    reasoner.set_strategy("a_star").unwrap();
    reasoner.process_thought(request("a", 1, true));
    reasoner.process_thought(request("b", 2, true));

    let strategies_before = reasoner.get_available_strategies();
    reasoner.clear();

    let stats = reasoner.get_stats();
    assert_eq!(stats.total_nodes, 0);
    assert_eq!(stats.max_depth, 0);
    assert_eq!(reasoner.get_available_strategies(), strategies_before);

    // Auxiliary indices were dropped with the store.
    let astar = &stats.strategy_metrics["a_star"];
    assert_eq!(astar.extra["open_set_size"], json!(0));
    assert_eq!(astar.extra["closed_set_size"], json!(0));
}

#[test]
fn test_capacity_eviction_drops_oldest_node() {
    let capacity = 5;
    let mut reasoner = Reasoner::new(create_test_config(capacity));

    let mut ids = Vec::new();
    for number in 1..=capacity + 1 {
        let response = reasoner.process_thought(request("filler", number, true));
        ids.push(response.node_id);
    }

    assert_eq!(reasoner.store().len(), capacity);
    // The oldest inserted node is no longer retrievable by id.
    assert!(reasoner.store().get(&ids[0]).is_none());
    for id in &ids[1..] {
        assert!(reasoner.store().get(id).is_some());
    }
}

#[test]
fn test_csp_vacuous_satisfaction_on_plain_thought() {
    let mut reasoner = Reasoner::new(create_test_config(100));
    reasoner.set_strategy("csp").unwrap();

    let response = reasoner.process_thought(ReasoningRequest {
        thought: "x".to_string(),
        thought_number: 1,
        total_thoughts: 1,
        next_thought_needed: false,
        parent_id: None,
        strategy_type: None,
        branching_factor: None,
        evaluations: None,
        evaluation_metrics: None,
        constraints: None,
        problem_type: None,
    });

    assert_eq!(response.strategy_used.as_deref(), Some("csp"));
    assert_eq!(response.constraints_satisfied, Some(true));
    assert!(response.is_complete);
}

#[test]
fn test_category_request_gets_recommendations_and_alignment() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    let mut step = request("how should the mid-game economy sink gold?", 1, true);
    step.problem_type = Some("economy".to_string());
    step.evaluations = Some([("faucets_sinks".to_string(), 7.0)].into());
    let response = reasoner.process_thought(step);

    assert!(response.error.is_none());
    let recommendations = response.recommendations.unwrap();
    assert!(!recommendations.is_empty());
    let alignment = response.category_alignment.unwrap();
    assert!(alignment["metric_coverage"] > 0.0);
}

#[test]
fn test_strategy_switch_survives_across_requests() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    let mut step = request("switch", 1, true);
    step.strategy_type = Some("mcts".to_string());
    reasoner.process_thought(step);

    let response = reasoner.process_thought(request("still mcts", 2, true));
    assert_eq!(response.strategy_used.as_deref(), Some("mcts"));
    assert!(response.simulation.is_some());
    assert_eq!(reasoner.current_strategy(), StrategyType::Mcts);
}

#[test]
fn test_best_path_tracks_highest_scoring_completion() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    let root = reasoner.process_thought(request("root", 1, true));

    let mut weak = request("mediocre ending", 2, false);
    weak.parent_id = Some(root.node_id.clone());
    weak.evaluations = Some([("quality".to_string(), 3.0)].into());
    reasoner.process_thought(weak);

    let mut strong = request("strong ending", 2, false);
    strong.parent_id = Some(root.node_id.clone());
    strong.evaluations = Some([("quality".to_string(), 9.0)].into());
    let strong = reasoner.process_thought(strong);

    let path = reasoner.get_best_path(None).unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].id, root.node_id);
    assert_eq!(path[1].id, strong.node_id);
}

#[test]
fn test_failure_is_a_well_formed_response() {
    let mut reasoner = Reasoner::new(create_test_config(100));

    let mut orphan = request("child of nothing", 2, true);
    orphan.parent_id = Some("no-such-node".to_string());
    let response = reasoner.process_thought(orphan);

    assert_eq!(response.node_id, "");
    assert!(!response.is_complete);
    assert!(response
        .error
        .as_deref()
        .unwrap()
        .contains("no-such-node"));
    // The session is still usable after the failure.
    let response = reasoner.process_thought(request("recovered", 1, true));
    assert!(response.error.is_none());
}
