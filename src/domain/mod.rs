//! Game-design problem categories and response enrichment.
//!
//! This module is the external-collaborator boundary: it shapes requests for
//! one application area (game design) and decorates responses for downstream
//! tools. It consumes the core only through the request/response contract
//! and adds no search logic of its own.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::strategies::{ReasoningRequest, ReasoningResponse, StrategyType, SCORE_MAX};

/// Default bundle applied when a request carries a problem category tag and
/// leaves the corresponding fields unset.
#[derive(Debug, Clone, Copy)]
pub struct CategoryProfile {
    /// Canonical category name.
    pub name: &'static str,
    /// Strategy suited to the category's problem shape.
    pub strategy: StrategyType,
    /// Default number of alternatives to explore per step.
    pub branching_factor: usize,
    /// Suggested exploration depth for the category.
    pub exploration_depth: usize,
    /// Evaluation metrics the category is normally scored against.
    pub metrics: &'static [&'static str],
    /// Worked example steps from past sessions in this category.
    pub worked_examples: &'static [&'static str],
    /// Suggested follow-up moves, cycled by depth.
    pub next_steps: &'static [&'static str],
}

/// Mechanics questions are constraint-shaped: rules must compose without
/// contradiction. This is also the fallback bundle for unknown categories.
pub const MECHANICS: CategoryProfile = CategoryProfile {
    name: "mechanics",
    strategy: StrategyType::Csp,
    branching_factor: 3,
    exploration_depth: 4,
    metrics: &["consistency", "feasibility", "depth_of_play"],
    worked_examples: &[
        "Define the core verb set before layering secondary systems",
        "Check each new rule against the existing action economy",
    ],
    next_steps: &[
        "Enumerate the rules the new mechanic interacts with",
        "List the resources the mechanic consumes and produces",
        "Probe for degenerate loops between mechanics",
        "Write the failure case that removes the mechanic from play",
    ],
};

/// Balance work is cost-estimation over a numeric space.
pub const BALANCE: CategoryProfile = CategoryProfile {
    name: "balance",
    strategy: StrategyType::AStar,
    branching_factor: 2,
    exploration_depth: 5,
    metrics: &["fairness", "counterplay", "variance"],
    worked_examples: &[
        "Compare win rates across matchups before tuning outliers",
        "Tune one axis at a time and re-measure",
    ],
    next_steps: &[
        "Identify the dominant option and quantify its lead",
        "Propose the smallest numeric change that closes the gap",
        "Estimate knock-on effects on adjacent options",
        "Define the metric that will confirm the fix",
    ],
};

/// Narrative exploration rewards keeping several drafts alive.
pub const NARRATIVE: CategoryProfile = CategoryProfile {
    name: "narrative",
    strategy: StrategyType::BeamSearch,
    branching_factor: 4,
    exploration_depth: 6,
    metrics: &["coherence", "stakes", "pacing"],
    worked_examples: &[
        "Draft three inciting incidents and keep the two strongest",
        "Trace each character's want through the midpoint",
    ],
    next_steps: &[
        "Sketch the scene that raises the stakes",
        "Check the protagonist's motivation still holds",
        "Branch an alternative outcome for the current beat",
        "Cut the thread that no longer pays off",
    ],
};

/// Progression tuning benefits from sampled playthroughs.
pub const PROGRESSION: CategoryProfile = CategoryProfile {
    name: "progression",
    strategy: StrategyType::Mcts,
    branching_factor: 3,
    exploration_depth: 5,
    metrics: &["pacing", "reward_cadence", "difficulty_curve"],
    worked_examples: &[
        "Simulate a cautious and a rushing player through the first hour",
        "Place the first difficulty spike after the second unlock",
    ],
    next_steps: &[
        "Chart expected player power against content difficulty",
        "Find the stretch with the longest gap between rewards",
        "Test the curve against a player who skips side content",
        "Mark where mastery is assumed but never taught",
    ],
};

/// Economy questions mix constraints with uncertain player behavior, so the
/// arbiter picks per step.
pub const ECONOMY: CategoryProfile = CategoryProfile {
    name: "economy",
    strategy: StrategyType::Hybrid,
    branching_factor: 3,
    exploration_depth: 5,
    metrics: &["faucets_sinks", "inflation_risk", "exchange_clarity"],
    worked_examples: &[
        "Balance currency faucets against sinks before adding trade",
        "Cap the storable surplus to bound late-game inflation",
    ],
    next_steps: &[
        "List every faucet and sink for the currency",
        "Estimate surplus at the median play session count",
        "Stress the exchange against a hoarding strategy",
        "Decide which sink scales with player wealth",
    ],
};

/// All registered category profiles.
pub const PROFILES: [CategoryProfile; 5] =
    [MECHANICS, BALANCE, NARRATIVE, PROGRESSION, ECONOMY];

/// Resolve a category tag to its profile. Unknown categories fall back to
/// the mechanics bundle rather than failing the request.
pub fn resolve_category(name: &str) -> CategoryProfile {
    let lowered = name.to_lowercase();
    PROFILES
        .iter()
        .find(|p| p.name == lowered)
        .copied()
        .unwrap_or_else(|| {
            tracing::debug!(category = %name, "Unknown category, using mechanics defaults");
            MECHANICS
        })
}

/// Fill the category defaults into fields the caller left unset. Explicit
/// caller values always win.
pub fn apply_category_defaults(request: &mut ReasoningRequest, profile: &CategoryProfile) {
    if request.strategy_type.is_none() {
        request.strategy_type = Some(profile.strategy.to_string());
    }
    if request.branching_factor.is_none() {
        request.branching_factor = Some(profile.branching_factor);
    }
    if request.evaluation_metrics.is_none() {
        request.evaluation_metrics =
            Some(profile.metrics.iter().map(|m| m.to_string()).collect());
    }
}

/// Recommended next steps for a node at `depth`, cycled through the
/// profile's suggestion list. `temperature` widens the slice: a hotter
/// session surfaces more alternatives per step.
pub fn recommended_steps(
    profile: &CategoryProfile,
    depth: usize,
    branching_factor: usize,
    temperature: f64,
) -> Vec<String> {
    if profile.next_steps.is_empty() {
        return vec![];
    }
    let count = ((branching_factor as f64 * temperature).ceil() as usize)
        .clamp(1, profile.next_steps.len());
    (0..count)
        .map(|offset| {
            let index = (depth + offset) % profile.next_steps.len();
            profile.next_steps[index].to_string()
        })
        .collect()
}

/// Category-alignment metrics: how much of the category's metric profile
/// the caller actually scored, and how far into the suggested exploration
/// depth the step sits.
pub fn category_alignment(
    profile: &CategoryProfile,
    response: &ReasoningResponse,
    request: &ReasoningRequest,
) -> HashMap<String, f64> {
    let supplied = request.evaluations.as_ref();
    let covered = profile
        .metrics
        .iter()
        .filter(|m| supplied.map(|e| e.contains_key(**m)).unwrap_or(false))
        .count();
    let metric_coverage = if profile.metrics.is_empty() {
        1.0
    } else {
        covered as f64 / profile.metrics.len() as f64
    };
    let depth_utilization =
        ((response.depth + 1) as f64 / profile.exploration_depth as f64).min(1.0);

    HashMap::from([
        ("metric_coverage".to_string(), metric_coverage),
        ("depth_utilization".to_string(), depth_utilization),
        ("score_ratio".to_string(), response.score / SCORE_MAX),
    ])
}

/// Attach recommendations and alignment metrics to a category response.
pub fn enrich_response(
    response: &mut ReasoningResponse,
    request: &ReasoningRequest,
    temperature: f64,
) {
    let Some(category) = &request.problem_type else {
        return;
    };
    let profile = resolve_category(category);
    let branching = request
        .branching_factor
        .unwrap_or(profile.branching_factor);
    let mut steps = recommended_steps(&profile, response.depth, branching, temperature);
    // Opening steps get a worked example from the category library to
    // anchor the session before the cycle of suggestions takes over.
    if response.depth == 0 {
        if let Some(example) = profile.worked_examples.first() {
            steps.insert(0, format!("Worked example ({}): {}", profile.name, example));
        }
    }
    response.recommendations = Some(steps);
    response.category_alignment = Some(category_alignment(&profile, response, request));
}

/// Reformat a response for downstream export (design docs, issue trackers).
/// Pure data shaping; nothing here feeds back into the core.
pub fn export_payload(response: &ReasoningResponse) -> Value {
    json!({
        "source": "mcp-strategic-reasoning",
        "version": env!("CARGO_PKG_VERSION"),
        "node_id": response.node_id,
        "summary": response.thought,
        "score": response.score,
        "depth": response.depth,
        "complete": response.is_complete,
        "strategy": response.strategy_used,
        "recommendations": response.recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_request;

    #[test]
    fn test_resolve_known_categories() {
        assert_eq!(resolve_category("balance").strategy, StrategyType::AStar);
        assert_eq!(resolve_category("NARRATIVE").name, "narrative");
        assert_eq!(resolve_category("economy").strategy, StrategyType::Hybrid);
    }

    #[test]
    fn test_unknown_category_falls_back_to_mechanics() {
        let profile = resolve_category("speedrunning");
        assert_eq!(profile.name, "mechanics");
        assert_eq!(profile.strategy, StrategyType::Csp);
    }

    #[test]
    fn test_defaults_fill_only_unset_fields() {
        let mut request = test_request("x", 1, true);
        request.strategy_type = Some("mcts".to_string());
        apply_category_defaults(&mut request, &MECHANICS);

        assert_eq!(request.strategy_type.as_deref(), Some("mcts"));
        assert_eq!(request.branching_factor, Some(3));
        assert_eq!(
            request.evaluation_metrics.as_ref().map(|m| m.len()),
            Some(3)
        );
    }

    #[test]
    fn test_recommended_steps_cycle_by_depth() {
        let at_zero = recommended_steps(&NARRATIVE, 0, 1, 1.0);
        let at_one = recommended_steps(&NARRATIVE, 1, 1, 1.0);
        assert_eq!(at_zero.len(), 1);
        assert_ne!(at_zero[0], at_one[0]);
        assert_eq!(at_one[0], NARRATIVE.next_steps[1]);
    }

    #[test]
    fn test_temperature_widens_recommendations() {
        let cool = recommended_steps(&NARRATIVE, 0, 2, 0.5);
        let hot = recommended_steps(&NARRATIVE, 0, 2, 1.5);
        assert!(hot.len() > cool.len());
        assert!(hot.len() <= NARRATIVE.next_steps.len());
    }

    #[test]
    fn test_alignment_tracks_metric_coverage() {
        let mut request = test_request("x", 1, true);
        request.problem_type = Some("balance".to_string());
        request.evaluations = Some(
            [("fairness".to_string(), 7.0), ("variance".to_string(), 5.0)].into(),
        );

        let mut response = ReasoningResponse::failure("unused");
        response.depth = 0;
        response.score = 6.0;
        let alignment = category_alignment(&BALANCE, &response, &request);

        assert!((alignment["metric_coverage"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((alignment["score_ratio"] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_enrich_anchors_first_step_with_worked_example() {
        let mut request = test_request("x", 1, true);
        request.problem_type = Some("mechanics".to_string());
        let mut response = ReasoningResponse::failure("unused");
        response.error = None;
        response.depth = 0;
        enrich_response(&mut response, &request, 0.7);

        let steps = response.recommendations.unwrap();
        assert!(steps[0].starts_with("Worked example (mechanics):"));
        assert!(steps.len() > 1);
    }

    #[test]
    fn test_enrich_skips_untagged_requests() {
        let request = test_request("x", 1, true);
        let mut response = ReasoningResponse::failure("unused");
        response.error = None;
        enrich_response(&mut response, &request, 0.7);
        assert!(response.recommendations.is_none());
        assert!(response.category_alignment.is_none());
    }

    #[test]
    fn test_export_payload_shape() {
        let mut response = ReasoningResponse::failure("unused");
        response.error = None;
        response.node_id = "n-1".to_string();
        response.strategy_used = Some("beam_search".to_string());
        let payload = export_payload(&response);
        assert_eq!(payload["node_id"], "n-1");
        assert_eq!(payload["strategy"], "beam_search");
        assert_eq!(payload["source"], "mcp-strategic-reasoning");
    }
}
