//! Hybrid arbiter that switches among the four base strategies.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    AStarStrategy, BeamSearchStrategy, CspStrategy, MctsStrategy, ReasoningRequest,
    ReasoningResponse, Strategy, StrategyMetrics, StrategyType,
};
use crate::config::{SearchConfig, SwitchThresholds};
use crate::error::AppResult;
use crate::store::{ThoughtNode, ThoughtStore};

/// Window of recent nodes sampled for the uncertainty signal.
pub const UNCERTAINTY_WINDOW: usize = 10;
/// Fixed scale dividing the score variance before clamping to [0, 1].
pub const UNCERTAINTY_VARIANCE_SCALE: f64 = 25.0;
/// Uncertainty reported when fewer than two nodes exist.
pub const UNCERTAINTY_DEFAULT: f64 = 0.5;
/// Clarity weight granted when evaluation metrics were supplied.
pub const GOAL_CLARITY_METRICS_WEIGHT: f64 = 0.4;
/// Clarity weight granted when a multi-step budget was supplied.
pub const GOAL_CLARITY_BUDGET_WEIGHT: f64 = 0.3;
/// Fixed clarity baseline.
pub const GOAL_CLARITY_BASELINE: f64 = 0.3;
/// Thought-text terms that imply obligations.
pub const OBLIGATION_KEYWORDS: [&str; 5] =
    ["must", "should", "required", "necessary", "constraint"];

/// The three routing signals recomputed for every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridSignals {
    /// Normalized variance of recent scores, clamped to [0, 1].
    pub uncertainty: f64,
    /// Weighted indicator of how well-specified the goal is.
    pub goal_clarity: f64,
    /// Explicit constraint keys plus obligation keywords in the thought.
    pub constraint_density: f64,
}

/// Hybrid strategy: owns one live instance of each base strategy and
/// delegates each request to whichever the switch policy selects.
///
/// The policy rules fire in fixed priority order (first match wins):
/// constraint density, then goal clarity, then uncertainty, then beam
/// search as the default. An explicit strategy in the request overrides
/// the computed choice, applied after the automatic switch.
pub struct HybridStrategy {
    beam: BeamSearchStrategy,
    mcts: MctsStrategy,
    astar: AStarStrategy,
    csp: CspStrategy,
    thresholds: SwitchThresholds,
    active: StrategyType,
    last_signals: Option<HybridSignals>,
}

impl HybridStrategy {
    /// Create a hybrid arbiter bound to the session search configuration.
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            beam: BeamSearchStrategy::new(config.beam_width).with_min_score(config.min_score),
            mcts: MctsStrategy::new(),
            astar: AStarStrategy::new(),
            csp: CspStrategy::new(),
            thresholds: config.thresholds,
            active: StrategyType::BeamSearch,
            last_signals: None,
        }
    }

    /// The strategy the arbiter is currently delegating to.
    pub fn active_strategy(&self) -> StrategyType {
        self.active
    }

    /// Strategies the arbiter can delegate to.
    pub fn available_strategies() -> Vec<String> {
        [
            StrategyType::BeamSearch,
            StrategyType::Mcts,
            StrategyType::AStar,
            StrategyType::Csp,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Recompute the three routing signals from the shared store and the
    /// incoming request.
    pub fn compute_signals(store: &ThoughtStore, request: &ReasoningRequest) -> HybridSignals {
        HybridSignals {
            uncertainty: Self::uncertainty(store),
            goal_clarity: Self::goal_clarity(request),
            constraint_density: Self::constraint_density(request),
        }
    }

    /// Resolve the switch policy for a set of signals. Rules are checked
    /// in priority order; the first matching threshold wins.
    pub fn decide(signals: &HybridSignals, thresholds: &SwitchThresholds) -> StrategyType {
        if signals.constraint_density >= thresholds.constraint_density {
            StrategyType::Csp
        } else if signals.goal_clarity >= thresholds.goal_clarity {
            StrategyType::AStar
        } else if signals.uncertainty >= thresholds.uncertainty {
            StrategyType::Mcts
        } else {
            StrategyType::BeamSearch
        }
    }

    fn uncertainty(store: &ThoughtStore) -> f64 {
        let recent = store.recent(UNCERTAINTY_WINDOW);
        if recent.len() < 2 {
            return UNCERTAINTY_DEFAULT;
        }
        let mean = recent.iter().map(|n| n.score).sum::<f64>() / recent.len() as f64;
        let variance = recent
            .iter()
            .map(|n| (n.score - mean).powi(2))
            .sum::<f64>()
            / recent.len() as f64;
        (variance / UNCERTAINTY_VARIANCE_SCALE).clamp(0.0, 1.0)
    }

    fn goal_clarity(request: &ReasoningRequest) -> f64 {
        let mut clarity = GOAL_CLARITY_BASELINE;
        let has_metrics = request
            .evaluation_metrics
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
            || request
                .evaluations
                .as_ref()
                .map(|e| !e.is_empty())
                .unwrap_or(false);
        if has_metrics {
            clarity += GOAL_CLARITY_METRICS_WEIGHT;
        }
        // A budget of one step says nothing about the goal shape.
        if request.total_thoughts > 1 {
            clarity += GOAL_CLARITY_BUDGET_WEIGHT;
        }
        clarity
    }

    fn constraint_density(request: &ReasoningRequest) -> f64 {
        let explicit = request
            .constraints
            .as_ref()
            .map(|c| c.len())
            .unwrap_or(0);
        let lowered = request.thought.to_lowercase();
        let implied: usize = OBLIGATION_KEYWORDS
            .iter()
            .map(|kw| lowered.matches(kw).count())
            .sum();
        (explicit + implied) as f64
    }

    fn delegate(&mut self, kind: StrategyType) -> &mut dyn Strategy {
        match kind {
            StrategyType::BeamSearch => &mut self.beam,
            StrategyType::Mcts => &mut self.mcts,
            StrategyType::AStar => &mut self.astar,
            StrategyType::Csp => &mut self.csp,
            // The arbiter never delegates to itself.
            StrategyType::Hybrid => &mut self.beam,
        }
    }

    fn delegate_ref(&self, kind: StrategyType) -> &dyn Strategy {
        match kind {
            StrategyType::BeamSearch => &self.beam,
            StrategyType::Mcts => &self.mcts,
            StrategyType::AStar => &self.astar,
            StrategyType::Csp => &self.csp,
            StrategyType::Hybrid => &self.beam,
        }
    }
}

impl Strategy for HybridStrategy {
    fn kind(&self) -> StrategyType {
        StrategyType::Hybrid
    }

    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse> {
        let signals = Self::compute_signals(store, request);
        let mut selected = Self::decide(&signals, &self.thresholds);

        // A caller's explicit choice wins over the computed switch.
        if let Some(requested) = request
            .strategy_type
            .as_deref()
            .and_then(|s| StrategyType::from_str(s).ok())
        {
            if requested != StrategyType::Hybrid {
                selected = requested;
            }
        }

        if selected != self.active {
            tracing::info!(
                from = %self.active,
                to = %selected,
                uncertainty = signals.uncertainty,
                goal_clarity = signals.goal_clarity,
                constraint_density = signals.constraint_density,
                "Hybrid arbiter switching strategy"
            );
        }
        self.active = selected;
        self.last_signals = Some(signals);

        let mut response = self.delegate(selected).process_thought(store, request)?;
        response.active_strategy = Some(selected.to_string());
        response.available_strategies = Some(Self::available_strategies());
        response.uncertainty = Some(signals.uncertainty);
        response.goal_clarity = Some(signals.goal_clarity);
        response.constraint_density = Some(signals.constraint_density);
        Ok(response)
    }

    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode> {
        self.delegate_ref(self.active).best_path(store)
    }

    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::base("Hybrid", store);
        metrics
            .extra
            .insert("active_strategy".to_string(), json!(self.active.to_string()));
        if let Some(signals) = self.last_signals {
            metrics
                .extra
                .insert("signals".to_string(), json!(signals));
        }
        metrics
    }

    fn clear(&mut self) {
        self.beam.clear();
        self.mcts.clear();
        self.astar.clear();
        self.csp.clear();
        self.active = StrategyType::BeamSearch;
        self.last_signals = None;
    }
}
