//! Reasoner dispatcher: owns the store, the strategy set, and the session's
//! current strategy, and routes every request to the right strategy.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::domain::{apply_category_defaults, enrich_response, resolve_category};
use crate::error::{AppResult, StrategyError, StrategyResult};
use crate::strategies::{
    create_strategy, ReasoningRequest, ReasoningResponse, Strategy, StrategyMetrics, StrategyType,
};
use crate::store::{ThoughtNode, ThoughtStore};

/// Cross-strategy aggregates for the whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStats {
    /// Nodes currently in the store.
    pub total_nodes: usize,
    /// Mean score across stored nodes.
    pub average_score: f64,
    /// Deepest stored node.
    pub max_depth: usize,
    /// Mean child count among nodes that have children.
    pub branching_factor: f64,
    /// Per-strategy metric snapshots, keyed by strategy name. The session's
    /// active strategy carries the `active` flag.
    pub strategy_metrics: HashMap<String, StrategyMetrics>,
}

/// Session dispatcher over the five registered strategies.
///
/// All mutation happens inside the synchronous extent of one call, so a
/// single owner (or one external mutex) is enough to serialize a session.
pub struct Reasoner {
    store: ThoughtStore,
    strategies: HashMap<StrategyType, Box<dyn Strategy>>,
    current: StrategyType,
    config: Config,
}

impl Reasoner {
    /// Build a session with every strategy registered and the configured
    /// default active.
    pub fn new(config: Config) -> Self {
        let mut strategies: HashMap<StrategyType, Box<dyn Strategy>> = HashMap::new();
        for kind in StrategyType::ALL {
            strategies.insert(kind, create_strategy(kind, &config.search));
        }
        Self {
            store: ThoughtStore::new(config.store.capacity),
            strategies,
            current: config.search.default_strategy,
            config,
        }
    }

    /// Read access to the shared store.
    pub fn store(&self) -> &ThoughtStore {
        &self.store
    }

    /// The session's current default strategy.
    pub fn current_strategy(&self) -> StrategyType {
        self.current
    }

    /// Process one reasoning step.
    ///
    /// This is the outermost recovery boundary: any internal failure is
    /// converted into a well-formed error response (empty node id, not
    /// complete, message attached) instead of propagating to the caller.
    /// Note the at-least-once effect: a caller that abandons the response
    /// may still have created a node.
    pub fn process_thought(&mut self, request: ReasoningRequest) -> ReasoningResponse {
        match self.process_inner(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Thought processing failed");
                let mut response = ReasoningResponse::failure(e.to_string());
                response.strategy_used = Some(self.current.to_string());
                response
            }
        }
    }

    fn process_inner(&mut self, mut request: ReasoningRequest) -> AppResult<ReasoningResponse> {
        if request.thought_number > self.config.search.max_depth {
            return Err(StrategyError::InvalidRequest {
                message: format!(
                    "thought_number {} exceeds the configured max depth {}",
                    request.thought_number, self.config.search.max_depth
                ),
            }
            .into());
        }

        let routed = if let Some(category) = request.problem_type.clone() {
            // Category requests run through the category's bundle without
            // touching the session default.
            let profile = resolve_category(&category);
            apply_category_defaults(&mut request, &profile);
            request
                .strategy_type
                .as_deref()
                .and_then(|s| StrategyType::from_str(s).ok())
                .unwrap_or(self.current)
        } else {
            if let Some(raw) = request.strategy_type.as_deref() {
                match StrategyType::from_str(raw) {
                    Ok(kind) => self.current = kind,
                    // Unknown explicit strategy is ignored, current retained.
                    Err(_) => {
                        tracing::warn!(strategy = %raw, "Unknown strategy requested, keeping current")
                    }
                }
            }
            self.current
        };

        let strategy = self
            .strategies
            .get_mut(&routed)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                name: routed.to_string(),
            })?;
        let mut response = strategy.process_thought(&mut self.store, &request)?;
        response.strategy_used = Some(routed.to_string());
        enrich_response(&mut response, &request, self.config.search.temperature);

        tracing::debug!(
            node_id = %response.node_id,
            strategy = %routed,
            score = response.score,
            depth = response.depth,
            "Processed thought"
        );
        Ok(response)
    }

    /// Switch the session default strategy.
    pub fn set_strategy(&mut self, name: &str) -> StrategyResult<()> {
        let kind = StrategyType::from_str(name)?;
        if !self.strategies.contains_key(&kind) {
            return Err(StrategyError::UnknownStrategy {
                name: name.to_string(),
            });
        }
        tracing::info!(from = %self.current, to = %kind, "Session strategy switched");
        self.current = kind;
        Ok(())
    }

    /// Names of every registered strategy, in dispatch-table order.
    pub fn get_available_strategies(&self) -> Vec<String> {
        StrategyType::ALL.iter().map(|s| s.to_string()).collect()
    }

    /// Best path according to `strategy`, or the current strategy when
    /// unset. Unknown names fail with `UnknownStrategy`.
    pub fn get_best_path(&self, strategy: Option<&str>) -> StrategyResult<Vec<ThoughtNode>> {
        let kind = match strategy {
            Some(name) => StrategyType::from_str(name)?,
            None => self.current,
        };
        let strategy = self
            .strategies
            .get(&kind)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                name: kind.to_string(),
            })?;
        Ok(strategy.best_path(&self.store))
    }

    /// Aggregate store-wide figures plus per-strategy metric snapshots.
    /// Read-only: two calls without intervening mutation agree.
    pub fn get_stats(&self) -> ReasoningStats {
        let total_nodes = self.store.len();
        let average_score = if total_nodes == 0 {
            0.0
        } else {
            self.store.iter().map(|n| n.score).sum::<f64>() / total_nodes as f64
        };
        let max_depth = self.store.iter().map(|n| n.depth).max().unwrap_or(0);

        let mut parent_counts: HashMap<&str, usize> = HashMap::new();
        for node in self.store.iter() {
            if let Some(parent_id) = &node.parent_id {
                *parent_counts.entry(parent_id.as_str()).or_insert(0) += 1;
            }
        }
        let branching_factor = if parent_counts.is_empty() {
            0.0
        } else {
            parent_counts.values().sum::<usize>() as f64 / parent_counts.len() as f64
        };

        let mut strategy_metrics = HashMap::new();
        for (kind, strategy) in &self.strategies {
            let mut metrics = strategy.metrics(&self.store);
            if *kind == self.current {
                metrics.active = Some(true);
            }
            strategy_metrics.insert(kind.to_string(), metrics);
        }

        ReasoningStats {
            total_nodes,
            average_score,
            max_depth,
            branching_factor,
            strategy_metrics,
        }
    }

    /// Reset the session: empty the store, drop every strategy's auxiliary
    /// index, and return the default strategy to the configured one. The
    /// strategy set itself survives.
    pub fn clear(&mut self) {
        self.store.clear();
        for strategy in self.strategies.values_mut() {
            strategy.clear();
        }
        self.current = self.config.search.default_strategy;
        tracing::info!("Session state cleared");
    }
}
