//! Finite-domain constraint satisfaction over thought payloads.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{create_node, ReasoningRequest, ReasoningResponse, Strategy, StrategyMetrics, StrategyType};
use crate::error::AppResult;
use crate::store::{NodeConstraints, ThoughtNode, ThoughtStore};

/// Predicate over `(candidate value, full assignment snapshot)`.
pub type ConstraintFn = Box<dyn Fn(&Value, &HashMap<String, Value>) -> bool + Send>;

/// Constraint satisfaction strategy.
///
/// Each node's `constraints` payload contributes `domains` and `assignments`
/// entries to the strategy's session-wide maps; later nodes overwrite
/// earlier entries for the same variable (last-write-wins, no versioning).
/// Predicates are registered programmatically and checked conjunctively.
pub struct CspStrategy {
    domains: HashMap<String, Vec<Value>>,
    assignments: HashMap<String, Value>,
    predicates: HashMap<String, Vec<ConstraintFn>>,
}

impl CspStrategy {
    /// Create a CSP strategy with empty domains and assignments.
    pub fn new() -> Self {
        Self {
            domains: HashMap::new(),
            assignments: HashMap::new(),
            predicates: HashMap::new(),
        }
    }

    /// Register a predicate for `variable`. Checks run against the full
    /// assignment snapshot, so cross-variable constraints are expressible.
    pub fn register_constraint(
        &mut self,
        variable: impl Into<String>,
        predicate: ConstraintFn,
    ) {
        self.predicates.entry(variable.into()).or_default().push(predicate);
    }

    /// Check every registered predicate against the current assignments.
    ///
    /// A variable without an assignment is skipped; an assigned variable
    /// must satisfy every one of its predicates. The check short-circuits
    /// on the first rejection. With nothing applicable it is vacuously true.
    pub fn check_constraints(&self) -> bool {
        for (variable, predicates) in &self.predicates {
            if let Some(value) = self.assignments.get(variable) {
                if !predicates.iter().all(|p| p(value, &self.assignments)) {
                    return false;
                }
            }
        }
        true
    }

    /// Domain variables without a current assignment.
    pub fn unassigned_variables(&self) -> Vec<String> {
        let mut unassigned: Vec<String> = self
            .domains
            .keys()
            .filter(|v| !self.assignments.contains_key(*v))
            .cloned()
            .collect();
        unassigned.sort();
        unassigned
    }

    /// Minimum-remaining-domain variable selection for future expansion.
    /// Ties break lexicographically so selection is deterministic.
    pub fn next_variable(&self) -> Option<String> {
        self.unassigned_variables()
            .into_iter()
            .min_by_key(|v| {
                (
                    self.domains.get(v).map(|d| d.len()).unwrap_or(usize::MAX),
                    v.clone(),
                )
            })
    }

    /// Fold a node's constraint payload into the session maps, returning
    /// the per-node record that gets stored on the node.
    fn merge_payload(
        &mut self,
        payload: Option<&serde_json::Map<String, Value>>,
    ) -> NodeConstraints {
        let mut record = NodeConstraints::default();
        let Some(payload) = payload else {
            return record;
        };

        if let Some(Value::Object(domains)) = payload.get("domains") {
            for (variable, values) in domains {
                let values: Vec<Value> = match values {
                    Value::Array(items) => items.clone(),
                    single => vec![single.clone()],
                };
                record.domains.insert(variable.clone(), values.clone());
                self.domains.insert(variable.clone(), values);
            }
        }

        if let Some(Value::Object(assignments)) = payload.get("assignments") {
            for (variable, value) in assignments {
                record.assignments.insert(variable.clone(), value.clone());
                self.assignments.insert(variable.clone(), value.clone());
            }
        }

        record
    }
}

impl Default for CspStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for CspStrategy {
    fn kind(&self) -> StrategyType {
        StrategyType::Csp
    }

    fn process_thought(
        &mut self,
        store: &mut ThoughtStore,
        request: &ReasoningRequest,
    ) -> AppResult<ReasoningResponse> {
        let node = create_node(store, request)?;

        let mut record = self.merge_payload(request.constraints.as_ref());
        let satisfied = self.check_constraints();
        record.satisfied = satisfied;
        if let Some(stored) = store.get_mut(&node.id) {
            stored.constraints = Some(record);
        }

        let mut response = ReasoningResponse::from_node(&node, request.next_thought_needed);
        response.constraints_satisfied = Some(satisfied);
        response.unassigned_variables = Some(self.unassigned_variables().len());
        Ok(response)
    }

    fn best_path(&self, store: &ThoughtStore) -> Vec<ThoughtNode> {
        let pick_highest = |satisfied_only: bool| {
            store
                .iter()
                .filter(|n| n.is_complete)
                .filter(|n| {
                    !satisfied_only
                        || n.constraints.as_ref().map(|c| c.satisfied).unwrap_or(false)
                })
                .fold(None::<&ThoughtNode>, |best, candidate| match best {
                    Some(current) if candidate.score > current.score => Some(candidate),
                    Some(current) => Some(current),
                    None => Some(candidate),
                })
        };

        // "Satisfied" is a necessary signal, not a sufficient optimality
        // proof: the fallback to any complete node keeps a best path
        // available when no satisfied candidate exists yet.
        let best = pick_highest(true).or_else(|| pick_highest(false));
        match best {
            Some(node) => store.path(&node.id).unwrap_or_default(),
            None => vec![],
        }
    }

    fn metrics(&self, store: &ThoughtStore) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::base("Constraint Satisfaction", store);
        metrics
            .extra
            .insert("domain_variables".to_string(), json!(self.domains.len()));
        metrics.extra.insert(
            "assigned_variables".to_string(),
            json!(self.assignments.len()),
        );
        metrics.extra.insert(
            "unassigned_variables".to_string(),
            json!(self.unassigned_variables().len()),
        );
        metrics.extra.insert(
            "constrained_variables".to_string(),
            json!(self.predicates.len()),
        );
        metrics
    }

    fn clear(&mut self) {
        self.domains.clear();
        self.assignments.clear();
        self.predicates.clear();
    }
}
