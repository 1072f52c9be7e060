//! In-memory thought tree storage.
//!
//! This module provides the shared node table used by every search strategy:
//! an arena keyed by node id, with parent/child links stored as ids rather
//! than owning pointers so path walking and eviction stay safe.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Simulation statistics accumulated by the MCTS strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Number of rollouts that passed through this node.
    pub visits: u64,
    /// Sum of rewards accumulated across those rollouts.
    pub total_reward: f64,
}

impl SimulationStats {
    /// Mean reward per visit, or `None` when no visits were recorded.
    pub fn mean_reward(&self) -> Option<f64> {
        if self.visits == 0 {
            None
        } else {
            Some(self.total_reward / self.visits as f64)
        }
    }
}

/// Constraint payload attached to a node by the CSP strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConstraints {
    /// Candidate values per variable, as supplied by the caller.
    #[serde(default)]
    pub domains: HashMap<String, Vec<serde_json::Value>>,
    /// Chosen value per variable, as supplied by the caller.
    #[serde(default)]
    pub assignments: HashMap<String, serde_json::Value>,
    /// Whether the registered constraints held when this node was created.
    pub satisfied: bool,
}

/// One step in the reasoning tree.
///
/// Content is opaque to the store; scoring and the strategy-owned optional
/// fields are written once by the strategy that created the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtNode {
    /// Unique node identifier (UUID v4), assigned at creation.
    pub id: String,
    /// Caller-supplied thought text.
    pub thought: String,
    /// Zero-based depth, derived from the caller's step index.
    pub depth: usize,
    /// Quality score in the nominal 0-10 range, computed at creation.
    pub score: f64,
    /// Ordered child node ids, appended by the owning strategy.
    pub children: Vec<String>,
    /// Back-reference to the parent node, unset for roots.
    pub parent_id: Option<String>,
    /// True when the caller signalled no further continuation is needed.
    pub is_complete: bool,
    /// Caller-supplied sub-metric values, opaque to the core.
    #[serde(default)]
    pub evaluations: HashMap<String, f64>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// MCTS visit/reward accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationStats>,
    /// A* estimate of remaining cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heuristic_value: Option<f64>,
    /// CSP domains/assignments carried by this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<NodeConstraints>,
}

impl ThoughtNode {
    /// True when the node has no recorded children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Capacity-bounded arena of [`ThoughtNode`]s.
///
/// Nodes are kept in insertion order so that eviction is oldest-first and
/// scans are stable. An overwrite by id keeps the original queue position;
/// only genuinely new ids advance the eviction queue.
#[derive(Debug)]
pub struct ThoughtStore {
    nodes: HashMap<String, ThoughtNode>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ThoughtStore {
    /// Create a store bounded to `capacity` nodes. A zero capacity is
    /// raised to one so the store can always hold the node being inserted.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// The configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `id` refers to a live node.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert or overwrite a node by id, evicting the oldest inserted
    /// node(s) once the capacity bound is exceeded.
    pub fn insert(&mut self, node: ThoughtNode) {
        let id = node.id.clone();
        if self.nodes.insert(id.clone(), node).is_none() {
            self.order.push_back(id);
        }
        while self.nodes.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.nodes.remove(&oldest);
                tracing::debug!(node_id = %oldest, "Evicted oldest node at capacity");
            } else {
                break;
            }
        }
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&ThoughtNode> {
        self.nodes.get(id)
    }

    /// Mutable lookup, used by strategies that own a node's optional fields.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ThoughtNode> {
        self.nodes.get_mut(id)
    }

    /// All live nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ThoughtNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// The most recently inserted `n` live nodes, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&ThoughtNode> {
        let start = self.order.len().saturating_sub(n);
        self.order
            .iter()
            .skip(start)
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Reconstruct the root-to-node path for `id` by walking parent links.
    ///
    /// Fails with [`StoreError::NotFound`] when `id` is absent and with
    /// [`StoreError::CycleDetected`] when the walk does not terminate within
    /// the capacity bound. A parent evicted mid-chain truncates the walk
    /// rather than failing: the remaining prefix is simply unavailable.
    pub fn path(&self, id: &str) -> StoreResult<Vec<ThoughtNode>> {
        if !self.nodes.contains_key(id) {
            return Err(StoreError::NotFound {
                node_id: id.to_string(),
            });
        }

        let mut path = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(current_id) = current {
            if path.len() > self.capacity {
                return Err(StoreError::CycleDetected {
                    node_id: id.to_string(),
                    bound: self.capacity,
                });
            }
            match self.nodes.get(&current_id) {
                Some(node) => {
                    current = node.parent_id.clone();
                    path.push(node.clone());
                }
                // Parent aged out of the store; stop at the surviving suffix.
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Remove every node. The capacity bound is retained.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }
}
