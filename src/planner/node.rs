use crate::octree::OcTreeKey;
use crate::util::ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A node in the A* search.
///
/// `total_cost = distance_penalty * cum_dist + greedy_penalty * goal_dist`.
/// Several nodes sharing a key may coexist in the open set with different
/// costs; only the cheapest instance per key is ever expanded (the rest are
/// discarded as stale when popped).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Node {
    /// The cell address of this node in the working tree.
    pub key: OcTreeKey,
    /// The combined priority used by the open set.
    pub total_cost: f32,
    /// Accumulated path distance from the start, in meters.
    pub cum_dist: f32,
    /// Straight-line distance to the goal, in meters.
    pub goal_dist: f32,
}

impl Node {
    pub fn new(key: OcTreeKey, total_cost: f32, cum_dist: f32, goal_dist: f32) -> Self {
        Self {
            key,
            total_cost,
            cum_dist,
            goal_dist,
        }
    }

}

// The open set pops the lowest total cost first. Ties prefer the node with
// the lower accumulated distance (favors progress already made, reduces
// oscillation); remaining ties break on the key so the search is
// deterministic.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.total_cost)
            .cmp(&OrderedFloat(other.total_cost))
            .then_with(|| OrderedFloat(self.cum_dist).cmp(&OrderedFloat(other.cum_dist)))
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}
