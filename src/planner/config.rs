use serde::{Deserialize, Serialize};

/// Planner configuration. Fixed at construction and immutable for the
/// lifetime of the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Minimum clearance between the path and any obstacle, in meters.
    /// Obstacles in the working tree are inflated by this margin.
    pub safe_obstacle_distance: f32,
    /// Distances beyond this cutoff need not be exact in the distance
    /// field; queries clip to it.
    pub euclidean_distance_cutoff: f32,
    /// Leaf-cell edge length of the working tree, in meters.
    pub planning_tree_resolution: f32,
    /// Weight of the accumulated path distance in the node cost.
    pub distance_penalty: f32,
    /// Weight of the straight-line goal distance in the node cost. Values
    /// above `distance_penalty` make the search greedier.
    pub greedy_penalty: f32,
    /// Hard lower altitude bound for the path.
    pub min_altitude: f32,
    /// Hard upper altitude bound for the path.
    pub max_altitude: f32,
    /// Tolerance band below `min_altitude` kept free for final-approach
    /// moves near the ground.
    pub ground_cutoff: f32,
    /// Upper bound on search wall-clock time, in seconds. The effective
    /// deadline of a call is the minimum of this and the caller's timeout.
    pub timeout_threshold: f32,
    /// Maximum spacing between consecutive output waypoints, in meters.
    pub max_waypoint_distance: f32,
    /// Vertical tolerance for accepting a cell as the goal.
    pub altitude_acceptance_radius: f32,
    /// Whether unobserved space is treated as an obstacle.
    pub unknown_is_occupied: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safe_obstacle_distance: 1.0,
            euclidean_distance_cutoff: 4.0,
            planning_tree_resolution: 0.5,
            distance_penalty: 1.0,
            greedy_penalty: 1.5,
            min_altitude: 0.0,
            max_altitude: 50.0,
            ground_cutoff: 0.5,
            timeout_threshold: 1.0,
            max_waypoint_distance: 2.0,
            altitude_acceptance_radius: 0.8,
            unknown_is_occupied: false,
        }
    }
}
