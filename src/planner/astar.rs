use crate::octree::{CellState, OcTree, OcTreeKey, Point3, MAX_DEPTH};
use crate::planner::escape::{
    create_escape_tunnel, create_vertical_tunnel, generate_temporary_goal,
};
use crate::planner::planning_tree::create_planning_tree;
use crate::planner::postprocess::{
    backtrack_path_keys, free_straight_path, filter_path, prepare_output_path,
};
use crate::planner::{Node, PlannerConfig, PlanningError, PlanningResult, SearchObserver};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The 26-connected neighbor offsets of the 3x3x3 cube, zero excluded.
pub(crate) const EXPANSION_DIRECTIONS: [(i64, i64, i64); 26] = [
    (-1, -1, -1),
    (-1, -1, 0),
    (-1, -1, 1),
    (-1, 0, -1),
    (-1, 0, 0),
    (-1, 0, 1),
    (-1, 1, -1),
    (-1, 1, 0),
    (-1, 1, 1),
    (0, -1, -1),
    (0, -1, 0),
    (0, -1, 1),
    (0, 0, -1),
    (0, 0, 1),
    (0, 1, -1),
    (0, 1, 0),
    (0, 1, 1),
    (1, -1, -1),
    (1, -1, 0),
    (1, -1, 1),
    (1, 0, -1),
    (1, 0, 0),
    (1, 0, 1),
    (1, 1, -1),
    (1, 1, 0),
    (1, 1, 1),
];

/// Every this many expansions the search re-checks line of sight to the
/// goal and publishes a snapshot to the observer.
const EXPANSION_CALLBACK_PERIOD: usize = 50;

enum SearchTermination {
    /// The goal acceptance region (or direct line of sight to the goal)
    /// was reached from this key.
    Reached(OcTreeKey),
    /// The deadline expired; this is the closed key nearest to the goal.
    TimedOut(OcTreeKey),
    /// The open set emptied without reaching the goal.
    Exhausted,
}

/// A* planner over 3D occupancy octrees.
///
/// Stateless across calls apart from its fixed configuration: each
/// [`AstarPlanner::find_path`] call derives its own working tree, searches
/// it, and tears all search state down on return.
pub struct AstarPlanner {
    config: PlannerConfig,
}

impl AstarPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Computes a safe route from `start` to `goal` through `mapping_tree`.
    ///
    /// Parameters:
    /// - `start`, `goal`: world-space coordinates.
    /// - `mapping_tree`: the raw occupancy snapshot, read-only for the call.
    /// - `timeout`: caller deadline in seconds; the effective deadline is
    ///   the minimum of this and the configured `timeout_threshold`.
    /// - `observer`: receives the working tree once and periodic expansion
    ///   snapshots.
    ///
    /// Returns the waypoint sequence (possibly empty) and the outcome. No
    /// error escapes this entry point; abnormal conditions map to
    /// [`PlanningResult`] variants.
    pub fn find_path(
        &self,
        start: &Point3,
        goal: &Point3,
        mapping_tree: &OcTree,
        timeout: f32,
        observer: &mut dyn SearchObserver,
    ) -> (Vec<Point3>, PlanningResult) {
        let budget = timeout.min(self.config.timeout_threshold).max(0.0);
        let deadline = Instant::now() + Duration::from_secs_f32(budget);

        let (working, field) = create_planning_tree(mapping_tree, &self.config);
        observer.on_tree_built(&working);

        if working.is_empty() {
            warn!(error = %PlanningError::EmptyTree, "planning aborted");
            return (Vec::new(), PlanningResult::Failure);
        }
        if start == goal {
            warn!(error = %PlanningError::DegenerateRequest, "planning aborted");
            return (Vec::new(), PlanningResult::Failure);
        }
        let Some(start_key) = working.coord_to_key(start) else {
            warn!(error = %PlanningError::OutOfKeyRange(*start), "planning aborted");
            return (Vec::new(), PlanningResult::Failure);
        };

        // A start inside an inflated obstacle gets a standalone escape
        // maneuver; the caller executes it before asking for a new plan.
        if working.state_at(&start_key) == CellState::Occupied {
            let mut tunnel = create_escape_tunnel(&working, &field, start, &self.config);
            if tunnel.is_empty() {
                tunnel = create_vertical_tunnel(mapping_tree, &working, &field, start, &self.config);
            }
            if tunnel.is_empty() {
                warn!("start is trapped, no escape tunnel found");
                return (Vec::new(), PlanningResult::Failure);
            }
            return (tunnel, PlanningResult::Incomplete);
        }

        // Substitute a blocked or unreachable goal with the closest
        // reachable point toward the start.
        let goal_blocked = match working.coord_to_key(goal) {
            Some(key) => {
                working.state_at(&key) != CellState::Free
                    || goal.z > self.config.max_altitude
                    || goal.z < self.config.min_altitude - self.config.ground_cutoff
            }
            None => true,
        };
        let (target, substituted) = if goal_blocked {
            match generate_temporary_goal(start, goal, &working, &self.config) {
                Some(substitute) => (substitute, true),
                None => {
                    warn!("goal is blocked and no substitute goal exists");
                    return (Vec::new(), PlanningResult::Failure);
                }
            }
        } else {
            (*goal, false)
        };

        let (path, result) =
            self.plan_course(start, &target, start_key, &working, deadline, observer);
        let result = if substituted && result.is_success() {
            PlanningResult::GoalInObstacle
        } else {
            result
        };
        debug!(%result, waypoints = path.len(), "planning finished");
        (path, result)
    }

    /// Runs the shortcut check and the A* search toward `goal`, then
    /// post-processes the result into world-space waypoints.
    fn plan_course(
        &self,
        start: &Point3,
        goal: &Point3,
        start_key: OcTreeKey,
        working: &OcTree,
        deadline: Instant,
        observer: &mut dyn SearchObserver,
    ) -> (Vec<Point3>, PlanningResult) {
        // Direct line of sight makes the grid search unnecessary.
        if free_straight_path(start, goal, working) {
            let path = filter_path(
                &[*start, *goal],
                working,
                self.config.max_waypoint_distance,
            );
            return (path, PlanningResult::Complete);
        }

        let (termination, parents) =
            self.search(start, goal, start_key, working, deadline, observer);
        match termination {
            SearchTermination::Reached(terminal) => {
                match backtrack_path_keys(terminal, start_key, &parents) {
                    Ok(keys) => {
                        let (path, appended) = prepare_output_path(
                            &keys,
                            working,
                            Some(*goal),
                            self.config.max_waypoint_distance,
                        );
                        let result = if appended {
                            PlanningResult::Complete
                        } else {
                            PlanningResult::GoalReached
                        };
                        (path, result)
                    }
                    Err(err) => {
                        warn!(error = %err, "backtracking failed");
                        (Vec::new(), PlanningResult::Failure)
                    }
                }
            }
            SearchTermination::TimedOut(best) => {
                match backtrack_path_keys(best, start_key, &parents) {
                    Ok(keys) => {
                        let (path, _) = prepare_output_path(
                            &keys,
                            working,
                            None,
                            self.config.max_waypoint_distance,
                        );
                        (path, PlanningResult::Incomplete)
                    }
                    Err(err) => {
                        warn!(error = %err, "backtracking failed");
                        (Vec::new(), PlanningResult::Failure)
                    }
                }
            }
            SearchTermination::Exhausted => {
                debug!("search space exhausted, no path exists in the working tree");
                (Vec::new(), PlanningResult::Failure)
            }
        }
    }

    fn cost(&self, cum_dist: f32, goal_dist: f32) -> f32 {
        self.config.distance_penalty * cum_dist + self.config.greedy_penalty * goal_dist
    }

    /// The A* expansion loop over working-tree cell addresses.
    ///
    /// The step size at each expansion matches the edge length of the leaf
    /// covering the current cell, so the search leaps across coarse free
    /// leaves instead of subdividing them.
    fn search(
        &self,
        start: &Point3,
        goal: &Point3,
        start_key: OcTreeKey,
        working: &OcTree,
        deadline: Instant,
        observer: &mut dyn SearchObserver,
    ) -> (SearchTermination, HashMap<OcTreeKey, OcTreeKey>) {
        let mut open: BinaryHeap<Reverse<Node>> = BinaryHeap::new();
        let mut closed: HashSet<OcTreeKey> = HashSet::new();
        let mut parents: HashMap<OcTreeKey, OcTreeKey> = HashMap::new();
        let mut best_cum: HashMap<OcTreeKey, f32> = HashMap::new();

        let start_goal_dist = start.distance(goal);
        let start_node = Node::new(
            start_key,
            self.cost(0.0, start_goal_dist),
            0.0,
            start_goal_dist,
        );
        open.push(Reverse(start_node));
        best_cum.insert(start_key, 0.0);

        let mut best_node = start_node;
        let mut expansions = 0usize;

        while let Some(Reverse(node)) = open.pop() {
            // Deadline is polled once per expansion, not per callback.
            if Instant::now() >= deadline {
                debug!(expansions, "search deadline expired");
                return (SearchTermination::TimedOut(best_node.key), parents);
            }
            if !closed.insert(node.key) {
                // Stale duplicate: a cheaper instance of this key was
                // already expanded.
                continue;
            }
            if node.goal_dist < best_node.goal_dist {
                best_node = node;
            }

            let center = working.key_to_coord(&node.key);
            if center.distance_xy(goal) <= self.config.planning_tree_resolution
                && (center.z - goal.z).abs() <= self.config.altitude_acceptance_radius
            {
                debug!(expansions, "goal reached");
                return (SearchTermination::Reached(node.key), parents);
            }

            expansions += 1;
            if expansions % EXPANSION_CALLBACK_PERIOD == 0 {
                if free_straight_path(&center, goal, working) {
                    debug!(expansions, "line of sight to goal from frontier");
                    return (SearchTermination::Reached(node.key), parents);
                }
                let snapshot: Vec<Node> = open.iter().map(|Reverse(n)| *n).collect();
                observer.on_expansion(&snapshot, &closed, working);
            }

            let depth = working.depth_at(&node.key).unwrap_or(MAX_DEPTH);
            let step_cells = 1i64 << (MAX_DEPTH - depth);
            for (dx, dy, dz) in EXPANSION_DIRECTIONS {
                let Some(neighbor) =
                    node.key
                        .offset(dx * step_cells, dy * step_cells, dz * step_cells)
                else {
                    continue;
                };
                if !working.in_bounds(&neighbor)
                    || closed.contains(&neighbor)
                    || working.state_at(&neighbor) != CellState::Free
                {
                    continue;
                }
                let neighbor_center = working.key_to_coord(&neighbor);
                // A coarse leap may overshoot past thin obstacles; validate
                // the traversed corridor before accepting it.
                if step_cells > 1 && !free_straight_path(&center, &neighbor_center, working) {
                    continue;
                }
                let cum_dist = node.cum_dist + center.distance(&neighbor_center);
                if best_cum.get(&neighbor).is_some_and(|&c| c <= cum_dist) {
                    continue;
                }
                best_cum.insert(neighbor, cum_dist);
                parents.insert(neighbor, node.key);
                let goal_dist = neighbor_center.distance(goal);
                open.push(Reverse(Node::new(
                    neighbor,
                    self.cost(cum_dist, goal_dist),
                    cum_dist,
                    goal_dist,
                )));
            }
        }

        (SearchTermination::Exhausted, parents)
    }
}
