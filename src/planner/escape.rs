use crate::octree::{CellState, OcTree, Point3};
use crate::planner::astar::EXPANSION_DIRECTIONS;
use crate::planner::{DistanceField, PlannerConfig};
use tracing::debug;

/// Upper bound on escape-tunnel steps before giving up.
const MAX_TUNNEL_STEPS: usize = 200;

fn within_altitude(z: f32, config: &PlannerConfig) -> bool {
    z <= config.max_altitude && z >= config.min_altitude - config.ground_cutoff
}

fn is_clear(p: &Point3, working: &OcTree, field: &DistanceField, config: &PlannerConfig) -> bool {
    let free = match working.coord_to_key(p) {
        Some(key) => working.state_at(&key) == CellState::Free,
        None => false,
    };
    free && field.distance(p) >= config.safe_obstacle_distance
}

/// Builds a short path moving the start out of an inflated obstacle by
/// hill-climbing the distance field over the 26 neighbor directions at
/// working-tree resolution.
///
/// Returns an empty path when the climb stalls (no direction of increasing
/// clearance), in which case the vertical tunnel is the fallback.
pub(crate) fn create_escape_tunnel(
    working: &OcTree,
    field: &DistanceField,
    start: &Point3,
    config: &PlannerConfig,
) -> Vec<Point3> {
    let res = working.resolution();
    let mut current = *start;
    let mut path = vec![*start];

    for _ in 0..MAX_TUNNEL_STEPS {
        if is_clear(&current, working, field, config) {
            debug!(steps = path.len() - 1, "escape tunnel found");
            return path;
        }

        let here = field.distance(&current);
        let mut best: Option<(f32, Point3)> = None;
        for (dx, dy, dz) in EXPANSION_DIRECTIONS {
            let candidate =
                current + Point3::new(dx as f32, dy as f32, dz as f32) * res;
            if !within_altitude(candidate.z, config) {
                continue;
            }
            let clearance = field.distance(&candidate);
            if best.map_or(true, |(b, _)| clearance > b) {
                best = Some((clearance, candidate));
            }
        }

        match best {
            // Strictly increasing clearance, otherwise we are stuck on a
            // plateau inside the obstacle.
            Some((clearance, candidate)) if clearance > here + 1e-4 => {
                current = candidate;
                path.push(candidate);
            }
            _ => return Vec::new(),
        }
    }
    Vec::new()
}

/// Fallback escape: a purely vertical ascent at mapping-tree resolution
/// until the point is free with adequate clearance. The ascent may cross
/// the inflation margin, never truly occupied space in the raw map. Empty
/// when a solid cell or the ceiling is reached first.
pub(crate) fn create_vertical_tunnel(
    mapping: &OcTree,
    working: &OcTree,
    field: &DistanceField,
    start: &Point3,
    config: &PlannerConfig,
) -> Vec<Point3> {
    let step = mapping.resolution();
    let mut current = *start;
    let mut path = vec![*start];

    while current.z + step <= config.max_altitude {
        current.z += step;
        let solid = match mapping.coord_to_key(&current) {
            Some(key) => mapping.state_at(&key) == CellState::Occupied,
            None => true,
        };
        if solid {
            debug!(altitude = current.z, "vertical tunnel hit solid space");
            return Vec::new();
        }
        path.push(current);
        if is_clear(&current, working, field, config) {
            debug!(steps = path.len() - 1, "vertical tunnel found");
            return path;
        }
    }
    Vec::new()
}

/// Substitutes an unreachable goal with the closest reachable point to it
/// along the start-goal segment, stepping at working-tree resolution.
pub(crate) fn generate_temporary_goal(
    start: &Point3,
    goal: &Point3,
    working: &OcTree,
    config: &PlannerConfig,
) -> Option<Point3> {
    let towards_start = *start - *goal;
    let length = towards_start.norm();
    if length <= f32::EPSILON {
        return None;
    }
    let steps = (length / working.resolution()).ceil() as usize;
    for i in 1..=steps {
        let candidate = *goal + towards_start * (i as f32 / steps as f32);
        if !within_altitude(candidate.z, config) {
            continue;
        }
        if let Some(key) = working.coord_to_key(&candidate) {
            if working.state_at(&key) == CellState::Free {
                debug!(%candidate, "substituted temporary goal");
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::planning_tree::create_planning_tree;

    fn config() -> PlannerConfig {
        PlannerConfig {
            safe_obstacle_distance: 1.0,
            euclidean_distance_cutoff: 4.0,
            planning_tree_resolution: 0.5,
            min_altitude: 0.0,
            max_altitude: 12.0,
            ..PlannerConfig::default()
        }
    }

    /// A free slab with a solid wall filling x in [5.0, 5.5].
    fn wall_map() -> OcTree {
        let mut raw = OcTree::new(0.5);
        for kx in -8..28 {
            for ky in -12..12 {
                for kz in 0..12 {
                    let p = Point3::new(
                        kx as f32 * 0.5 + 0.25,
                        ky as f32 * 0.5 + 0.25,
                        kz as f32 * 0.5 + 0.25,
                    );
                    let occupied = (5.0..5.5).contains(&p.x) && p.z < 4.0;
                    let key = raw.coord_to_key(&p).unwrap();
                    raw.insert(key, occupied);
                }
            }
        }
        raw.prune();
        raw
    }

    #[test]
    fn test_escape_tunnel_reaches_clearance() {
        let raw = wall_map();
        let cfg = config();
        let (working, field) = create_planning_tree(&raw, &cfg);

        // 0.4 m from the wall face: inside the inflated obstacle.
        let start = Point3::new(4.6, 0.25, 1.25);
        let key = working.coord_to_key(&start).unwrap();
        assert_eq!(working.state_at(&key), CellState::Occupied);

        let tunnel = create_escape_tunnel(&working, &field, &start, &cfg);
        assert!(!tunnel.is_empty());
        assert_eq!(tunnel[0], start);
        let last = tunnel.last().unwrap();
        assert!(field.distance(last) >= cfg.safe_obstacle_distance);
    }

    #[test]
    fn test_vertical_tunnel_climbs_over() {
        let raw = wall_map();
        let cfg = config();
        let (working, field) = create_planning_tree(&raw, &cfg);

        // Inside the inflated region next to the wall; free space above.
        let start = Point3::new(4.6, 0.25, 1.25);
        let tunnel = create_vertical_tunnel(&raw, &working, &field, &start, &cfg);
        assert!(!tunnel.is_empty());
        let last = tunnel.last().unwrap();
        assert!(last.z > start.z);
        assert!(field.distance(last) >= cfg.safe_obstacle_distance);
    }

    #[test]
    fn test_vertical_tunnel_blocked_by_solid_ceiling() {
        // A free volume capped by a solid ceiling layer at z in [3.0, 3.5).
        let mut raw = OcTree::new(0.5);
        for kx in -8..8 {
            for ky in -8..8 {
                for kz in 0..12 {
                    let p = Point3::new(
                        kx as f32 * 0.5 + 0.25,
                        ky as f32 * 0.5 + 0.25,
                        kz as f32 * 0.5 + 0.25,
                    );
                    let occupied = (3.0..3.5).contains(&p.z);
                    let key = raw.coord_to_key(&p).unwrap();
                    raw.insert(key, occupied);
                }
            }
        }
        raw.prune();
        let cfg = config();
        let (working, field) = create_planning_tree(&raw, &cfg);

        // Inside the ceiling's inflation band; the only way up is through
        // the solid layer, so the ascent must abort instead of tunneling.
        let start = Point3::new(0.25, 0.25, 2.75);
        let key = working.coord_to_key(&start).unwrap();
        assert_eq!(working.state_at(&key), CellState::Occupied);

        let tunnel = create_vertical_tunnel(&raw, &working, &field, &start, &cfg);
        assert!(tunnel.is_empty());
    }

    #[test]
    fn test_temporary_goal_steps_out_of_wall() {
        let raw = wall_map();
        let cfg = config();
        let (working, _) = create_planning_tree(&raw, &cfg);

        let start = Point3::new(0.25, 0.25, 1.25);
        let goal = Point3::new(5.25, 0.25, 1.25); // inside the wall
        let substitute = generate_temporary_goal(&start, &goal, &working, &cfg).unwrap();

        let key = working.coord_to_key(&substitute).unwrap();
        assert_eq!(working.state_at(&key), CellState::Free);
        // The substitute lies between start and goal, nearer to the goal side.
        assert!(substitute.x < goal.x);
        assert!(substitute.x > start.x);
    }

    #[test]
    fn test_temporary_goal_none_for_degenerate_segment() {
        let raw = wall_map();
        let cfg = config();
        let (working, _) = create_planning_tree(&raw, &cfg);
        let p = Point3::new(1.0, 0.0, 1.0);
        assert!(generate_temporary_goal(&p, &p, &working, &cfg).is_none());
    }
}
