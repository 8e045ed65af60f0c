use crate::octree::{CellState, OcTree, OcTreeKey, Point3};
use crate::planner::PlanningError;
use std::collections::HashMap;

/// Checks whether the straight segment between two points stays inside the
/// free corridor of `tree`.
///
/// The segment is marched at half-resolution steps; it is free only if
/// every traversed cell is [`CellState::Free`]. Inflated obstacles are
/// already baked into the working tree, so this is the authoritative
/// corridor-safety check used by both the search shortcut and the
/// simplification pass.
pub fn free_straight_path(p1: &Point3, p2: &Point3, tree: &OcTree) -> bool {
    let cell_free = |p: &Point3| match tree.coord_to_key(p) {
        Some(key) => tree.state_at(&key) == CellState::Free,
        None => false,
    };

    let dist = p1.distance(p2);
    if dist <= f32::EPSILON {
        return cell_free(p1);
    }
    let steps = (dist / (0.5 * tree.resolution())).ceil() as usize;
    let direction = *p2 - *p1;
    for i in 0..=steps {
        let sample = *p1 + direction * (i as f32 / steps as f32);
        if !cell_free(&sample) {
            return false;
        }
    }
    true
}

/// Walks the parent map from the terminal key back to the start key and
/// returns the keys ordered start-first.
///
/// Fails if the chain does not reach the start, which indicates an
/// inconsistent parent map.
pub(crate) fn backtrack_path_keys(
    terminal: OcTreeKey,
    start: OcTreeKey,
    parent_map: &HashMap<OcTreeKey, OcTreeKey>,
) -> Result<Vec<OcTreeKey>, PlanningError> {
    let mut keys = vec![terminal];
    let mut current = terminal;
    // The chain can visit each mapped key at most once.
    let max_len = parent_map.len() + 1;
    while current != start {
        if keys.len() > max_len {
            return Err(PlanningError::BrokenParentChain);
        }
        match parent_map.get(&current) {
            Some(&parent) => {
                keys.push(parent);
                current = parent;
            }
            None => return Err(PlanningError::BrokenParentChain),
        }
    }
    keys.reverse();
    Ok(keys)
}

/// Maps cell addresses to the world coordinates of their leaf-cell centers.
pub(crate) fn keys_to_coords(keys: &[OcTreeKey], tree: &OcTree) -> Vec<Point3> {
    keys.iter().map(|key| tree.key_to_coord(key)).collect()
}

/// Simplifies a raw path by line-of-sight waypoint elision, then
/// re-densifies long segments so no consecutive pair is farther apart than
/// `max_waypoint_distance`.
pub(crate) fn filter_path(
    waypoints: &[Point3],
    tree: &OcTree,
    max_waypoint_distance: f32,
) -> Vec<Point3> {
    if waypoints.len() <= 1 {
        return waypoints.to_vec();
    }

    // Greedy elision: keep extending the segment from the last retained
    // waypoint while the direct line stays free.
    let mut kept = vec![waypoints[0]];
    let mut anchor = 0;
    let mut probe = 1;
    while probe + 1 < waypoints.len() {
        if free_straight_path(&waypoints[anchor], &waypoints[probe + 1], tree) {
            probe += 1;
        } else {
            kept.push(waypoints[probe]);
            anchor = probe;
            probe += 1;
        }
    }
    kept.push(waypoints[waypoints.len() - 1]);

    // Re-densify so the output respects the waypoint spacing bound.
    let mut out = vec![kept[0]];
    for pair in kept.windows(2) {
        let dist = pair[0].distance(&pair[1]);
        if dist > max_waypoint_distance {
            let segments = (dist / max_waypoint_distance).ceil() as usize;
            let step = (pair[1] - pair[0]) / segments as f32;
            for i in 1..segments {
                out.push(pair[0] + step * i as f32);
            }
        }
        out.push(pair[1]);
    }
    out
}

/// Converts a key path into the final output path: world coordinates,
/// optionally terminated by the exact (non-discretized) endpoint, then
/// simplified and re-densified.
///
/// Returns the path and whether the exact endpoint was appended.
pub(crate) fn prepare_output_path(
    keys: &[OcTreeKey],
    tree: &OcTree,
    endpoint: Option<Point3>,
    max_waypoint_distance: f32,
) -> (Vec<Point3>, bool) {
    let mut coords = keys_to_coords(keys, tree);
    let mut appended = false;
    if let (Some(endpoint), Some(last)) = (endpoint, coords.last().copied()) {
        if last.distance(&endpoint) <= f32::EPSILON {
            appended = true;
        } else if free_straight_path(&last, &endpoint, tree) {
            coords.push(endpoint);
            appended = true;
        }
    }
    (filter_path(&coords, tree, max_waypoint_distance), appended)
}
