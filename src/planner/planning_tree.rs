use crate::octree::{CellState, OcTree, OcTreeKey, Point3};
use crate::planner::{DistanceField, PlannerConfig};
use tracing::debug;

/// Derives the working tree for one planning call from the raw occupancy
/// snapshot.
///
/// The raw tree is densely resampled at `planning_tree_resolution` over its
/// bounding box: a working cell is occupied if any constituent raw cell is
/// occupied, or unknown when `unknown_is_occupied` is set. Cells outside
/// the altitude bounds (with a `ground_cutoff` tolerance below the lower
/// bound) are occupied. Every obstacle is then grown by
/// `safe_obstacle_distance` using the distance field, so a free working
/// cell is always safe to traverse.
///
/// Returns the pruned working tree together with the distance field over
/// the pre-inflation obstacle set. Deterministic for identical inputs.
pub fn create_planning_tree(raw: &OcTree, config: &PlannerConfig) -> (OcTree, DistanceField) {
    let res = config.planning_tree_resolution;
    let mut working = OcTree::new(res);

    let Some((min_pt, max_pt)) = raw.bounds() else {
        return (
            working,
            DistanceField::from_points(&[], config.euclidean_distance_cutoff),
        );
    };

    let (Some(key_lo), Some(key_hi)) = (working.coord_to_key(&min_pt), working.coord_to_key(&max_pt))
    else {
        return (
            working,
            DistanceField::from_points(&[], config.euclidean_distance_cutoff),
        );
    };

    // Sub-samples per axis inside one working cell, at raw resolution.
    let samples = ((res / raw.resolution()).round() as usize).max(1);

    let mut cells = Vec::new();
    // Pre-inflation obstacle cells, kept unpruned at leaf level so the
    // distance field indexes exactly these cell centers.
    let mut obstacles = OcTree::new(res);
    let mut num_obstacles = 0usize;
    for kx in key_lo.x..=key_hi.x {
        for ky in key_lo.y..=key_hi.y {
            for kz in key_lo.z..=key_hi.z {
                let key = OcTreeKey::new(kx, ky, kz);
                let center = working.key_to_coord(&key);

                let mut any_occupied = false;
                let mut any_unknown = false;
                'sampling: for sx in 0..samples {
                    for sy in 0..samples {
                        for sz in 0..samples {
                            let offset = |s: usize| ((s as f32 + 0.5) / samples as f32 - 0.5) * res;
                            let sample =
                                center + Point3::new(offset(sx), offset(sy), offset(sz));
                            match raw.coord_to_key(&sample).map(|k| raw.state_at(&k)) {
                                Some(CellState::Occupied) => {
                                    any_occupied = true;
                                    break 'sampling;
                                }
                                Some(CellState::Free) => {}
                                Some(CellState::Unknown) | None => any_unknown = true,
                            }
                        }
                    }
                }

                let occupied = any_occupied || (any_unknown && config.unknown_is_occupied);
                if occupied {
                    obstacles.insert(key, true);
                    num_obstacles += 1;
                }
                cells.push((key, center, occupied));
            }
        }
    }

    let field = DistanceField::from_tree(&obstacles, config.euclidean_distance_cutoff);

    let mut num_occupied = 0usize;
    for (key, center, occupied) in cells.iter() {
        let altitude_violation =
            center.z > config.max_altitude || center.z < config.min_altitude - config.ground_cutoff;
        let unsafe_cell =
            !*occupied && field.distance(center) < config.safe_obstacle_distance;
        let state = *occupied || altitude_violation || unsafe_cell;
        if state {
            num_occupied += 1;
        }
        working.insert(*key, state);
    }
    working.prune();

    debug!(
        cells = cells.len(),
        occupied = num_occupied,
        obstacles = num_obstacles,
        "planning tree built"
    );
    (working, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::OcTreeKey;

    fn config(safe: f32) -> PlannerConfig {
        PlannerConfig {
            safe_obstacle_distance: safe,
            planning_tree_resolution: 0.5,
            min_altitude: 0.0,
            max_altitude: 10.0,
            ground_cutoff: 0.5,
            unknown_is_occupied: false,
            ..PlannerConfig::default()
        }
    }

    /// A raw tree whose bounding box spans the two corners, all free.
    fn free_box(min: Point3, max: Point3) -> OcTree {
        let mut tree = OcTree::new(0.5);
        for p in [min, max] {
            let key = tree.coord_to_key(&p).unwrap();
            tree.insert(key, false);
        }
        tree
    }

    #[test]
    fn test_unknown_treated_as_free_by_default() {
        let raw = free_box(Point3::new(0.0, 0.0, 1.0), Point3::new(5.0, 2.0, 2.0));
        let (working, _) = create_planning_tree(&raw, &config(0.4));

        // The interior of the box was never observed, yet it plans as free.
        let key = working.coord_to_key(&Point3::new(2.5, 1.0, 1.5)).unwrap();
        assert_eq!(working.state_at(&key), CellState::Free);
    }

    #[test]
    fn test_unknown_is_occupied_blocks_interior() {
        let raw = free_box(Point3::new(0.0, 0.0, 1.0), Point3::new(5.0, 2.0, 2.0));
        let mut cfg = config(0.4);
        cfg.unknown_is_occupied = true;
        let (working, _) = create_planning_tree(&raw, &cfg);

        let key = working.coord_to_key(&Point3::new(2.5, 1.0, 1.5)).unwrap();
        assert_eq!(working.state_at(&key), CellState::Occupied);
    }

    #[test]
    fn test_obstacle_is_inflated() {
        let mut raw = OcTree::new(0.5);
        // Establish a free region with an obstacle cell in the middle.
        for p in [Point3::new(-4.0, -4.0, 0.5), Point3::new(4.0, 4.0, 2.5)] {
            let key = raw.coord_to_key(&p).unwrap();
            raw.insert(key, false);
        }
        let obstacle = Point3::new(0.25, 0.25, 1.25);
        raw.insert(raw.coord_to_key(&obstacle).unwrap(), true);

        let (working, field) = create_planning_tree(&raw, &config(1.0));

        let near = working.coord_to_key(&Point3::new(0.75, 0.25, 1.25)).unwrap();
        assert_eq!(working.state_at(&near), CellState::Occupied);
        assert!(field.distance(&obstacle) < 0.5);

        let far = working.coord_to_key(&Point3::new(3.25, 3.25, 1.25)).unwrap();
        assert_eq!(working.state_at(&far), CellState::Free);
    }

    #[test]
    fn test_altitude_bounds_are_hard() {
        let raw = free_box(Point3::new(0.0, 0.0, -2.0), Point3::new(4.0, 2.0, 12.0));
        let (working, _) = create_planning_tree(&raw, &config(0.4));

        let too_high = working.coord_to_key(&Point3::new(2.0, 1.0, 11.0)).unwrap();
        assert_eq!(working.state_at(&too_high), CellState::Occupied);

        let too_low = working.coord_to_key(&Point3::new(2.0, 1.0, -1.5)).unwrap();
        assert_eq!(working.state_at(&too_low), CellState::Occupied);

        // Within the ground cutoff band below min_altitude stays free.
        let approach = working.coord_to_key(&Point3::new(2.0, 1.0, -0.25)).unwrap();
        assert_eq!(working.state_at(&approach), CellState::Free);
    }

    #[test]
    fn test_empty_raw_tree_yields_empty_working_tree() {
        let raw = OcTree::new(0.5);
        let (working, field) = create_planning_tree(&raw, &config(0.4));
        assert!(working.is_empty());
        let key = OcTreeKey::new(1 << 15, 1 << 15, 1 << 15);
        assert_eq!(working.state_at(&key), CellState::Unknown);
        assert_eq!(field.distance(&Point3::zero()), field.cutoff());
    }
}
