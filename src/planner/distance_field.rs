use crate::octree::{OcTree, Point3, MAX_DEPTH};
use kiddo::float::{distance::SquaredEuclidean, kdtree::KdTree};

/// A Euclidean distance transform over the occupied cells of a tree.
///
/// Reports, for any coordinate, the distance to the center of the nearest
/// occupied leaf-level cell, clipped at the configured cutoff. Used to
/// inflate obstacles, classify cells as unsafe and steer escape maneuvers
/// toward increasing clearance.
pub struct DistanceField {
    kdtree: KdTree<f32, usize, 3, 32, u32>,
    num_points: usize,
    cutoff: f32,
}

impl DistanceField {
    /// Builds the field from the occupied cells of `tree`. Coarse occupied
    /// leaves are expanded into their constituent leaf-level cells.
    ///
    /// Construction cost is proportional to the occupied volume.
    pub fn from_tree(tree: &OcTree, cutoff: f32) -> Self {
        let mut centers = Vec::new();
        for leaf in tree.leaves() {
            if !leaf.occupied {
                continue;
            }
            let side = 1i64 << (MAX_DEPTH - leaf.depth);
            for dx in 0..side {
                for dy in 0..side {
                    for dz in 0..side {
                        if let Some(cell) = leaf.key.offset(dx, dy, dz) {
                            centers.push(tree.key_to_coord(&cell));
                        }
                    }
                }
            }
        }
        Self::from_points(&centers, cutoff)
    }

    /// Builds the field directly from a set of occupied cell centers.
    pub fn from_points(centers: &[Point3], cutoff: f32) -> Self {
        let mut kdtree = KdTree::new();
        for (item, center) in centers.iter().enumerate() {
            kdtree.add(&center.values(), item);
        }
        Self {
            kdtree,
            num_points: centers.len(),
            cutoff,
        }
    }

    /// Returns the distance from `coord` to the nearest occupied cell
    /// center, clipped at the cutoff. A field with no obstacles reports the
    /// cutoff everywhere.
    pub fn distance(&self, coord: &Point3) -> f32 {
        if self.num_points == 0 {
            return self.cutoff;
        }
        let nearest = self.kdtree.nearest_one::<SquaredEuclidean>(&coord.values());
        nearest.distance.sqrt().min(self.cutoff)
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::OcTree;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_field_reports_cutoff() {
        let tree = OcTree::new(0.5);
        let field = DistanceField::from_tree(&tree, 4.0);
        assert_relative_eq!(field.distance(&Point3::zero()), 4.0);
    }

    #[test]
    fn test_distance_to_single_cell() {
        let mut tree = OcTree::new(1.0);
        let key = tree.coord_to_key(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        tree.insert(key, true);
        let center = tree.key_to_coord(&key);

        let field = DistanceField::from_tree(&tree, 10.0);
        assert_relative_eq!(field.distance(&center), 0.0);
        let probe = center + Point3::new(3.0, 0.0, 0.0);
        assert_relative_eq!(field.distance(&probe), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cutoff_clips_distance() {
        let field = DistanceField::from_points(&[Point3::zero()], 2.0);
        let far = Point3::new(100.0, 0.0, 0.0);
        assert_relative_eq!(field.distance(&far), 2.0);
    }

    #[test]
    fn test_coarse_occupied_leaf_expands_to_cells() {
        let mut tree = OcTree::new(0.5);
        let base = tree
            .coord_to_key(&Point3::zero())
            .unwrap()
            .at_depth(MAX_DEPTH - 1);
        for dx in 0..2 {
            for dy in 0..2 {
                for dz in 0..2 {
                    tree.insert(base.offset(dx, dy, dz).unwrap(), true);
                }
            }
        }
        tree.prune();
        assert_eq!(tree.depth_at(&base), Some(MAX_DEPTH - 1));

        let field = DistanceField::from_tree(&tree, 10.0);
        // Distances measure to the nearest constituent cell center, not to
        // the merged leaf's center.
        let corner = tree.key_to_coord(&base);
        assert_relative_eq!(field.distance(&corner), 0.0);
        let probe = corner + Point3::new(-3.0, 0.0, 0.0);
        assert_relative_eq!(field.distance(&probe), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_free_leaves_are_ignored() {
        let mut tree = OcTree::new(1.0);
        let free = tree.coord_to_key(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        let occ = tree.coord_to_key(&Point3::new(5.0, 0.0, 0.0)).unwrap();
        tree.insert(free, false);
        tree.insert(occ, true);

        let field = DistanceField::from_tree(&tree, 10.0);
        let origin = tree.key_to_coord(&free);
        assert_relative_eq!(field.distance(&origin), 5.0, epsilon = 1e-5);
    }
}
