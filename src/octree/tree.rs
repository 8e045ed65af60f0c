use crate::octree::key::{KEY_ORIGIN, KEY_SPAN, MAX_DEPTH};
use crate::octree::{OcTreeKey, Point3};
use serde::{Deserialize, Serialize};

/// The occupancy classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Free,
    Occupied,
    /// The cell is not covered by any leaf (never observed).
    Unknown,
}

/// A leaf of the tree, reported by [`OcTree::leaves`].
///
/// `key` is the minimal corner of the leaf at leaf-level addressing;
/// `depth` determines the leaf's edge length.
#[derive(Debug, Clone, Copy)]
pub struct Leaf {
    pub key: OcTreeKey,
    pub depth: u8,
    pub occupied: bool,
}

enum OcNode {
    Leaf(bool),
    Inner(Box<[Option<OcNode>; 8]>),
}

fn empty_children() -> Box<[Option<OcNode>; 8]> {
    Box::new(std::array::from_fn(|_| None))
}

/// A sparse hierarchical occupancy tree.
///
/// Cells are addressed by [`OcTreeKey`] at the tree's native resolution;
/// space never covered by an insert is [`CellState::Unknown`]. After
/// [`OcTree::prune`], uniform regions collapse into coarse leaves, which
/// the planner exploits to step across large free volumes in a single
/// expansion.
pub struct OcTree {
    resolution: f32,
    root: Option<OcNode>,
    bbx_min: OcTreeKey,
    bbx_max: OcTreeKey,
    num_inserts: usize,
}

impl OcTree {
    /// Constructs an empty tree with the given leaf-cell edge length in meters.
    pub fn new(resolution: f32) -> Self {
        Self {
            resolution,
            root: None,
            bbx_min: OcTreeKey::new(KEY_SPAN - 1, KEY_SPAN - 1, KEY_SPAN - 1),
            bbx_max: OcTreeKey::new(0, 0, 0),
            num_inserts: 0,
        }
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn is_empty(&self) -> bool {
        self.num_inserts == 0
    }

    /// Converts a world coordinate to the leaf-level key of the cell
    /// containing it. Returns None if the coordinate is outside the
    /// addressable range.
    pub fn coord_to_key(&self, coord: &Point3) -> Option<OcTreeKey> {
        let to_axis = |v: f32| -> Option<u32> {
            let k = (v / self.resolution).floor() as i64 + KEY_ORIGIN as i64;
            if k < 0 || k >= KEY_SPAN as i64 {
                None
            } else {
                Some(k as u32)
            }
        };
        Some(OcTreeKey::new(
            to_axis(coord.x)?,
            to_axis(coord.y)?,
            to_axis(coord.z)?,
        ))
    }

    /// Returns the center coordinate of the leaf-level cell at `key`.
    pub fn key_to_coord(&self, key: &OcTreeKey) -> Point3 {
        let axis = |k: u32| (k as i64 - KEY_ORIGIN as i64) as f32 * self.resolution
            + 0.5 * self.resolution;
        Point3::new(axis(key.x), axis(key.y), axis(key.z))
    }

    /// Returns the center coordinate of the cell covering `key` at the
    /// requested depth.
    pub fn key_to_coord_at_depth(&self, key: &OcTreeKey, depth: u8) -> Point3 {
        let corner = key.at_depth(depth);
        let half = 0.5 * self.node_size(depth);
        let axis = |k: u32| (k as i64 - KEY_ORIGIN as i64) as f32 * self.resolution + half;
        Point3::new(axis(corner.x), axis(corner.y), axis(corner.z))
    }

    /// Returns the edge length, in meters, of a cell at the given depth.
    pub fn node_size(&self, depth: u8) -> f32 {
        self.resolution * (1u32 << (MAX_DEPTH - depth)) as f32
    }

    /// Reports the occupancy state of the cell at `key`.
    pub fn state_at(&self, key: &OcTreeKey) -> CellState {
        match self.lookup(key) {
            Some((_, true)) => CellState::Occupied,
            Some((_, false)) => CellState::Free,
            None => CellState::Unknown,
        }
    }

    /// Returns the depth of the leaf covering `key`, or None if the cell
    /// is unknown. The leaf's edge length follows via [`OcTree::node_size`].
    pub fn depth_at(&self, key: &OcTreeKey) -> Option<u8> {
        self.lookup(key).map(|(depth, _)| depth)
    }

    fn lookup(&self, key: &OcTreeKey) -> Option<(u8, bool)> {
        let mut node = self.root.as_ref()?;
        let mut depth = 0u8;
        loop {
            match node {
                OcNode::Leaf(occupied) => return Some((depth, *occupied)),
                OcNode::Inner(children) => {
                    depth += 1;
                    node = children[key.child_index(depth)].as_ref()?;
                }
            }
        }
    }

    /// Sets the occupancy of the leaf-level cell at `key`, splitting any
    /// coarse leaf it disagrees with.
    pub fn insert(&mut self, key: OcTreeKey, occupied: bool) {
        self.bbx_min = OcTreeKey::new(
            self.bbx_min.x.min(key.x),
            self.bbx_min.y.min(key.y),
            self.bbx_min.z.min(key.z),
        );
        self.bbx_max = OcTreeKey::new(
            self.bbx_max.x.max(key.x),
            self.bbx_max.y.max(key.y),
            self.bbx_max.z.max(key.z),
        );
        self.num_inserts += 1;
        let root = self
            .root
            .get_or_insert_with(|| OcNode::Inner(empty_children()));
        Self::insert_rec(root, &key, 0, occupied);
    }

    fn insert_rec(node: &mut OcNode, key: &OcTreeKey, depth: u8, occupied: bool) {
        if depth == MAX_DEPTH {
            *node = OcNode::Leaf(occupied);
            return;
        }
        if let OcNode::Leaf(state) = node {
            if *state == occupied {
                // The covering leaf already agrees; nothing to split.
                return;
            }
            let filled = *state;
            let mut children = empty_children();
            for child in children.iter_mut() {
                *child = Some(OcNode::Leaf(filled));
            }
            *node = OcNode::Inner(children);
        }
        if let OcNode::Inner(children) = node {
            let idx = key.child_index(depth + 1);
            let child = children[idx].get_or_insert_with(|| {
                if depth + 1 == MAX_DEPTH {
                    OcNode::Leaf(occupied)
                } else {
                    OcNode::Inner(empty_children())
                }
            });
            Self::insert_rec(child, key, depth + 1, occupied);
        }
    }

    /// Merges fully-populated uniform octants into coarse leaves, bottom-up.
    pub fn prune(&mut self) {
        if let Some(root) = self.root.as_mut() {
            Self::prune_rec(root);
        }
    }

    fn prune_rec(node: &mut OcNode) {
        if let OcNode::Inner(children) = node {
            for child in children.iter_mut().flatten() {
                Self::prune_rec(child);
            }
            let mut uniform: Option<bool> = None;
            for child in children.iter() {
                match child {
                    Some(OcNode::Leaf(occupied)) => match uniform {
                        None => uniform = Some(*occupied),
                        Some(u) if u == *occupied => {}
                        _ => return,
                    },
                    _ => return,
                }
            }
            if let Some(occupied) = uniform {
                *node = OcNode::Leaf(occupied);
            }
        }
    }

    /// Collects all leaves of the tree.
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut out = Vec::new();
        if let Some(root) = self.root.as_ref() {
            Self::leaves_rec(root, OcTreeKey::new(0, 0, 0), 0, &mut out);
        }
        out
    }

    fn leaves_rec(node: &OcNode, key: OcTreeKey, depth: u8, out: &mut Vec<Leaf>) {
        match node {
            OcNode::Leaf(occupied) => out.push(Leaf {
                key,
                depth,
                occupied: *occupied,
            }),
            OcNode::Inner(children) => {
                let bit = MAX_DEPTH - depth - 1;
                for (idx, child) in children.iter().enumerate() {
                    if let Some(child) = child {
                        let child_key = OcTreeKey::new(
                            key.x | (((idx as u32) & 1) << bit),
                            key.y | ((((idx as u32) >> 1) & 1) << bit),
                            key.z | ((((idx as u32) >> 2) & 1) << bit),
                        );
                        Self::leaves_rec(child, child_key, depth + 1, out);
                    }
                }
            }
        }
    }

    /// Returns true if `key` lies within the bounding box of all inserted
    /// cells. Always false for an empty tree.
    pub fn in_bounds(&self, key: &OcTreeKey) -> bool {
        if self.is_empty() {
            return false;
        }
        key.x >= self.bbx_min.x
            && key.y >= self.bbx_min.y
            && key.z >= self.bbx_min.z
            && key.x <= self.bbx_max.x
            && key.y <= self.bbx_max.y
            && key.z <= self.bbx_max.z
    }

    /// Returns the world-space bounding box (cell centers) of all inserted
    /// cells, or None for an empty tree.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        if self.is_empty() {
            return None;
        }
        Some((
            self.key_to_coord(&self.bbx_min),
            self.key_to_coord(&self.bbx_max),
        ))
    }
}
