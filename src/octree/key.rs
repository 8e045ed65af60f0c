use serde::{Deserialize, Serialize};

/// The depth of leaf cells in the octree. The tree addresses
/// `2^MAX_DEPTH` cells per axis at its native resolution.
pub const MAX_DEPTH: u8 = 16;

/// Number of addressable cells per axis.
pub(crate) const KEY_SPAN: u32 = 1 << MAX_DEPTH;

/// The key value corresponding to the world origin.
pub(crate) const KEY_ORIGIN: u32 = KEY_SPAN / 2;

/// A discrete cell address identifying a voxel at the tree's native
/// (deepest-level) resolution.
///
/// Two keys are equal iff all three coordinates match. The derived
/// lexicographic ordering is only used for deterministic tie-breaking,
/// it carries no spatial meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OcTreeKey {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl OcTreeKey {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Offsets the key by a signed number of leaf-level cells per axis.
    ///
    /// Returns None if the result would leave the addressable key range.
    pub fn offset(&self, dx: i64, dy: i64, dz: i64) -> Option<OcTreeKey> {
        let x = self.x as i64 + dx;
        let y = self.y as i64 + dy;
        let z = self.z as i64 + dz;
        let span = KEY_SPAN as i64;
        if x < 0 || y < 0 || z < 0 || x >= span || y >= span || z >= span {
            return None;
        }
        Some(OcTreeKey::new(x as u32, y as u32, z as u32))
    }

    /// Returns the child index (0..8) selected by this key at the given
    /// depth, where depth 1 selects among the root's children.
    pub(crate) fn child_index(&self, depth: u8) -> usize {
        let bit = MAX_DEPTH - depth;
        (((self.x >> bit) & 1) | (((self.y >> bit) & 1) << 1) | (((self.z >> bit) & 1) << 2))
            as usize
    }

    /// Masks the key down to the minimal corner of the cell covering it
    /// at the given depth.
    pub(crate) fn at_depth(&self, depth: u8) -> OcTreeKey {
        let level = MAX_DEPTH - depth;
        if level == 0 {
            return *self;
        }
        let mask = !((1u32 << level) - 1);
        OcTreeKey::new(self.x & mask, self.y & mask, self.z & mask)
    }
}
