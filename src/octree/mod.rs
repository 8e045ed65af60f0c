pub mod key;
pub mod point;
pub mod tree;

pub use key::{OcTreeKey, MAX_DEPTH};
pub use point::Point3;
pub use tree::{CellState, Leaf, OcTree};
