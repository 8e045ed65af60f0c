use crate::octree::{OcTree, OcTreeKey};
use crate::planner::Node;
use std::collections::HashSet;

/// Receives snapshots of the search for external introspection.
///
/// Both hooks are side-effect only and must not mutate search state. They
/// run synchronously on the planning thread; any time they spend still
/// counts against the search deadline.
pub trait SearchObserver {
    /// Invoked once per planning call with the freshly built working tree.
    fn on_tree_built(&mut self, _working_tree: &OcTree) {}

    /// Invoked periodically during expansion with the current open set,
    /// closed set and working tree.
    fn on_expansion(
        &mut self,
        _open: &[Node],
        _closed: &HashSet<OcTreeKey>,
        _working_tree: &OcTree,
    ) {
    }
}

/// An observer that ignores every notification.
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}
