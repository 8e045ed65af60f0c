//! Real-time 3D path planning over occupancy octrees.
//!
//! Given a start and goal position and an occupancy snapshot, the planner
//! derives a safety-inflated working tree, runs an A* search with
//! depth-dependent step sizes over it, and post-processes the result into a
//! sparse, corridor-safe waypoint sequence. Degenerate situations (goal
//! inside an obstacle, start too close to a surface, deadline expiry)
//! degrade gracefully into substitute goals, escape maneuvers or partial
//! paths, reported through [`planner::PlanningResult`].

pub mod octree;
pub mod planner;
pub mod util;

pub use octree::{CellState, OcTree, OcTreeKey, Point3};
pub use planner::{
    AstarPlanner, DistanceField, Node, NoopObserver, PlannerConfig, PlanningResult, SearchObserver,
};
