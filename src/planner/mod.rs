pub mod astar;
pub mod config;
pub mod distance_field;
pub mod escape;
mod node;
pub mod observer;
pub mod planning_tree;
pub mod postprocess;
pub mod result;

pub use astar::AstarPlanner;
pub use config::PlannerConfig;
pub use distance_field::DistanceField;
pub use node::Node;
pub use observer::{NoopObserver, SearchObserver};
pub use planning_tree::create_planning_tree;
pub use postprocess::free_straight_path;
pub use result::{PlanningError, PlanningResult};
