use crate::octree::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The outcome of a planning request. Every abnormal condition is encoded
/// here; `find_path` never returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanningResult {
    /// A full path ending at the exact requested goal was delivered.
    Complete,
    /// The goal's acceptance vicinity was reached, but the path ends at the
    /// nearest reachable cell center rather than the exact goal coordinate.
    GoalReached,
    /// The deadline expired (or an escape maneuver was produced); the path
    /// is a best-effort prefix toward the goal.
    Incomplete,
    /// The goal is blocked; the returned path targets a substitute goal.
    GoalInObstacle,
    /// No path exists in the working tree, or the request was degenerate.
    Failure,
}

impl PlanningResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PlanningResult::Complete | PlanningResult::GoalReached)
    }
}

impl fmt::Display for PlanningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanningResult::Complete => "Complete",
            PlanningResult::GoalReached => "GoalReached",
            PlanningResult::Incomplete => "Incomplete",
            PlanningResult::GoalInObstacle => "GoalInObstacle",
            PlanningResult::Failure => "Failure",
        };
        write!(f, "{}", s)
    }
}

/// Internal planning failures. These never escape the planner facade;
/// they are logged and mapped to [`PlanningResult::Failure`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("coordinate {0} is outside the addressable key range")]
    OutOfKeyRange(Point3),
    #[error("parent chain does not reach the start cell")]
    BrokenParentChain,
    #[error("start and goal are identical")]
    DegenerateRequest,
    #[error("the occupancy tree is empty")]
    EmptyTree,
}
