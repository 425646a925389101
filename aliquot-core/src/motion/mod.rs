//! Motion planning
//!
//! Arc planning between deck locations and the last-known-location cache
//! that seeds it.

pub mod location;
pub mod planner;

pub use location::{Location, LocationCache};
pub use planner::{
    plan_moves, LocationFact, MoveRequest, PlanningError, Waypoint, Waypoints, MAX_WAYPOINTS,
};
