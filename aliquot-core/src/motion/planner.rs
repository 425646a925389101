//! Arc motion planner
//!
//! A move between two locations either goes straight to the target or
//! follows an arc: rise to a safe travel height, translate, then descend.
//! The travel height clears every labware the move leaves or enters, plus
//! a configurable margin, and never exceeds the instrument's maximum height.

use alloc::string::String;

use heapless::Vec;

use aliquot_protocol::commands::MovementOptions;
use aliquot_protocol::{CriticalPoint, LabwareId, Point, WellRef};

use crate::config::MotionConfig;

/// Maximum waypoints in one planned move (rise, translate, descend)
pub const MAX_WAYPOINTS: usize = 3;

/// Planned path
pub type Waypoints = Vec<Waypoint, MAX_WAYPOINTS>;

/// Errors from motion planning
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PlanningError {
    /// Requested minimum travel height is above what the instrument can reach
    #[error("minimum z height {minimum_z_height} mm exceeds instrument max height {max_height} mm")]
    MinimumZAboveMaxHeight { minimum_z_height: f64, max_height: f64 },
    /// Target itself is above what the instrument can reach
    #[error("target z {z} mm exceeds instrument max height {max_height} mm")]
    TargetAboveMaxHeight { z: f64, max_height: f64 },
    /// Not even the minimum clearance fits under the instrument's max height
    #[error("safe travel height {required} mm exceeds instrument max height {max_height} mm")]
    CannotReachSafeHeight { required: f64, max_height: f64 },
}

/// One point of a planned path
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Waypoint {
    pub position: Point,
    /// Pipette reference point for this move; nozzle default when `None`
    pub critical_point: Option<CriticalPoint>,
}

impl Waypoint {
    pub const fn new(position: Point, critical_point: Option<CriticalPoint>) -> Self {
        Self {
            position,
            critical_point,
        }
    }
}

/// What the planner knows about one end of a move
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationFact {
    pub point: Point,
    pub labware_id: Option<LabwareId>,
    pub well_name: Option<String>,
    /// Highest point of the labware at this location
    pub labware_highest_z: Option<f64>,
    /// Top edge of the well at this location
    pub well_top_z: Option<f64>,
    pub critical_point: Option<CriticalPoint>,
}

impl LocationFact {
    /// A bare coordinate with no labware underneath
    pub fn free(point: Point) -> Self {
        Self {
            point,
            ..Self::default()
        }
    }

    /// A point inside a well
    pub fn in_well(point: Point, well: WellRef, labware_highest_z: f64, well_top_z: f64) -> Self {
        Self {
            point,
            labware_id: Some(well.labware_id),
            well_name: Some(well.well_name),
            labware_highest_z: Some(labware_highest_z),
            well_top_z: Some(well_top_z),
            critical_point: None,
        }
    }

    pub fn with_critical_point(mut self, critical_point: Option<CriticalPoint>) -> Self {
        self.critical_point = critical_point;
        self
    }

    /// Highest labware or well edge at this end of the move
    fn obstacle_z(&self) -> Option<f64> {
        [self.labware_highest_z, self.well_top_z]
            .into_iter()
            .flatten()
            .reduce(f64::max)
    }
}

/// A single move to plan
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub from: LocationFact,
    pub to: LocationFact,
    /// Both ends are in the same labware
    pub same_labware: bool,
    /// Both ends are in the same well
    pub same_well: bool,
    /// Highest reachable point for the moving instrument
    pub instrument_max_height: f64,
    /// Tallest labware on the deck; cleared when switching labware
    pub deck_highest_z: Option<f64>,
    pub force_direct: bool,
    pub minimum_z_height: Option<f64>,
}

impl MoveRequest {
    /// Build a request, deriving labware and well identity by value
    pub fn new(from: LocationFact, to: LocationFact, instrument_max_height: f64) -> Self {
        let same_labware = from.labware_id.is_some() && from.labware_id == to.labware_id;
        let same_well = same_labware && from.well_name.is_some() && from.well_name == to.well_name;
        Self {
            from,
            to,
            same_labware,
            same_well,
            instrument_max_height,
            deck_highest_z: None,
            force_direct: false,
            minimum_z_height: None,
        }
    }

    pub fn with_movement(mut self, movement: &MovementOptions) -> Self {
        self.force_direct = movement.force_direct;
        self.minimum_z_height = movement.minimum_z_height;
        self
    }

    pub fn with_deck_highest_z(mut self, z: Option<f64>) -> Self {
        self.deck_highest_z = z;
        self
    }
}

/// Plan the waypoints for a move
///
/// The returned path always ends at the target. Height limits are checked
/// even for direct moves.
pub fn plan_moves(request: &MoveRequest, config: &MotionConfig) -> Result<Waypoints, PlanningError> {
    let max_height = request.instrument_max_height;

    if let Some(minimum_z_height) = request.minimum_z_height {
        if minimum_z_height > max_height {
            return Err(PlanningError::MinimumZAboveMaxHeight {
                minimum_z_height,
                max_height,
            });
        }
    }
    if request.to.point.z > max_height {
        return Err(PlanningError::TargetAboveMaxHeight {
            z: request.to.point.z,
            max_height,
        });
    }

    let target = Waypoint::new(request.to.point, request.to.critical_point);
    let mut waypoints = Waypoints::new();

    if request.force_direct || request.same_well {
        let _ = waypoints.push(target);
        return Ok(waypoints);
    }

    // Never dip below either end on the way over.
    let travel_z = travel_height(request, config)?
        .max(request.from.point.z)
        .max(request.to.point.z)
        .min(max_height);
    trace!("arc travel height {} mm", travel_z);

    if request.from.point.z < travel_z {
        let _ = waypoints.push(Waypoint::new(
            request.from.point.with_z(travel_z),
            request.from.critical_point,
        ));
    }
    let _ = waypoints.push(Waypoint::new(
        request.to.point.with_z(travel_z),
        request.to.critical_point,
    ));
    if request.to.point.z < travel_z {
        let _ = waypoints.push(target);
    }
    Ok(waypoints)
}

/// Pick the lateral travel height for an arc
///
/// Falls back to the instrument's max height when the regular margin does
/// not fit but the minimum margin does.
fn travel_height(request: &MoveRequest, config: &MotionConfig) -> Result<f64, PlanningError> {
    let max_height = request.instrument_max_height;

    let deck_z = if request.same_labware {
        None
    } else {
        request.deck_highest_z
    };
    // The deck surface when nothing else is in the way
    let obstacle = [
        request.from.obstacle_z(),
        request.to.obstacle_z(),
        deck_z,
        request.minimum_z_height,
    ]
    .into_iter()
    .flatten()
    .fold(0.0, f64::max);

    let margin = if request.same_labware {
        config.well_z_margin
    } else {
        config.labware_z_margin
    };

    let preferred = obstacle + margin;
    if preferred <= max_height {
        return Ok(preferred);
    }

    let required = obstacle + config.minimum_labware_z_margin;
    if required <= max_height {
        debug!("travel height clamped to instrument max {} mm", max_height);
        Ok(max_height)
    } else {
        Err(PlanningError::CannotReachSafeHeight {
            required,
            max_height,
        })
    }
}
