//! Robot hardware interface
//!
//! Motion arrives already planned: the engine plans arcs and sends one
//! waypoint at a time. Pipette operations act on whatever pipette is on
//! the given mount.

use alloc::string::String;

use aliquot_protocol::{MotorAxis, Mount, PipetteName, Point};

use crate::motion::Waypoint;

/// Errors from gantry motion
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError {
    /// Position is outside the reachable work space
    #[error("position out of bounds (z {z} mm, max {max_height} mm)")]
    OutOfBounds { z: f64, max_height: f64 },
    /// Axis must be homed before moving
    #[error("axis {0:?} is not homed")]
    NotHomed(MotorAxis),
    /// Axis stalled during a move
    #[error("axis {0:?} stalled")]
    Stall(MotorAxis),
    /// Motion was halted
    #[error("motion halted")]
    Halted,
}

/// Errors from pipette actions
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipetteError {
    /// No pipette on the mount
    #[error("no pipette attached to the {0:?} mount")]
    NotAttached(Mount),
    /// Action needs a tip
    #[error("no tip attached to the {0:?} pipette")]
    NoTipAttached(Mount),
    /// Pick-up with a tip already attached
    #[error("the {0:?} pipette already has a tip")]
    TipAlreadyAttached(Mount),
    /// Plunger cannot hold the requested volume
    #[error("cannot hold {requested} µL, {available} µL available")]
    VolumeExceeded { requested: f64, available: f64 },
    /// Plunger is not at the bottom before an aspirate
    #[error("the {0:?} pipette is not prepared to aspirate")]
    NotReadyToAspirate(Mount),
}

/// Any hardware-interface error
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error(transparent)]
    Pipette(#[from] PipetteError),
}

/// Pipette as reported by the hardware
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipetteHardwareInfo {
    /// Name the hardware identifies the pipette as
    pub name: PipetteName,
    /// Full model string
    pub model: String,
    pub min_volume: f64,
    pub max_volume: f64,
    pub channels: u8,
    pub has_tip: bool,
    /// Plunger has been moved to the bottom and can aspirate
    pub ready_to_aspirate: bool,
    /// Liquid currently held
    pub current_volume: f64,
}

/// Robot hardware controller
///
/// Called identically for real runs and simulated analysis.
#[allow(async_fn_in_trait)]
pub trait HardwareControl {
    /// Move the pipette on `mount` to a waypoint
    ///
    /// `speed` is in mm/s; `None` uses the hardware default.
    async fn move_to(
        &mut self,
        mount: Mount,
        waypoint: Waypoint,
        speed: Option<f64>,
    ) -> Result<(), MotionError>;

    /// Home the given axes, or all axes when `None`
    async fn home(&mut self, axes: Option<&[MotorAxis]>) -> Result<(), MotionError>;

    /// Move the plunger to the bottom so the next aspirate is accurate
    ///
    /// Must happen outside of liquid.
    async fn prepare_for_aspirate(&mut self, mount: Mount) -> Result<(), PipetteError>;

    /// Draw `volume` µL at `flow_rate` µL/s
    async fn aspirate(&mut self, mount: Mount, volume: f64, flow_rate: f64)
        -> Result<(), PipetteError>;

    /// Expel `volume` µL at `flow_rate` µL/s
    async fn dispense(&mut self, mount: Mount, volume: f64, flow_rate: f64)
        -> Result<(), PipetteError>;

    /// Expel everything, including the air gap
    async fn blow_out(&mut self, mount: Mount, flow_rate: f64) -> Result<(), PipetteError>;

    /// Press onto a tip at the current position
    ///
    /// `tip_volume` caps the working volume of the attached tip.
    async fn pick_up_tip(
        &mut self,
        mount: Mount,
        tip_length: f64,
        tip_volume: f64,
    ) -> Result<(), PipetteError>;

    /// Eject the attached tip at the current position
    async fn drop_tip(&mut self, mount: Mount, home_after: bool) -> Result<(), PipetteError>;

    /// Stop all motion as soon as possible
    async fn halt(&mut self);

    /// Pipette currently attached to `mount`
    fn get_attached_pipette(&self, mount: Mount) -> Option<PipetteHardwareInfo>;

    /// Highest point the pipette on `mount` can reach, in deck coordinates
    fn instrument_max_height(&self, mount: Mount) -> f64;

    /// Current position of the pipette on `mount`, in deck coordinates
    fn gantry_position(&self, mount: Mount) -> Point;
}
