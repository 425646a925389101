//! Command requests, lifecycle records and results
//!
//! Every command kind is a variant of [`CommandParams`] with a matching
//! variant of [`CommandResult`]. The set is closed: adding a command means
//! adding a variant here and an arm to the engine's exhaustive match.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::labware::LabwareDefinition;
use crate::types::{
    ApiVersion, CommandId, DeckSlot, LabwareId, MotorAxis, Mount, PipetteId, PipetteName, Point,
    StaticPipetteConfig, WellLocation, WellRef,
};

/// Command lifecycle status
///
/// Transitions only move forward: queued → running → succeeded | failed.
/// A queued command discarded by a stop goes straight to failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum CommandStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Succeeded | CommandStatus::Failed)
    }

    /// Check if moving to `next` keeps the one-way ordering
    pub fn can_transition_to(&self, next: CommandStatus) -> bool {
        use CommandStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Failed) | (Running, Succeeded) | (Running, Failed)
        )
    }
}

/// Options shared by movement-bearing commands
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MovementOptions {
    /// Skip arc planning and move in a straight line
    pub force_direct: bool,
    /// Lowest height allowed for lateral travel
    pub minimum_z_height: Option<f64>,
    /// Gantry speed override in mm/s
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadPipetteParams {
    pub pipette_name: PipetteName,
    pub mount: Mount,
    /// Caller-chosen id; generated when absent
    pub pipette_id: Option<PipetteId>,
    /// Tip racks used for automatic tip selection, in preference order
    pub tip_racks: Vec<LabwareId>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadLabwareParams {
    pub load_name: String,
    pub namespace: String,
    pub version: u32,
    pub location: DeckSlot,
    /// Caller-chosen id; generated when absent
    pub labware_id: Option<LabwareId>,
    pub display_name: Option<String>,
    /// API level the labware should follow; engine default when absent
    pub api_level: Option<ApiVersion>,
}

/// Liquid handling in a specific well
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LiquidHandlingParams {
    pub pipette_id: PipetteId,
    pub labware_id: LabwareId,
    pub well_name: String,
    pub well_location: WellLocation,
    pub volume: f64,
    /// Plunger flow rate in µL/s
    pub flow_rate: f64,
}

impl LiquidHandlingParams {
    pub fn well(&self) -> WellRef {
        WellRef::new(self.labware_id.clone(), self.well_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlowOutParams {
    pub pipette_id: PipetteId,
    pub labware_id: LabwareId,
    pub well_name: String,
    pub well_location: WellLocation,
    pub flow_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TouchTipParams {
    pub pipette_id: PipetteId,
    pub labware_id: LabwareId,
    pub well_name: String,
    /// Fraction of the well radius to touch at (0.0-1.0]
    pub radius: f64,
    /// Offset from the well top
    pub v_offset: f64,
    pub speed: Option<f64>,
}

/// Where a tip comes from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TipSource {
    /// A specific well
    Well { labware_id: LabwareId, well_name: String },
    /// The next run of available tips across the pipette's tip racks
    NextAvailable { starting_tip: Option<WellRef> },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PickUpTipParams {
    pub pipette_id: PipetteId,
    pub source: TipSource,
}

/// Where a tip goes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DropTipTarget {
    /// Into a well (trash, or any tip rack well)
    Well {
        labware_id: LabwareId,
        well_name: String,
        well_location: WellLocation,
    },
    /// Back into the tip rack well it was picked from
    ReturnToOrigin,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DropTipParams {
    pub pipette_id: PipetteId,
    pub target: DropTipTarget,
    pub home_after: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveToWellParams {
    pub pipette_id: PipetteId,
    pub labware_id: LabwareId,
    pub well_name: String,
    pub well_location: WellLocation,
    pub movement: MovementOptions,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveToCoordinatesParams {
    pub pipette_id: PipetteId,
    pub coordinates: Point,
    pub movement: MovementOptions,
}

/// Gantry axis for relative moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum MovementAxis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveRelativeParams {
    pub pipette_id: PipetteId,
    pub axis: MovementAxis,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomeParams {
    /// Axes to home; all axes when absent
    pub axes: Option<Vec<MotorAxis>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SetMovementSpeedParams {
    pub pipette_id: PipetteId,
    /// Speed in mm/s; `None` restores the default
    pub speed: Option<f64>,
}

/// Parameters of every command kind
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandParams {
    LoadPipette(LoadPipetteParams),
    LoadLabware(LoadLabwareParams),
    Aspirate(LiquidHandlingParams),
    Dispense(LiquidHandlingParams),
    BlowOut(BlowOutParams),
    TouchTip(TouchTipParams),
    PickUpTip(PickUpTipParams),
    DropTip(DropTipParams),
    MoveToWell(MoveToWellParams),
    MoveToCoordinates(MoveToCoordinatesParams),
    MoveRelative(MoveRelativeParams),
    Home(HomeParams),
    SetMovementSpeed(SetMovementSpeedParams),
}

impl CommandParams {
    /// Stable command type name
    pub fn command_type(&self) -> &'static str {
        match self {
            CommandParams::LoadPipette(_) => "loadPipette",
            CommandParams::LoadLabware(_) => "loadLabware",
            CommandParams::Aspirate(_) => "aspirate",
            CommandParams::Dispense(_) => "dispense",
            CommandParams::BlowOut(_) => "blowout",
            CommandParams::TouchTip(_) => "touchTip",
            CommandParams::PickUpTip(_) => "pickUpTip",
            CommandParams::DropTip(_) => "dropTip",
            CommandParams::MoveToWell(_) => "moveToWell",
            CommandParams::MoveToCoordinates(_) => "moveToCoordinates",
            CommandParams::MoveRelative(_) => "moveRelative",
            CommandParams::Home(_) => "home",
            CommandParams::SetMovementSpeed(_) => "setMovementSpeed",
        }
    }

    /// Whether executing this command can move the gantry
    pub fn moves_gantry(&self) -> bool {
        !matches!(
            self,
            CommandParams::LoadPipette(_)
                | CommandParams::LoadLabware(_)
                | CommandParams::SetMovementSpeed(_)
        )
    }

    /// Pipette this command acts on, if any
    pub fn pipette_id(&self) -> Option<&PipetteId> {
        match self {
            CommandParams::LoadPipette(p) => p.pipette_id.as_ref(),
            CommandParams::Aspirate(p) | CommandParams::Dispense(p) => Some(&p.pipette_id),
            CommandParams::BlowOut(p) => Some(&p.pipette_id),
            CommandParams::TouchTip(p) => Some(&p.pipette_id),
            CommandParams::PickUpTip(p) => Some(&p.pipette_id),
            CommandParams::DropTip(p) => Some(&p.pipette_id),
            CommandParams::MoveToWell(p) => Some(&p.pipette_id),
            CommandParams::MoveToCoordinates(p) => Some(&p.pipette_id),
            CommandParams::MoveRelative(p) => Some(&p.pipette_id),
            CommandParams::SetMovementSpeed(p) => Some(&p.pipette_id),
            CommandParams::LoadLabware(_) | CommandParams::Home(_) => None,
        }
    }
}

/// A request to queue a command
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandRequest {
    pub params: CommandParams,
    /// Correlation key; defaults to the generated command id
    pub key: Option<String>,
}

impl CommandRequest {
    pub fn new(params: CommandParams) -> Self {
        Self { params, key: None }
    }

    pub fn with_key(params: CommandParams, key: impl Into<String>) -> Self {
        Self {
            params,
            key: Some(key.into()),
        }
    }
}

impl From<CommandParams> for CommandRequest {
    fn from(params: CommandParams) -> Self {
        Self::new(params)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadPipetteResult {
    pub pipette_id: PipetteId,
    pub config: StaticPipetteConfig,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadLabwareResult {
    pub labware_id: LabwareId,
    pub definition: LabwareDefinition,
    /// Calibration offset applied at load time
    pub offset: Point,
    /// API level after clamping
    pub api_level: ApiVersion,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PickUpTipResult {
    /// First well of the picked run
    pub tip: WellRef,
    /// Number of tips picked (one per channel)
    pub tip_count: u8,
    pub tip_length: f64,
    /// Working volume of the attached tip
    pub tip_volume: f64,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DropTipResult {
    pub position: Point,
    pub tip_count: u8,
    /// Destination well, when the tip went into a labware well
    pub dropped_into: Option<WellRef>,
    /// Whether the destination was the tip's origin well
    pub returned: bool,
}

/// Results of every command kind
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandResult {
    LoadPipette(LoadPipetteResult),
    LoadLabware(LoadLabwareResult),
    Aspirate { volume: f64, position: Point },
    Dispense { volume: f64, position: Point },
    BlowOut { position: Point },
    TouchTip { position: Point },
    PickUpTip(PickUpTipResult),
    DropTip(DropTipResult),
    MoveToWell { position: Point },
    MoveToCoordinates { position: Point },
    MoveRelative { position: Point },
    Home,
    SetMovementSpeed { speed: Option<f64> },
}

impl CommandResult {
    /// Final pipette position, for commands that move
    pub fn position(&self) -> Option<Point> {
        match self {
            CommandResult::Aspirate { position, .. }
            | CommandResult::Dispense { position, .. }
            | CommandResult::BlowOut { position }
            | CommandResult::TouchTip { position }
            | CommandResult::MoveToWell { position }
            | CommandResult::MoveToCoordinates { position }
            | CommandResult::MoveRelative { position } => Some(*position),
            CommandResult::PickUpTip(r) => Some(r.position),
            CommandResult::DropTip(r) => Some(r.position),
            CommandResult::LoadPipette(_)
            | CommandResult::LoadLabware(_)
            | CommandResult::Home
            | CommandResult::SetMovementSpeed { .. } => None,
        }
    }
}

/// Broad category of a command failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum CommandErrorKind {
    /// The command would break a physical invariant (volume, tip state)
    InvariantViolation,
    /// A finite resource ran out; fatal to the run
    ResourceExhausted,
    /// The requested motion cannot be planned
    Planning,
    /// The hardware interface reported an error
    Hardware,
    /// A referenced pipette, labware, well or definition does not exist
    NotFound,
    /// The run was stopped before or while the command ran
    Cancelled,
}

impl CommandErrorKind {
    /// Check if this failure ends the run regardless of run policy
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, CommandErrorKind::ResourceExhausted)
    }
}

/// Failure recorded on a command
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandError {
    pub kind: CommandErrorKind,
    /// Human-readable detail
    pub detail: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

/// A command as recorded by the engine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Command {
    pub id: CommandId,
    /// Position in the queue, starting at 0
    pub index: u32,
    pub key: String,
    pub params: CommandParams,
    pub status: CommandStatus,
    pub result: Option<CommandResult>,
    pub error: Option<CommandError>,
    /// Milliseconds on the engine clock
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}
