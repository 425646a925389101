//! Engine error types
//!
//! [`StateError`] covers lookups against the state store. [`ExecutionError`]
//! is everything a command implementation can fail with; the runner turns
//! it into the [`CommandError`] recorded on the command.

use alloc::format;
use alloc::string::String;

use aliquot_protocol::{
    CommandError, CommandErrorKind, CommandId, DeckSlot, LabwareId, Mount, PipetteId, PipetteName,
    RunStatus,
};

use crate::motion::PlanningError;
use crate::tips::TipError;
use crate::traits::{HardwareError, MotionError, PipetteError};

/// Errors from state lookups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("pipette {0} is not loaded")]
    PipetteNotLoaded(PipetteId),
    #[error("labware {0} is not loaded")]
    LabwareNotLoaded(LabwareId),
    #[error("labware {labware_id} has no well {well_name}")]
    WellDoesNotExist {
        labware_id: LabwareId,
        well_name: String,
    },
    #[error("labware definition {0} not found")]
    DefinitionNotFound(String),
    #[error("command {0} not found")]
    CommandNotFound(CommandId),
    #[error("no pipette attached to the {0:?} mount")]
    PipetteNotAttached(Mount),
    #[error("{requested} was loaded but {attached} is attached to the {mount:?} mount")]
    PipetteMismatch {
        mount: Mount,
        requested: PipetteName,
        attached: PipetteName,
    },
    #[error("the {0:?} mount already has a pipette loaded")]
    MountOccupied(Mount),
    #[error("{0} is already loaded")]
    DuplicateId(String),
    #[error("pipette {0} has no tip attached")]
    NoTipAttached(PipetteId),
    #[error("labware {0} is not a tip rack")]
    NotATipRack(LabwareId),
    #[error("deck slot {0} is already occupied")]
    SlotOccupied(DeckSlot),
    #[error("commands cannot be queued while the run is {0:?}")]
    RunNotAcceptingCommands(RunStatus),
}

/// Errors from executing a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tip(#[from] TipError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),
    #[error("cannot {action}: pipette {pipette_id} has no tip")]
    NoTipAttached {
        pipette_id: PipetteId,
        action: &'static str,
    },
    #[error("cannot pick up a tip: pipette {0} already has one")]
    TipAlreadyAttached(PipetteId),
    #[error("invalid volume {0} µL")]
    InvalidVolume(f64),
    #[error("cannot aspirate {requested} µL: {available} µL of working volume left")]
    WorkingVolumeExceeded { requested: f64, available: f64 },
    #[error("cannot dispense {requested} µL: only {aspirated} µL aspirated")]
    InsufficientVolume { requested: f64, aspirated: f64 },
    #[error("cannot return tip: pipette {0} did not pick its tip from a rack")]
    TipOriginUnknown(PipetteId),
    #[error("invalid speed {0} mm/s")]
    InvalidSpeed(f64),
    #[error("touch radius {0} outside (0, 1]")]
    InvalidTouchRadius(f64),
    #[error("cancelled: {0}")]
    Cancelled(&'static str),
}

impl From<MotionError> for ExecutionError {
    fn from(e: MotionError) -> Self {
        ExecutionError::Hardware(e.into())
    }
}

impl From<PipetteError> for ExecutionError {
    fn from(e: PipetteError) -> Self {
        ExecutionError::Hardware(e.into())
    }
}

impl ExecutionError {
    /// Failure category recorded on the command
    pub fn kind(&self) -> CommandErrorKind {
        match self {
            ExecutionError::State(e) => match e {
                StateError::PipetteNotAttached(_) | StateError::PipetteMismatch { .. } => {
                    CommandErrorKind::Hardware
                }
                StateError::MountOccupied(_)
                | StateError::DuplicateId(_)
                | StateError::NoTipAttached(_)
                | StateError::NotATipRack(_)
                | StateError::SlotOccupied(_)
                | StateError::RunNotAcceptingCommands(_) => CommandErrorKind::InvariantViolation,
                StateError::PipetteNotLoaded(_)
                | StateError::LabwareNotLoaded(_)
                | StateError::WellDoesNotExist { .. }
                | StateError::DefinitionNotFound(_)
                | StateError::CommandNotFound(_) => CommandErrorKind::NotFound,
            },
            ExecutionError::Tip(e) => match e {
                TipError::OutOfTips { .. } => CommandErrorKind::ResourceExhausted,
                TipError::UnknownWell(_) => CommandErrorKind::NotFound,
                _ => CommandErrorKind::InvariantViolation,
            },
            ExecutionError::Planning(_) => CommandErrorKind::Planning,
            ExecutionError::Hardware(_) => CommandErrorKind::Hardware,
            ExecutionError::Cancelled(_) => CommandErrorKind::Cancelled,
            ExecutionError::NoTipAttached { .. }
            | ExecutionError::TipAlreadyAttached(_)
            | ExecutionError::InvalidVolume(_)
            | ExecutionError::InvalidSpeed(_)
            | ExecutionError::InvalidTouchRadius(_)
            | ExecutionError::WorkingVolumeExceeded { .. }
            | ExecutionError::InsufficientVolume { .. }
            | ExecutionError::TipOriginUnknown(_) => CommandErrorKind::InvariantViolation,
        }
    }

    /// Record this error against the command that raised it
    pub fn into_command_error(self, command_id: &CommandId) -> CommandError {
        CommandError {
            kind: self.kind(),
            detail: format!("command {command_id}: {self}"),
        }
    }
}
