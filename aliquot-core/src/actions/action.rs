//! Action definitions

use alloc::string::String;

use aliquot_protocol::{
    CommandError, CommandId, CommandParams, CommandResult, HardwareEvent, LabwareDefinition,
    PauseSource,
};

use crate::deck::LabwareOffset;

/// Something that happened to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Start or resume working the queue
    Play,
    /// Stop starting new commands
    Pause { source: PauseSource },
    /// Abort the run; queued commands are discarded
    Stop { at: u64 },
    /// Finish the run, optionally because of an error; queued commands are
    /// discarded
    Finish {
        error: Option<CommandError>,
        at: u64,
    },
    /// Hardware has halted after a stop or finish
    HardwareStopped { at: u64 },
    /// Append a command to the queue
    QueueCommand {
        command_id: CommandId,
        key: String,
        params: CommandParams,
        created_at: u64,
    },
    /// A queued or running command changed status
    UpdateCommand(CommandUpdate),
    AddLabwareDefinition(LabwareDefinition),
    AddLabwareOffset(LabwareOffset),
    HardwareEvent(HardwareEvent),
}

/// Status change of one command
///
/// Carries the command's params so every handler can react without
/// looking the command up.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandUpdate {
    pub command_id: CommandId,
    pub params: CommandParams,
    pub transition: CommandTransition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandTransition {
    Running {
        started_at: u64,
    },
    Succeeded {
        result: CommandResult,
        completed_at: u64,
    },
    Failed {
        error: CommandError,
        completed_at: u64,
    },
}

impl CommandUpdate {
    pub fn running(command_id: CommandId, params: CommandParams, started_at: u64) -> Self {
        Self {
            command_id,
            params,
            transition: CommandTransition::Running { started_at },
        }
    }

    pub fn succeeded(
        command_id: CommandId,
        params: CommandParams,
        result: CommandResult,
        completed_at: u64,
    ) -> Self {
        Self {
            command_id,
            params,
            transition: CommandTransition::Succeeded {
                result,
                completed_at,
            },
        }
    }

    pub fn failed(
        command_id: CommandId,
        params: CommandParams,
        error: CommandError,
        completed_at: u64,
    ) -> Self {
        Self {
            command_id,
            params,
            transition: CommandTransition::Failed {
                error,
                completed_at,
            },
        }
    }

    /// Result of a successful command, if this update records one
    pub fn result(&self) -> Option<&CommandResult> {
        match &self.transition {
            CommandTransition::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl Action {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::Play => "play",
            Action::Pause { .. } => "pause",
            Action::Stop { .. } => "stop",
            Action::Finish { .. } => "finish",
            Action::HardwareStopped { .. } => "hardware_stopped",
            Action::QueueCommand { .. } => "queue_command",
            Action::UpdateCommand(_) => "update_command",
            Action::AddLabwareDefinition(_) => "add_labware_definition",
            Action::AddLabwareOffset(_) => "add_labware_offset",
            Action::HardwareEvent(_) => "hardware_event",
        }
    }
}
