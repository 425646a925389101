//! Command queue and run status
//!
//! Commands are kept in queue order. At most one command runs at a time.
//! Run status moves through the lifecycle in [`RunStatus`]; stop and finish
//! discard everything still queued.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_protocol::{
    Command, CommandError, CommandErrorKind, CommandId, CommandStatus, HardwareEvent, PauseSource,
    RunStatus,
};

use crate::actions::{Action, CommandTransition, CommandUpdate};
use crate::error::StateError;

/// Command records and run lifecycle
#[derive(Debug, Clone)]
pub struct CommandState {
    commands: Vec<Command>,
    index_by_id: BTreeMap<CommandId, usize>,
    queue: VecDeque<CommandId>,
    running: Option<CommandId>,
    run_status: RunStatus,
    run_error: Option<CommandError>,
    run_completed_at: Option<u64>,
    door_open: bool,
    door_safety_enabled: bool,
}

impl CommandState {
    pub fn new(door_safety_enabled: bool) -> Self {
        Self {
            commands: Vec::new(),
            index_by_id: BTreeMap::new(),
            queue: VecDeque::new(),
            running: None,
            run_status: RunStatus::Idle,
            run_error: None,
            run_completed_at: None,
            door_open: false,
            door_safety_enabled,
        }
    }

    pub(crate) fn handle_action(&mut self, action: &Action) {
        match action {
            Action::QueueCommand {
                command_id,
                key,
                params,
                created_at,
            } => {
                let index = self.commands.len();
                self.commands.push(Command {
                    id: command_id.clone(),
                    index: index as u32,
                    key: key.clone(),
                    params: params.clone(),
                    status: CommandStatus::Queued,
                    result: None,
                    error: None,
                    created_at: *created_at,
                    started_at: None,
                    completed_at: None,
                });
                self.index_by_id.insert(command_id.clone(), index);
                self.queue.push_back(command_id.clone());
            }
            Action::UpdateCommand(update) => self.handle_update(update),
            Action::Play => self.play(),
            Action::Pause { source } => self.pause(*source),
            Action::Stop { at } => {
                if self.run_status.accepts_commands() {
                    self.run_status = RunStatus::StopRequested;
                    self.discard_queue(*at, "run stopped before the command started");
                }
            }
            Action::Finish { error, at } => {
                if self.run_status.accepts_commands() {
                    self.run_status = RunStatus::Finishing;
                    self.run_error = error.clone();
                    self.discard_queue(*at, "run finished before the command started");
                }
            }
            Action::HardwareStopped { at } => {
                self.run_status = match self.run_status {
                    RunStatus::StopRequested => RunStatus::Stopped,
                    RunStatus::Finishing if self.run_error.is_some() => RunStatus::Failed,
                    RunStatus::Finishing => RunStatus::Succeeded,
                    other => {
                        warn!("hardware stopped while run was {}", status_name(other));
                        return;
                    }
                };
                self.run_completed_at = Some(*at);
            }
            Action::HardwareEvent(event) => self.handle_hardware_event(*event),
            Action::AddLabwareDefinition(_) | Action::AddLabwareOffset(_) => {}
        }
    }

    fn handle_update(&mut self, update: &CommandUpdate) {
        let Some(&index) = self.index_by_id.get(&update.command_id) else {
            warn!("update for unknown command {}", update.command_id.as_str());
            return;
        };
        let command = &mut self.commands[index];
        let next = match update.transition {
            CommandTransition::Running { .. } => CommandStatus::Running,
            CommandTransition::Succeeded { .. } => CommandStatus::Succeeded,
            CommandTransition::Failed { .. } => CommandStatus::Failed,
        };
        if !command.status.can_transition_to(next) {
            warn!(
                "ignoring backward transition of command {}",
                update.command_id.as_str()
            );
            return;
        }
        command.status = next;

        match &update.transition {
            CommandTransition::Running { started_at } => {
                command.started_at = Some(*started_at);
                self.queue.retain(|id| *id != update.command_id);
                self.running = Some(update.command_id.clone());
            }
            CommandTransition::Succeeded {
                result,
                completed_at,
            } => {
                command.result = Some(result.clone());
                command.completed_at = Some(*completed_at);
                self.running = None;
            }
            CommandTransition::Failed {
                error,
                completed_at,
            } => {
                command.error = Some(error.clone());
                command.completed_at = Some(*completed_at);
                self.queue.retain(|id| *id != update.command_id);
                if self.running.as_ref() == Some(&update.command_id) {
                    self.running = None;
                }
            }
        }
    }

    fn play(&mut self) {
        let door_blocks = self.door_open && self.door_safety_enabled;
        self.run_status = match self.run_status {
            RunStatus::Idle | RunStatus::Paused | RunStatus::BlockedByOpenDoor if door_blocks => {
                RunStatus::BlockedByOpenDoor
            }
            RunStatus::Idle | RunStatus::Paused | RunStatus::BlockedByOpenDoor => RunStatus::Running,
            other => other,
        };
    }

    fn pause(&mut self, source: PauseSource) {
        self.run_status = match (self.run_status, source) {
            (RunStatus::Running, PauseSource::Client) => RunStatus::Paused,
            (RunStatus::Running | RunStatus::Paused, PauseSource::Door) => {
                RunStatus::BlockedByOpenDoor
            }
            (other, _) => other,
        };
    }

    fn handle_hardware_event(&mut self, event: HardwareEvent) {
        match event {
            HardwareEvent::DoorOpened => {
                self.door_open = true;
                if self.door_safety_enabled {
                    self.pause(PauseSource::Door);
                }
            }
            HardwareEvent::DoorClosed => self.door_open = false,
            HardwareEvent::EstopEngaged => {
                if self.run_error.is_none() {
                    self.run_error = Some(CommandError {
                        kind: CommandErrorKind::Hardware,
                        detail: String::from("emergency stop engaged"),
                    });
                }
            }
        }
    }

    fn discard_queue(&mut self, at: u64, reason: &str) {
        for id in self.queue.drain(..) {
            if let Some(&index) = self.index_by_id.get(&id) {
                let command = &mut self.commands[index];
                command.status = CommandStatus::Failed;
                command.completed_at = Some(at);
                command.error = Some(CommandError {
                    kind: CommandErrorKind::Cancelled,
                    detail: String::from(reason),
                });
            }
        }
    }

    pub fn get(&self, command_id: &CommandId) -> Result<&Command, StateError> {
        self.index_by_id
            .get(command_id)
            .map(|&index| &self.commands[index])
            .ok_or_else(|| StateError::CommandNotFound(command_id.clone()))
    }

    /// Every command in queue order
    pub fn get_all(&self) -> &[Command] {
        &self.commands
    }

    pub fn count(&self) -> usize {
        self.commands.len()
    }

    pub fn get_running(&self) -> Option<&Command> {
        self.running.as_ref().and_then(|id| self.get(id).ok())
    }

    /// Commands still waiting, in queue order
    pub fn get_queued(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter().filter_map(|id| self.get(id).ok())
    }

    /// The command to start next, if the run allows starting one
    pub fn get_next_to_execute(&self) -> Option<&Command> {
        if !self.run_status.is_running() || self.running.is_some() {
            return None;
        }
        self.queue.front().and_then(|id| self.get(id).ok())
    }

    pub fn run_status(&self) -> RunStatus {
        self.run_status
    }

    /// Error that ended the run, if any
    pub fn run_error(&self) -> Option<&CommandError> {
        self.run_error.as_ref()
    }

    pub fn run_completed_at(&self) -> Option<u64> {
        self.run_completed_at
    }

    pub fn is_door_open(&self) -> bool {
        self.door_open
    }

    /// Whether the runner must halt the hardware before the run can end
    pub fn needs_hardware_stop(&self) -> bool {
        matches!(
            self.run_status,
            RunStatus::StopRequested | RunStatus::Finishing
        ) && self.running.is_none()
    }
}

fn status_name(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Idle => "idle",
        RunStatus::Running => "running",
        RunStatus::Paused => "paused",
        RunStatus::BlockedByOpenDoor => "blocked-by-open-door",
        RunStatus::StopRequested => "stop-requested",
        RunStatus::Stopped => "stopped",
        RunStatus::Finishing => "finishing",
        RunStatus::Failed => "failed",
        RunStatus::Succeeded => "succeeded",
    }
}
