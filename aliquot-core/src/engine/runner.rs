//! Command runner
//!
//! Takes one queued command at a time, marks it running, executes it and
//! records the outcome. A stop cancels the command in flight. A failed
//! command finishes the run unless the engine is configured to continue on
//! error; running out of tips always finishes it.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::{CommandErrorKind, CommandId};

use super::Engine;
use crate::actions::{Action, CommandUpdate};
use crate::commands::{execute, CommandContext};
use crate::error::ExecutionError;
use crate::traits::{Clock, HardwareControl, LabwareProvider};

/// Works an engine's queue against a hardware implementation
pub struct CommandRunner<'e, M: RawMutex, H: HardwareControl, C: Clock> {
    engine: &'e Engine<M>,
    hardware: H,
    clock: C,
    labware_provider: Option<&'e dyn LabwareProvider>,
}

impl<'e, M: RawMutex, H: HardwareControl, C: Clock> CommandRunner<'e, M, H, C> {
    pub fn new(engine: &'e Engine<M>, hardware: H, clock: C) -> Self {
        Self {
            engine,
            hardware,
            clock,
            labware_provider: None,
        }
    }

    /// Resolve labware definitions the engine was not given directly
    pub fn with_labware_provider(mut self, provider: &'e dyn LabwareProvider) -> Self {
        self.labware_provider = Some(provider);
        self
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn into_hardware(self) -> H {
        self.hardware
    }

    /// Execute the next queued command, if the run allows one
    ///
    /// Returns the id of the command that ran.
    pub async fn run_next(&mut self) -> Option<CommandId> {
        let engine = self.engine;
        let started_at = self.clock.now_ms();
        let (command_id, params) = engine.claim_next(started_at)?;
        info!(
            "running {} {}",
            params.command_type(),
            command_id.as_str()
        );

        // A stop already pending wins before the command touches hardware
        let outcome = {
            let mut ctx = CommandContext::new(engine, &mut self.hardware, self.labware_provider);
            match select(engine.stop_signal().wait(), execute(&mut ctx, &params)).await {
                Either::First(()) => Err(ExecutionError::Cancelled(
                    "run stopped while the command was running",
                )),
                Either::Second(outcome) => outcome,
            }
        };

        let now = self.clock.now_ms();
        match outcome {
            Ok(result) => {
                engine.dispatch(Action::UpdateCommand(CommandUpdate::succeeded(
                    command_id.clone(),
                    params,
                    result,
                    now,
                )));
            }
            Err(error) => {
                let kind = error.kind();
                let error = error.into_command_error(&command_id);
                warn!("command {} failed", command_id.as_str());
                engine.dispatch(Action::UpdateCommand(CommandUpdate::failed(
                    command_id.clone(),
                    params,
                    error.clone(),
                    now,
                )));

                let halts = kind.is_fatal_to_run() || !engine.config().continue_on_error;
                if kind != CommandErrorKind::Cancelled && halts {
                    engine.dispatch(Action::Finish {
                        error: Some(error),
                        at: now,
                    });
                }
            }
        }
        Some(command_id)
    }

    /// Execute commands until none can start, then settle the run
    ///
    /// Returns the number of commands executed. If a stop or finish is
    /// pending, the hardware is halted and the run moves to its final
    /// status.
    pub async fn run_until_idle(&mut self) -> usize {
        let mut executed = 0;
        while self.run_next().await.is_some() {
            executed += 1;
        }
        self.settle().await;
        executed
    }

    async fn settle(&mut self) {
        if !self.engine.read(|state| state.commands().needs_hardware_stop()) {
            return;
        }
        self.hardware.halt().await;
        self.engine.stop_signal().reset();
        info!("hardware stopped");
        self.engine.dispatch(Action::HardwareStopped {
            at: self.clock.now_ms(),
        });
    }
}
