//! Engine handle and command runner
//!
//! [`Engine`] owns the state store behind a blocking mutex. Clients queue
//! commands and steer the run through it; readers take a short lock and get
//! `&StateStore`. [`CommandRunner`] works the queue one command at a time
//! against a [`HardwareControl`](crate::traits::HardwareControl)
//! implementation.

mod runner;

pub use runner::CommandRunner;

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use aliquot_protocol::{
    CommandError, CommandId, CommandParams, CommandRequest, DeckSlot, HardwareEvent,
    LabwareDefinition, PauseSource, Point,
};

use crate::actions::{Action, ActionDispatcher, ActionHandler, CommandUpdate};
use crate::config::EngineConfig;
use crate::deck::LabwareOffset;
use crate::error::StateError;
use crate::state::StateStore;

/// Shared handle to a protocol run
///
/// All methods take `&self`; share the engine between tasks by reference
/// or in a `static`.
pub struct Engine<M: RawMutex> {
    dispatcher: Mutex<M, RefCell<ActionDispatcher<StateStore>>>,
    stop: Signal<M, ()>,
    config: EngineConfig,
}

impl<M: RawMutex> Engine<M> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            dispatcher: Mutex::new(RefCell::new(ActionDispatcher::new(StateStore::new(config)))),
            stop: Signal::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read state under the lock
    ///
    /// The lock is the same critical section a dispatch takes, so a writer
    /// waits for the closure to return. Keep the closure to lookups and
    /// copies: no awaiting, no I/O, no dispatching. Readers that need more
    /// time should take a [`snapshot`](Self::snapshot).
    pub fn read<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        self.dispatcher.lock(|cell| f(cell.borrow().store()))
    }

    /// Copy of the whole state, taken between two actions
    ///
    /// The lock is held only for the clone.
    pub fn snapshot(&self) -> StateStore {
        self.read(StateStore::clone)
    }

    /// Register an observer that sees every action after the store
    pub fn register_handler(&self, handler: Box<dyn ActionHandler + Send>) {
        self.dispatcher
            .lock(|cell| cell.borrow_mut().add_handler(handler));
    }

    /// Queue a command
    ///
    /// Returns the new command's id. Fails once the run is stopping or done.
    pub fn add_command(&self, request: CommandRequest, now: u64) -> Result<CommandId, StateError> {
        self.dispatcher.lock(|cell| {
            let mut dispatcher = cell.borrow_mut();
            let commands = dispatcher.store().commands();
            let status = commands.run_status();
            if !status.accepts_commands() {
                return Err(StateError::RunNotAcceptingCommands(status));
            }
            let command_id = CommandId::new(format!("command-{}", commands.count()));
            let key = request
                .key
                .unwrap_or_else(|| String::from(command_id.as_str()));
            debug!(
                "queue {} as {}",
                request.params.command_type(),
                command_id.as_str()
            );
            dispatcher.dispatch(&Action::QueueCommand {
                command_id: command_id.clone(),
                key,
                params: request.params,
                created_at: now,
            });
            Ok(command_id)
        })
    }

    /// Start or resume the run
    pub fn play(&self) {
        info!("play");
        self.dispatch(Action::Play);
    }

    /// Pause after the running command completes
    pub fn pause(&self) {
        info!("pause");
        self.dispatch(Action::Pause {
            source: PauseSource::Client,
        });
    }

    /// Stop the run
    ///
    /// Queued commands are discarded and the running command is cancelled.
    pub fn stop(&self, now: u64) {
        info!("stop requested");
        self.dispatch(Action::Stop { at: now });
        self.stop.signal(());
    }

    /// Finish the run
    ///
    /// Queued commands are discarded; the running command completes.
    pub fn finish(&self, error: Option<CommandError>, now: u64) {
        info!("finish requested");
        self.dispatch(Action::Finish { error, at: now });
    }

    /// Make a labware definition available to load commands
    ///
    /// Returns the definition's URI.
    pub fn add_labware_definition(&self, definition: LabwareDefinition) -> String {
        let uri = definition.uri();
        self.dispatch(Action::AddLabwareDefinition(definition));
        uri
    }

    /// Register a calibration offset for a definition placed in a slot
    ///
    /// Applies to labware loaded afterwards. Returns the offset's id.
    pub fn add_labware_offset(
        &self,
        definition_uri: impl Into<String>,
        location: DeckSlot,
        vector: Point,
    ) -> String {
        self.dispatcher.lock(|cell| {
            let mut dispatcher = cell.borrow_mut();
            let id = format!("offset-{}", dispatcher.store().labware().offset_count());
            dispatcher.dispatch(&Action::AddLabwareOffset(LabwareOffset {
                id: id.clone(),
                definition_uri: definition_uri.into(),
                location,
                vector,
            }));
            id
        })
    }

    /// Feed a raw hardware event into the run
    pub fn handle_hardware_event(&self, event: HardwareEvent, now: u64) {
        debug!("hardware event {}", event.to_byte());
        self.dispatch(Action::HardwareEvent(event));
        if event == HardwareEvent::EstopEngaged {
            self.stop(now);
        }
    }

    /// Mark the next executable command running and hand it out
    ///
    /// Selection and the running transition happen under one lock, so a
    /// stop can never discard a command the runner is about to execute.
    pub(crate) fn claim_next(&self, now: u64) -> Option<(CommandId, CommandParams)> {
        self.dispatcher.lock(|cell| {
            let mut dispatcher = cell.borrow_mut();
            let (command_id, params) = dispatcher
                .store()
                .commands()
                .get_next_to_execute()
                .map(|command| (command.id.clone(), command.params.clone()))?;
            dispatcher.dispatch(&Action::UpdateCommand(CommandUpdate::running(
                command_id.clone(),
                params.clone(),
                now,
            )));
            Some((command_id, params))
        })
    }

    pub(crate) fn dispatch(&self, action: Action) {
        self.dispatcher
            .lock(|cell| cell.borrow_mut().dispatch(&action));
    }

    pub(crate) fn stop_signal(&self) -> &Signal<M, ()> {
        &self.stop
    }
}
