//! Execution context handed to command implementations

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::state::StateStore;
use crate::traits::{HardwareControl, LabwareProvider};

/// What a command can see and drive while it runs
///
/// State is read through short locks; nothing here holds a borrow of the
/// store across an `.await`.
pub struct CommandContext<'a, M: RawMutex, H: HardwareControl> {
    engine: &'a Engine<M>,
    pub(crate) hardware: &'a mut H,
    labware_provider: Option<&'a dyn LabwareProvider>,
}

impl<'a, M: RawMutex, H: HardwareControl> CommandContext<'a, M, H> {
    pub fn new(
        engine: &'a Engine<M>,
        hardware: &'a mut H,
        labware_provider: Option<&'a dyn LabwareProvider>,
    ) -> Self {
        Self {
            engine,
            hardware,
            labware_provider,
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        self.engine.read(f)
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub(crate) fn labware_provider(&self) -> Option<&'a dyn LabwareProvider> {
        self.labware_provider
    }
}
