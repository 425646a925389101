//! Last-location state
//!
//! Records where each pipette ended up after every successful movement so
//! the planner can tell whether the next move stays in the same labware.
//! A failed movement-bearing command leaves the position unknown.

use alloc::collections::BTreeMap;

use aliquot_protocol::{CommandParams, CommandResult, Mount, PipetteId, WellRef};

use crate::actions::{Action, CommandTransition, CommandUpdate};
use crate::motion::{Location, LocationCache};

#[derive(Debug, Clone)]
pub struct MotionState {
    mounts: BTreeMap<PipetteId, Mount>,
    cache: LocationCache,
}

impl MotionState {
    pub fn new(per_mount: bool) -> Self {
        Self {
            mounts: BTreeMap::new(),
            cache: LocationCache::new(per_mount),
        }
    }

    pub(crate) fn handle_action(&mut self, action: &Action) {
        if let Action::UpdateCommand(update) = action {
            match &update.transition {
                CommandTransition::Succeeded { result, .. } => self.handle_success(update, result),
                CommandTransition::Failed { .. } => self.handle_failure(&update.params),
                CommandTransition::Running { .. } => {}
            }
        }
    }

    /// A failed command may have left the gantry anywhere along its path
    fn handle_failure(&mut self, params: &CommandParams) {
        if !params.moves_gantry() {
            return;
        }
        match params.pipette_id().and_then(|id| self.mounts.get(id)) {
            Some(&mount) => self.cache.forget(mount),
            None => self.cache.clear(),
        }
    }

    fn handle_success(&mut self, update: &CommandUpdate, result: &CommandResult) {
        if let (CommandParams::LoadPipette(params), CommandResult::LoadPipette(loaded)) =
            (&update.params, result)
        {
            self.mounts.insert(loaded.pipette_id.clone(), params.mount);
            return;
        }
        if matches!(result, CommandResult::Home) {
            self.cache.clear();
            return;
        }

        let (Some(pipette_id), Some(point)) = (update.params.pipette_id(), result.position()) else {
            return;
        };
        let Some(&mount) = self.mounts.get(pipette_id) else {
            return;
        };
        let location = match well_reached(&update.params, result) {
            Some(well) => Location::in_well(point, well),
            None => Location::free(point),
        };
        self.cache.set(mount, location);
    }

    /// Last location of the pipette on `mount`
    pub fn get_last_location(&self, mount: Mount) -> Option<&Location> {
        self.cache.get(mount)
    }

    pub fn is_per_mount(&self) -> bool {
        self.cache.is_per_mount()
    }
}

/// Well a successful command left the pipette in
fn well_reached(params: &CommandParams, result: &CommandResult) -> Option<WellRef> {
    match (params, result) {
        (CommandParams::Aspirate(p) | CommandParams::Dispense(p), _) => Some(p.well()),
        (CommandParams::BlowOut(p), _) => Some(WellRef::new(p.labware_id.clone(), p.well_name.clone())),
        (CommandParams::TouchTip(p), _) => Some(WellRef::new(p.labware_id.clone(), p.well_name.clone())),
        (CommandParams::MoveToWell(p), _) => Some(WellRef::new(p.labware_id.clone(), p.well_name.clone())),
        (_, CommandResult::PickUpTip(picked)) => Some(picked.tip.clone()),
        (_, CommandResult::DropTip(dropped)) => dropped.dropped_into.clone(),
        _ => None,
    }
}
