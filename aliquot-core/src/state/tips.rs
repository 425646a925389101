//! Tip-rack state and view

use alloc::collections::BTreeMap;

use aliquot_protocol::{CommandParams, CommandResult, LabwareId, WellRef};

use crate::actions::{Action, CommandUpdate};
use crate::deck::tip_use_is_strict;
use crate::error::StateError;
use crate::tips::{next_available_tip, TipError, TipTracker};

#[derive(Debug, Clone, PartialEq)]
struct TipRack {
    tracker: TipTracker,
    /// Using an empty well is an error rather than a warning
    strict: bool,
}

/// Tip availability for every loaded tip rack
#[derive(Debug, Clone, Default)]
pub struct TipState {
    racks: BTreeMap<LabwareId, TipRack>,
}

impl TipState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handle_action(&mut self, action: &Action) {
        if let Action::UpdateCommand(update) = action {
            self.handle_command(update);
        }
    }

    fn handle_command(&mut self, update: &CommandUpdate) {
        match (&update.params, update.result()) {
            (CommandParams::LoadLabware(_), Some(CommandResult::LoadLabware(loaded))) => {
                if loaded.definition.is_tiprack {
                    self.racks.insert(
                        loaded.labware_id.clone(),
                        TipRack {
                            tracker: TipTracker::from_definition(&loaded.definition),
                            strict: tip_use_is_strict(loaded.api_level),
                        },
                    );
                }
            }
            (CommandParams::PickUpTip(_), Some(CommandResult::PickUpTip(picked))) => {
                let Some(rack) = self.racks.get_mut(&picked.tip.labware_id) else {
                    return;
                };
                let count = usize::from(picked.tip_count);
                if rack
                    .tracker
                    .use_tips(&picked.tip.well_name, count, rack.strict)
                    .is_err()
                {
                    error!("tip tracker out of sync picking up {}", picked.tip.well_name.as_str());
                }
            }
            (CommandParams::DropTip(_), Some(CommandResult::DropTip(dropped))) if dropped.returned => {
                let Some(well) = &dropped.dropped_into else {
                    return;
                };
                let Some(rack) = self.racks.get_mut(&well.labware_id) else {
                    return;
                };
                let count = usize::from(dropped.tip_count);
                if rack.tracker.return_tips(&well.well_name, count).is_err() {
                    error!("tip tracker out of sync returning {}", well.well_name.as_str());
                }
            }
            _ => {}
        }
    }

    /// Tracker for a loaded tip rack
    pub fn get_tracker(&self, labware_id: &LabwareId) -> Result<&TipTracker, StateError> {
        self.racks
            .get(labware_id)
            .map(|rack| &rack.tracker)
            .ok_or_else(|| StateError::NotATipRack(labware_id.clone()))
    }

    /// Whether using an empty well of this rack is an error
    pub fn is_strict(&self, labware_id: &LabwareId) -> Result<bool, StateError> {
        self.racks
            .get(labware_id)
            .map(|rack| rack.strict)
            .ok_or_else(|| StateError::NotATipRack(labware_id.clone()))
    }

    /// Whether a tip-rack well holds a tip; `None` for unknown wells
    pub fn has_tip(&self, well: &WellRef) -> Result<Option<bool>, StateError> {
        Ok(self.get_tracker(&well.labware_id)?.has_tip(&well.well_name))
    }

    /// Next usable run of `channels` tips across `tip_racks`, in order
    ///
    /// Ids that are not loaded tip racks are skipped.
    pub fn get_next_tip(
        &self,
        tip_racks: &[LabwareId],
        channels: usize,
        starting_tip: Option<&WellRef>,
    ) -> Result<WellRef, TipError> {
        let racks = tip_racks
            .iter()
            .filter_map(|id| self.racks.get(id).map(|rack| (id, &rack.tracker)));
        next_available_tip(starting_tip, racks, channels)
    }
}
