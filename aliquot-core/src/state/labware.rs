//! Labware state and view
//!
//! Holds known definitions (by URI), loaded labware instances and
//! calibration offsets. Geometry queries resolve through here.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_protocol::{
    CommandParams, CommandResult, DeckSlot, LabwareDefinition, LabwareId, Point, WellLocation,
};

use crate::actions::{Action, CommandUpdate};
use crate::deck::{LabwareOffset, LoadedLabware};
use crate::error::StateError;

/// Everything known about labware
#[derive(Debug, Clone, Default)]
pub struct LabwareState {
    definitions_by_uri: BTreeMap<String, LabwareDefinition>,
    labware_by_id: BTreeMap<LabwareId, LoadedLabware>,
    offsets: Vec<LabwareOffset>,
}

impl LabwareState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handle_action(&mut self, action: &Action) {
        match action {
            Action::AddLabwareDefinition(definition) => {
                self.definitions_by_uri
                    .insert(definition.uri(), definition.clone());
            }
            Action::AddLabwareOffset(offset) => self.offsets.push(offset.clone()),
            Action::UpdateCommand(update) => self.handle_command(update),
            _ => {}
        }
    }

    fn handle_command(&mut self, update: &CommandUpdate) {
        let (CommandParams::LoadLabware(params), Some(CommandResult::LoadLabware(result))) =
            (&update.params, update.result())
        else {
            return;
        };
        let uri = result.definition.uri();
        self.definitions_by_uri
            .entry(uri.clone())
            .or_insert_with(|| result.definition.clone());
        self.labware_by_id.insert(
            result.labware_id.clone(),
            LoadedLabware {
                id: result.labware_id.clone(),
                definition_uri: uri,
                location: params.location,
                offset: result.offset,
                display_name: params.display_name.clone(),
                api_level: result.api_level,
            },
        );
    }

    /// Loaded labware by id
    pub fn get(&self, labware_id: &LabwareId) -> Result<&LoadedLabware, StateError> {
        self.labware_by_id
            .get(labware_id)
            .ok_or_else(|| StateError::LabwareNotLoaded(labware_id.clone()))
    }

    pub fn get_all(&self) -> impl Iterator<Item = &LoadedLabware> {
        self.labware_by_id.values()
    }

    pub fn count(&self) -> usize {
        self.labware_by_id.len()
    }

    /// Labware occupying a slot, if any
    pub fn get_in_slot(&self, slot: DeckSlot) -> Option<&LoadedLabware> {
        self.labware_by_id.values().find(|lw| lw.location == slot)
    }

    pub fn get_definition_by_uri(&self, uri: &str) -> Result<&LabwareDefinition, StateError> {
        self.definitions_by_uri
            .get(uri)
            .ok_or_else(|| StateError::DefinitionNotFound(String::from(uri)))
    }

    /// Definition of a loaded labware
    pub fn get_definition(&self, labware_id: &LabwareId) -> Result<&LabwareDefinition, StateError> {
        let labware = self.get(labware_id)?;
        self.get_definition_by_uri(&labware.definition_uri)
    }

    pub fn offset_count(&self) -> usize {
        self.offsets.len()
    }

    /// Most recently added offset for a definition in a slot
    pub fn find_offset(&self, definition_uri: &str, slot: DeckSlot) -> Option<&LabwareOffset> {
        self.offsets
            .iter()
            .rev()
            .find(|o| o.definition_uri == definition_uri && o.location == slot)
    }

    pub fn is_tiprack(&self, labware_id: &LabwareId) -> Result<bool, StateError> {
        Ok(self.get_definition(labware_id)?.is_tiprack)
    }

    /// Length of the tips held by a tip rack
    pub fn get_tip_length(&self, labware_id: &LabwareId) -> Result<f64, StateError> {
        let definition = self.get_definition(labware_id)?;
        match (definition.is_tiprack, definition.tip_length) {
            (true, Some(length)) => Ok(length),
            _ => Err(StateError::NotATipRack(labware_id.clone())),
        }
    }

    /// Maximum volume of one tip from a tip rack
    pub fn get_tip_volume(&self, labware_id: &LabwareId) -> Result<f64, StateError> {
        let definition = self.get_definition(labware_id)?;
        if !definition.is_tiprack {
            return Err(StateError::NotATipRack(labware_id.clone()));
        }
        Ok(definition
            .wells_in_order()
            .next()
            .and_then(|name| definition.well(name))
            .map(|well| well.total_liquid_volume)
            .unwrap_or(0.0))
    }

    /// Absolute position of a location inside a well
    pub fn get_well_position(
        &self,
        labware_id: &LabwareId,
        well_name: &str,
        location: &WellLocation,
    ) -> Result<Point, StateError> {
        let labware = self.get(labware_id)?;
        let definition = self.get_definition_by_uri(&labware.definition_uri)?;
        labware
            .well_position(definition, well_name, location)
            .ok_or_else(|| well_missing(labware_id, well_name))
    }

    /// Check a well exists in a loaded labware
    pub fn validate_well(&self, labware_id: &LabwareId, well_name: &str) -> Result<(), StateError> {
        match self.get_definition(labware_id)?.well(well_name) {
            Some(_) => Ok(()),
            None => Err(well_missing(labware_id, well_name)),
        }
    }

    pub fn get_well_top_z(&self, labware_id: &LabwareId, well_name: &str) -> Result<f64, StateError> {
        self.get_well_position(labware_id, well_name, &WellLocation::top())
            .map(|p| p.z)
    }

    /// Highest point of a loaded labware
    pub fn get_highest_z(&self, labware_id: &LabwareId) -> Result<f64, StateError> {
        let labware = self.get(labware_id)?;
        let definition = self.get_definition_by_uri(&labware.definition_uri)?;
        Ok(labware.highest_z(definition))
    }

    /// Highest point of anything on the deck, `None` on an empty deck
    pub fn get_deck_highest_z(&self) -> Option<f64> {
        self.labware_by_id
            .values()
            .filter_map(|lw| {
                self.definitions_by_uri
                    .get(&lw.definition_uri)
                    .map(|def| lw.highest_z(def))
            })
            .reduce(f64::max)
    }

    /// Whether multichannel pipettes center on this labware's wells
    pub fn centers_multichannel(&self, labware_id: &LabwareId) -> Result<bool, StateError> {
        Ok(self.get_definition(labware_id)?.center_multichannel_on_wells())
    }
}

fn well_missing(labware_id: &LabwareId, well_name: &str) -> StateError {
    StateError::WellDoesNotExist {
        labware_id: labware_id.clone(),
        well_name: String::from(well_name),
    }
}
