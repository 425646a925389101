//! Shared fixtures for unit tests

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_protocol::commands::{
    LoadLabwareParams, LoadLabwareResult, LoadPipetteParams, LoadPipetteResult,
};
use aliquot_protocol::{
    CommandParams, CommandResult, DeckSlot, LabwareDefinition, LabwareId, Mount, PipetteId,
    PipetteName, Point, StaticPipetteConfig, WellDefinition,
};

use crate::deck::IGNORE_API_VERSION_BREAKPOINT;

pub const TIP_LENGTH: f64 = 51.0;
pub const TIP_RACK_HEIGHT: f64 = 64.0;
pub const PLATE_HEIGHT: f64 = 14.5;

const ROWS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

fn grid(load_name: &str, z: f64, depth: f64, volume: f64) -> LabwareDefinition {
    let mut wells = BTreeMap::new();
    let mut ordering = Vec::new();
    for column in 0..12 {
        let mut names = Vec::new();
        for (row, letter) in ROWS.iter().enumerate() {
            let name = format!("{letter}{}", column + 1);
            wells.insert(
                name.clone(),
                WellDefinition {
                    x: 14.4 + 9.0 * column as f64,
                    y: 74.2 - 9.0 * row as f64,
                    z,
                    depth,
                    total_liquid_volume: volume,
                    diameter: Some(5.5),
                    x_dimension: None,
                    y_dimension: None,
                },
            );
            names.push(name);
        }
        ordering.push(names);
    }
    LabwareDefinition {
        namespace: String::from("aliquot"),
        load_name: String::from(load_name),
        version: 1,
        display_name: String::from(load_name),
        ordering,
        wells,
        z_dimension: z + depth,
        is_tiprack: false,
        tip_length: None,
        quirks: Vec::new(),
    }
}

pub fn tip_rack_definition() -> LabwareDefinition {
    let mut definition = grid("tiprack_300ul", TIP_RACK_HEIGHT - 59.5, 59.5, 300.0);
    definition.is_tiprack = true;
    definition.tip_length = Some(TIP_LENGTH);
    definition
}

pub fn plate_definition() -> LabwareDefinition {
    grid("plate_96", PLATE_HEIGHT - 10.0, 10.0, 200.0)
}

pub fn load_labware_success(
    labware_id: &str,
    slot: u8,
    definition: LabwareDefinition,
) -> (CommandParams, CommandResult) {
    let params = LoadLabwareParams {
        load_name: definition.load_name.clone(),
        namespace: definition.namespace.clone(),
        version: definition.version,
        location: DeckSlot::new(slot).unwrap(),
        labware_id: Some(LabwareId::from(labware_id)),
        display_name: None,
        api_level: None,
    };
    let result = LoadLabwareResult {
        labware_id: LabwareId::from(labware_id),
        definition,
        offset: Point::ZERO,
        api_level: IGNORE_API_VERSION_BREAKPOINT,
    };
    (
        CommandParams::LoadLabware(params),
        CommandResult::LoadLabware(result),
    )
}

pub fn load_pipette_success(
    pipette_id: &str,
    name: PipetteName,
    mount: Mount,
    tip_racks: &[&str],
) -> (CommandParams, CommandResult) {
    let params = LoadPipetteParams {
        pipette_name: name,
        mount,
        pipette_id: Some(PipetteId::from(pipette_id)),
        tip_racks: tip_racks.iter().map(|id| LabwareId::from(*id)).collect(),
    };
    let result = LoadPipetteResult {
        pipette_id: PipetteId::from(pipette_id),
        config: StaticPipetteConfig {
            model: format!("{}_v2.0", name.as_str()),
            min_volume: 20.0,
            max_volume: 300.0,
            channels: name.channels(),
        },
    };
    (
        CommandParams::LoadPipette(params),
        CommandResult::LoadPipette(result),
    )
}
