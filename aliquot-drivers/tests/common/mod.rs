#![allow(dead_code)]

use aliquot_core::config::EngineConfig;
use aliquot_core::protocol::commands::{
    DropTipParams, DropTipTarget, LiquidHandlingParams, LoadLabwareParams, LoadPipetteParams,
    MoveToWellParams, MovementOptions, PickUpTipParams, TipSource,
};
use aliquot_core::protocol::{
    Command, CommandId, CommandParams, CommandStatus, DeckSlot, LabwareId, Mount, PipetteId,
    PipetteName, WellLocation,
};
use aliquot_core::Engine;
use aliquot_drivers::labware::STANDARD_NAMESPACE;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

pub type TestEngine = Engine<CriticalSectionRawMutex>;

pub const PIPETTE: &str = "pipette-left";

pub fn make_engine(config: EngineConfig) -> TestEngine {
    let engine = TestEngine::new(config);
    engine.play();
    engine
}

pub fn queue(engine: &TestEngine, params: CommandParams) -> CommandId {
    engine.add_command(params.into(), 0).unwrap()
}

pub fn command(engine: &TestEngine, id: &CommandId) -> Command {
    engine.read(|state| state.commands().get(id).cloned()).unwrap()
}

pub fn status(engine: &TestEngine, id: &CommandId) -> CommandStatus {
    command(engine, id).status
}

pub fn load_labware(load_name: &str, slot: u8, labware_id: &str) -> CommandParams {
    CommandParams::LoadLabware(LoadLabwareParams {
        load_name: load_name.into(),
        namespace: STANDARD_NAMESPACE.into(),
        version: 1,
        location: DeckSlot::new(slot).unwrap(),
        labware_id: Some(LabwareId::from(labware_id)),
        display_name: None,
        api_level: None,
    })
}

pub fn load_pipette(name: PipetteName, mount: Mount, tip_racks: &[&str]) -> CommandParams {
    CommandParams::LoadPipette(LoadPipetteParams {
        pipette_name: name,
        mount,
        pipette_id: None,
        tip_racks: tip_racks.iter().map(|id| LabwareId::from(*id)).collect(),
    })
}

pub fn pick_up_next(pipette_id: &str) -> CommandParams {
    CommandParams::PickUpTip(PickUpTipParams {
        pipette_id: PipetteId::from(pipette_id),
        source: TipSource::NextAvailable { starting_tip: None },
    })
}

pub fn drop_in_trash(pipette_id: &str) -> CommandParams {
    CommandParams::DropTip(DropTipParams {
        pipette_id: PipetteId::from(pipette_id),
        target: DropTipTarget::Well {
            labware_id: LabwareId::from("trash"),
            well_name: "A1".into(),
            well_location: WellLocation::top(),
        },
        home_after: false,
    })
}

pub fn aspirate(pipette_id: &str, well_name: &str, volume: f64) -> CommandParams {
    CommandParams::Aspirate(liquid(pipette_id, well_name, volume))
}

pub fn dispense(pipette_id: &str, well_name: &str, volume: f64) -> CommandParams {
    CommandParams::Dispense(liquid(pipette_id, well_name, volume))
}

fn liquid(pipette_id: &str, well_name: &str, volume: f64) -> LiquidHandlingParams {
    LiquidHandlingParams {
        pipette_id: PipetteId::from(pipette_id),
        labware_id: LabwareId::from("plate"),
        well_name: well_name.into(),
        well_location: WellLocation::bottom(1.0),
        volume,
        flow_rate: 92.86,
    }
}

pub fn move_to_well(pipette_id: &str, labware_id: &str, well_name: &str) -> CommandParams {
    CommandParams::MoveToWell(MoveToWellParams {
        pipette_id: PipetteId::from(pipette_id),
        labware_id: LabwareId::from(labware_id),
        well_name: well_name.into(),
        well_location: WellLocation::top(),
        movement: MovementOptions::default(),
    })
}

/// Tip rack, plate, trash and a single-channel P300 on the left mount
pub fn queue_standard_setup(engine: &TestEngine) {
    queue(engine, load_labware("tiprack_300ul", 1, "tiprack"));
    queue(engine, load_labware("wellplate_96_flat", 2, "plate"));
    queue(engine, load_labware("fixed_trash", 12, "trash"));
    queue(
        engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &["tiprack"]),
    );
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
