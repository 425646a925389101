//! Movement through the planner, as seen by the simulated robot

mod common;

use aliquot_core::config::EngineConfig;
use aliquot_core::protocol::commands::{
    HomeParams, MoveRelativeParams, MoveToCoordinatesParams, MovementAxis, MovementOptions,
    SetMovementSpeedParams, TouchTipParams,
};
use aliquot_core::protocol::{
    ApiVersion, CommandErrorKind, CommandParams, CommandResult, CommandStatus, CriticalPoint,
    DeckSlot, LabwareId, Mount, PipetteId, PipetteName, Point, RunStatus, WellLocation,
};
use aliquot_core::protocol::commands::LiquidHandlingParams;
use aliquot_core::traits::{HardwareControl, PipetteError};
use aliquot_core::CommandRunner;
use aliquot_drivers::simulator::RecordedMove;
use aliquot_drivers::{InMemoryLabwareProvider, ManualClock, SimulatedHardware};
use embassy_futures::block_on;

use common::*;

// Standard plate in slot 2, well A1
const PLATE_A1_X: f64 = 132.5 + 14.38;
const PLATE_A1_Y: f64 = 74.24;
const PLATE_TOP: f64 = 14.0;
const TIPRACK_TOP: f64 = 64.0;

fn make_hardware() -> SimulatedHardware {
    SimulatedHardware::new().with_pipette(Mount::Left, PipetteName::P300SingleGen2)
}

fn heights(moves: &[RecordedMove]) -> Vec<f64> {
    moves.iter().map(|m| m.waypoint.position.z).collect()
}

fn move_to(pipette_id: &str, coordinates: Point, movement: MovementOptions) -> CommandParams {
    CommandParams::MoveToCoordinates(MoveToCoordinatesParams {
        pipette_id: PipetteId::from(pipette_id),
        coordinates,
        movement,
    })
}

#[test]
fn test_arcs_between_and_within_labware() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut runner =
        CommandRunner::new(&engine, make_hardware(), &clock).with_labware_provider(&provider);

    queue(&engine, load_labware("tiprack_300ul", 1, "tiprack"));
    queue(&engine, load_labware("wellplate_96_flat", 2, "plate"));
    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &["tiprack"]),
    );
    queue(&engine, move_to_well(PIPETTE, "plate", "A1"));
    block_on(runner.run_until_idle());

    // Starting at max height there is nothing to rise over
    let moves = runner.hardware().moves();
    assert_eq!(heights(&moves), vec![205.0, PLATE_TOP]);
    runner.hardware_mut().clear_moves();

    queue(&engine, move_to_well(PIPETTE, "tiprack", "A1"));
    block_on(runner.run_until_idle());
    let moves = runner.hardware().moves();
    assert_eq!(heights(&moves), vec![74.0, 74.0, TIPRACK_TOP]);
    assert_close(moves[0].waypoint.position.x, PLATE_A1_X);
    assert_close(moves[1].waypoint.position.x, 14.38);
    runner.hardware_mut().clear_moves();

    queue(&engine, move_to_well(PIPETTE, "tiprack", "B1"));
    block_on(runner.run_until_idle());
    let moves = runner.hardware().moves();
    assert_eq!(heights(&moves), vec![69.0, 69.0, TIPRACK_TOP]);
    assert_close(moves[2].waypoint.position.y, 74.24 - 9.0);
    runner.hardware_mut().clear_moves();

    queue(&engine, CommandParams::Home(HomeParams::default()));
    queue(&engine, move_to_well(PIPETTE, "tiprack", "C1"));
    block_on(runner.run_until_idle());
    assert_eq!(heights(&runner.hardware().moves()), vec![205.0, TIPRACK_TOP]);
}

#[test]
fn test_failed_move_forgets_last_well() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let config = EngineConfig {
        continue_on_error: true,
        ..EngineConfig::default()
    };
    let engine = make_engine(config);
    let mut runner =
        CommandRunner::new(&engine, make_hardware(), &clock).with_labware_provider(&provider);

    queue_standard_setup(&engine);
    queue(&engine, load_labware("reservoir_12", 3, "reservoir"));
    queue(&engine, pick_up_next(PIPETTE));
    queue(&engine, aspirate(PIPETTE, "A1", 50.0));
    block_on(runner.run_until_idle());

    // Reaches the trough, then the plunger fails
    runner
        .hardware_mut()
        .inject_pipette_fault(PipetteError::NotReadyToAspirate(Mount::Left));
    let failed = queue(
        &engine,
        CommandParams::Aspirate(LiquidHandlingParams {
            pipette_id: PipetteId::from(PIPETTE),
            labware_id: LabwareId::from("reservoir"),
            well_name: "A1".into(),
            well_location: WellLocation::bottom(1.0),
            volume: 50.0,
            flow_rate: 92.86,
        }),
    );
    block_on(runner.run_until_idle());
    assert_eq!(status(&engine, &failed), CommandStatus::Failed);
    assert_close(runner.hardware().gantry_position(Mount::Left).z, 3.0);
    engine.read(|state| {
        assert_eq!(state.commands().run_status(), RunStatus::Running);
        assert!(state.motion().get_last_location(Mount::Left).is_none());
        assert!(state.pipettes().get_current_well().is_none());
    });
    runner.hardware_mut().clear_moves();

    // Back to the plate well the cache named before the failure: a full
    // arc over the tallest labware on the deck, the trash
    queue(&engine, move_to_well(PIPETTE, "plate", "A1"));
    block_on(runner.run_until_idle());
    let moves = runner.hardware().moves();
    assert_eq!(heights(&moves), vec![92.0, 92.0, PLATE_TOP]);
    assert_close(moves[2].waypoint.position.x, PLATE_A1_X);
}

#[test]
fn test_labware_offset_shifts_wells() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut runner =
        CommandRunner::new(&engine, make_hardware(), &clock).with_labware_provider(&provider);

    let offset_id = engine.add_labware_offset(
        "aliquot/wellplate_96_flat/1",
        DeckSlot::new(2).unwrap(),
        Point::new(1.0, 2.0, 3.0),
    );
    assert_eq!(offset_id, "offset-0");
    // Same definition elsewhere is not shifted
    queue(&engine, load_labware("wellplate_96_flat", 5, "other-plate"));
    let load = queue(&engine, load_labware("wellplate_96_flat", 2, "plate"));
    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &[]),
    );
    let moved = queue(&engine, move_to_well(PIPETTE, "plate", "A1"));
    block_on(runner.run_until_idle());

    let Some(CommandResult::LoadLabware(loaded)) = command(&engine, &load).result else {
        panic!("load did not produce a result");
    };
    assert_eq!(loaded.offset, Point::new(1.0, 2.0, 3.0));

    let Some(CommandResult::MoveToWell { position }) = command(&engine, &moved).result else {
        panic!("move did not produce a result");
    };
    assert_close(position.x, PLATE_A1_X + 1.0);
    assert_close(position.y, PLATE_A1_Y + 2.0);
    assert_close(position.z, PLATE_TOP + 3.0);
    assert_eq!(runner.hardware().gantry_position(Mount::Left), position);

    engine.read(|state| {
        let other = state.labware().get(&LabwareId::from("other-plate")).unwrap();
        assert_eq!(other.offset, Point::ZERO);
        assert_eq!(state.labware().get_deck_highest_z(), Some(PLATE_TOP + 3.0));
    });
}

#[test]
fn test_travel_clamps_to_max_height() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut hardware = make_hardware();
    hardware.set_max_height(67.0);
    hardware.set_position(Mount::Left, Point::new(0.0, 0.0, 60.0));
    let mut runner = CommandRunner::new(&engine, hardware, &clock).with_labware_provider(&provider);

    queue(&engine, load_labware("tiprack_300ul", 1, "tiprack"));
    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &["tiprack"]),
    );
    queue(&engine, move_to_well(PIPETTE, "tiprack", "A1"));
    queue(&engine, move_to_well(PIPETTE, "tiprack", "B1"));
    block_on(runner.run_until_idle());

    assert_eq!(
        heights(&runner.hardware().moves()),
        vec![67.0, 67.0, TIPRACK_TOP, 67.0, 67.0, TIPRACK_TOP]
    );
}

#[test]
fn test_unreachable_safe_height_fails_without_moving() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut hardware = make_hardware();
    hardware.set_max_height(64.5);
    hardware.set_position(Mount::Left, Point::new(0.0, 0.0, 60.0));
    let mut runner = CommandRunner::new(&engine, hardware, &clock).with_labware_provider(&provider);

    queue(&engine, load_labware("tiprack_300ul", 1, "tiprack"));
    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &["tiprack"]),
    );
    let moved = queue(&engine, move_to_well(PIPETTE, "tiprack", "A1"));
    block_on(runner.run_until_idle());

    let failed = command(&engine, &moved);
    assert_eq!(failed.status, CommandStatus::Failed);
    assert_eq!(failed.error.unwrap().kind, CommandErrorKind::Planning);
    assert!(runner.hardware().moves().is_empty());
}

#[test]
fn test_minimum_z_height_above_max_is_rejected() {
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut runner = CommandRunner::new(&engine, make_hardware(), &clock);

    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &[]),
    );
    let moved = queue(
        &engine,
        move_to(
            PIPETTE,
            Point::new(100.0, 100.0, 50.0),
            MovementOptions {
                minimum_z_height: Some(300.0),
                ..MovementOptions::default()
            },
        ),
    );
    block_on(runner.run_until_idle());
    assert_eq!(
        command(&engine, &moved).error.unwrap().kind,
        CommandErrorKind::Planning
    );
}

#[test]
fn test_location_cache_per_mount_by_api_version() {
    let lateral_height = |api_version: ApiVersion| {
        let provider = InMemoryLabwareProvider::standard();
        let clock = ManualClock::new(0);
        let config = EngineConfig {
            api_version,
            ..EngineConfig::default()
        };
        let engine = make_engine(config);
        let mut hardware = make_hardware().with_pipette(Mount::Right, PipetteName::P20SingleGen2);
        hardware.set_position(Mount::Right, Point::new(50.0, 50.0, 10.0));
        let mut runner =
            CommandRunner::new(&engine, hardware, &clock).with_labware_provider(&provider);

        queue(&engine, load_labware("wellplate_96_flat", 2, "plate"));
        queue(
            &engine,
            load_pipette(PipetteName::P300SingleGen2, Mount::Left, &[]),
        );
        queue(
            &engine,
            load_pipette(PipetteName::P20SingleGen2, Mount::Right, &[]),
        );
        queue(&engine, move_to_well(PIPETTE, "plate", "A1"));
        queue(&engine, move_to_well("pipette-right", "plate", "B1"));
        block_on(runner.run_until_idle());

        let moves = runner.hardware().moves();
        let right: Vec<_> = moves.iter().filter(|m| m.mount == Mount::Right).collect();
        assert_eq!(right.len(), 3);
        right[0].waypoint.position.z
    };

    // Per mount: the right pipette has no cached location, so it arcs as if
    // entering new labware
    assert_eq!(lateral_height(ApiVersion::new(2, 13)), PLATE_TOP + 10.0);
    // Shared: it inherits the left pipette's labware
    assert_eq!(lateral_height(ApiVersion::new(2, 9)), PLATE_TOP + 5.0);
}

#[test]
fn test_multichannel_centers_on_quirked_labware() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let hardware =
        SimulatedHardware::new().with_pipette(Mount::Right, PipetteName::P300MultiGen2);
    let mut runner = CommandRunner::new(&engine, hardware, &clock).with_labware_provider(&provider);

    queue(&engine, load_labware("reservoir_12", 3, "reservoir"));
    queue(&engine, load_labware("wellplate_96_flat", 2, "plate"));
    queue(
        &engine,
        load_pipette(PipetteName::P300MultiGen2, Mount::Right, &[]),
    );
    queue(&engine, move_to_well("pipette-right", "reservoir", "A1"));
    block_on(runner.run_until_idle());
    let moves = runner.hardware().moves();
    let last = moves.last().unwrap();
    assert_eq!(last.waypoint.critical_point, Some(CriticalPoint::XyCenter));
    runner.hardware_mut().clear_moves();

    queue(&engine, move_to_well("pipette-right", "plate", "A1"));
    block_on(runner.run_until_idle());
    let moves = runner.hardware().moves();
    assert_eq!(moves[0].waypoint.critical_point, Some(CriticalPoint::XyCenter));
    assert_eq!(moves.last().unwrap().waypoint.critical_point, None);
}

#[test]
fn test_touch_tip_visits_each_side() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut runner =
        CommandRunner::new(&engine, make_hardware(), &clock).with_labware_provider(&provider);

    queue_standard_setup(&engine);
    queue(&engine, pick_up_next(PIPETTE));
    let touch = queue(
        &engine,
        CommandParams::TouchTip(TouchTipParams {
            pipette_id: PipetteId::from(PIPETTE),
            labware_id: LabwareId::from("plate"),
            well_name: "A1".into(),
            radius: 0.5,
            v_offset: -1.0,
            speed: Some(20.0),
        }),
    );
    block_on(runner.run_until_idle());
    assert_eq!(status(&engine, &touch), CommandStatus::Succeeded);

    let moves = runner.hardware().moves();
    let edges = &moves[moves.len() - 5..];
    let expected = [(1.6, 0.0), (-1.6, 0.0), (0.0, 1.6), (0.0, -1.6), (0.0, 0.0)];
    for (mv, (dx, dy)) in edges.iter().zip(expected) {
        assert_close(mv.waypoint.position.x, PLATE_A1_X + dx);
        assert_close(mv.waypoint.position.y, PLATE_A1_Y + dy);
        assert_eq!(mv.waypoint.position.z, PLATE_TOP - 1.0);
        assert_eq!(mv.speed, Some(20.0));
    }
}

#[test]
fn test_touch_tip_rejects_bad_radius() {
    let provider = InMemoryLabwareProvider::standard();
    let clock = ManualClock::new(0);
    let engine = make_engine(EngineConfig::default());
    let mut runner =
        CommandRunner::new(&engine, make_hardware(), &clock).with_labware_provider(&provider);

    queue_standard_setup(&engine);
    queue(&engine, pick_up_next(PIPETTE));
    let touch = queue(
        &engine,
        CommandParams::TouchTip(TouchTipParams {
            pipette_id: PipetteId::from(PIPETTE),
            labware_id: LabwareId::from("plate"),
            well_name: "A1".into(),
            radius: 1.5,
            v_offset: 0.0,
            speed: None,
        }),
    );
    block_on(runner.run_until_idle());
    assert_eq!(
        command(&engine, &touch).error.unwrap().kind,
        CommandErrorKind::InvariantViolation
    );
}

#[test]
fn test_movement_speed_applies_until_overridden() {
    let clock = ManualClock::new(0);
    let config = EngineConfig {
        continue_on_error: true,
        ..EngineConfig::default()
    };
    let engine = make_engine(config);
    let mut runner = CommandRunner::new(&engine, make_hardware(), &clock);

    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &[]),
    );
    queue(
        &engine,
        CommandParams::SetMovementSpeed(SetMovementSpeedParams {
            pipette_id: PipetteId::from(PIPETTE),
            speed: Some(80.0),
        }),
    );
    queue(
        &engine,
        move_to(PIPETTE, Point::new(100.0, 100.0, 150.0), MovementOptions::default()),
    );
    queue(
        &engine,
        move_to(
            PIPETTE,
            Point::new(120.0, 100.0, 150.0),
            MovementOptions {
                speed: Some(10.0),
                ..MovementOptions::default()
            },
        ),
    );
    let invalid = queue(
        &engine,
        CommandParams::SetMovementSpeed(SetMovementSpeedParams {
            pipette_id: PipetteId::from(PIPETTE),
            speed: Some(0.0),
        }),
    );
    block_on(runner.run_until_idle());

    let speeds: Vec<_> = runner.hardware().moves().iter().map(|m| m.speed).collect();
    // The second move is already at travel height
    assert_eq!(speeds, vec![Some(80.0), Some(80.0), Some(10.0)]);
    assert_eq!(
        command(&engine, &invalid).error.unwrap().kind,
        CommandErrorKind::InvariantViolation
    );
    assert_eq!(
        engine.read(|state| state.pipettes().get_movement_speed(&PipetteId::from(PIPETTE))),
        Some(80.0)
    );
}

#[test]
fn test_move_relative_is_direct() {
    let clock = ManualClock::new(0);
    let config = EngineConfig {
        continue_on_error: true,
        ..EngineConfig::default()
    };
    let engine = make_engine(config);
    let mut runner = CommandRunner::new(&engine, make_hardware(), &clock);

    queue(
        &engine,
        load_pipette(PipetteName::P300SingleGen2, Mount::Left, &[]),
    );
    queue(
        &engine,
        move_to(PIPETTE, Point::new(100.0, 100.0, 150.0), MovementOptions::default()),
    );
    let relative = |axis, distance| {
        CommandParams::MoveRelative(MoveRelativeParams {
            pipette_id: PipetteId::from(PIPETTE),
            axis,
            distance,
        })
    };
    let up = queue(&engine, relative(MovementAxis::Z, 10.0));
    let left = queue(&engine, relative(MovementAxis::X, -25.0));
    let too_high = queue(&engine, relative(MovementAxis::Z, 100.0));
    block_on(runner.run_until_idle());

    assert_eq!(status(&engine, &up), CommandStatus::Succeeded);
    assert_eq!(status(&engine, &left), CommandStatus::Succeeded);
    assert_eq!(
        command(&engine, &too_high).error.unwrap().kind,
        CommandErrorKind::Planning
    );
    assert_eq!(
        runner.hardware().gantry_position(Mount::Left),
        Point::new(75.0, 100.0, 160.0)
    );
}
