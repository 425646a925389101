//! Action-driven engine state
//!
//! [`StateStore`] is the single authoritative record of a run. It changes
//! only by handling [`Action`]s, which it forwards to each sub-state in a
//! fixed order: commands, labware, pipettes, tips, motion. Readers get
//! `&StateStore` and use the views below; nothing outside an action handler
//! can mutate it.

pub mod commands;
pub mod labware;
pub mod motion;
pub mod pipettes;
pub mod tips;

pub use commands::CommandState;
pub use labware::LabwareState;
pub use motion::MotionState;
pub use pipettes::{
    accepts_name, AttachedTip, CurrentWell, HardwarePipette, LoadedPipette, PipetteState,
};
pub use tips::TipState;

use aliquot_protocol::commands::MovementOptions;
use aliquot_protocol::{CriticalPoint, LabwareId, PipetteId, Point, WellLocation, WellRef};

use crate::actions::{Action, ActionHandler};
use crate::config::EngineConfig;
use crate::error::StateError;
use crate::motion::{LocationFact, MoveRequest};

/// The engine's complete state
#[derive(Debug, Clone)]
pub struct StateStore {
    commands: CommandState,
    labware: LabwareState,
    pipettes: PipetteState,
    tips: TipState,
    motion: MotionState,
    config: EngineConfig,
}

impl StateStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            commands: CommandState::new(config.door_safety_enabled),
            labware: LabwareState::new(),
            pipettes: PipetteState::new(),
            tips: TipState::new(),
            motion: MotionState::new(config.location_cache_per_mount()),
            config,
        }
    }

    pub fn commands(&self) -> &CommandState {
        &self.commands
    }

    pub fn labware(&self) -> &LabwareState {
        &self.labware
    }

    pub fn pipettes(&self) -> &PipetteState {
        &self.pipettes
    }

    pub fn tips(&self) -> &TipState {
        &self.tips
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Planner facts for a location inside a well
    pub fn get_well_fact(
        &self,
        pipette_id: &PipetteId,
        labware_id: &LabwareId,
        well_name: &str,
        location: &WellLocation,
    ) -> Result<LocationFact, StateError> {
        let point = self
            .labware
            .get_well_position(labware_id, well_name, location)?;
        let fact = LocationFact::in_well(
            point,
            WellRef::new(labware_id.clone(), well_name),
            self.labware.get_highest_z(labware_id)?,
            self.labware.get_well_top_z(labware_id, well_name)?,
        );
        Ok(fact.with_critical_point(self.get_critical_point(pipette_id, labware_id)?))
    }

    /// Planner facts for where a pipette is now
    ///
    /// `position` comes from the hardware; the labware and well come from
    /// the last-location cache.
    pub fn get_origin_fact(
        &self,
        pipette_id: &PipetteId,
        position: Point,
    ) -> Result<LocationFact, StateError> {
        let mount = self.pipettes.get_mount(pipette_id)?;
        let Some(well) = self
            .motion
            .get_last_location(mount)
            .and_then(|location| location.well.as_ref())
        else {
            return Ok(LocationFact::free(position));
        };

        let labware_id = &well.labware_id;
        match (
            self.labware.get_highest_z(labware_id),
            self.labware.get_well_top_z(labware_id, &well.well_name),
        ) {
            (Ok(labware_z), Ok(well_z)) => {
                let critical_point = self.get_critical_point(pipette_id, labware_id)?;
                Ok(LocationFact::in_well(position, well.clone(), labware_z, well_z)
                    .with_critical_point(critical_point))
            }
            _ => Ok(LocationFact::free(position)),
        }
    }

    /// Assemble a planner request for a pipette move
    pub fn get_move_request(
        &self,
        pipette_id: &PipetteId,
        origin: Point,
        to: LocationFact,
        instrument_max_height: f64,
        movement: &MovementOptions,
    ) -> Result<MoveRequest, StateError> {
        let from = self.get_origin_fact(pipette_id, origin)?;
        Ok(MoveRequest::new(from, to, instrument_max_height)
            .with_movement(movement)
            .with_deck_highest_z(self.labware.get_deck_highest_z()))
    }

    /// Reference point for a pipette over a labware
    fn get_critical_point(
        &self,
        pipette_id: &PipetteId,
        labware_id: &LabwareId,
    ) -> Result<Option<CriticalPoint>, StateError> {
        let multichannel = self.pipettes.get_channels(pipette_id)? > 1;
        if multichannel && self.labware.centers_multichannel(labware_id)? {
            Ok(Some(CriticalPoint::XyCenter))
        } else {
            Ok(None)
        }
    }
}

impl ActionHandler for StateStore {
    fn handle_action(&mut self, action: &Action) {
        self.commands.handle_action(action);
        self.labware.handle_action(action);
        self.pipettes.handle_action(action);
        self.tips.handle_action(action);
        self.motion.handle_action(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::CommandUpdate;
    use crate::testing::*;
    use aliquot_protocol::commands::{
        DropTipParams, DropTipTarget, DropTipResult, LiquidHandlingParams, PickUpTipParams,
        PickUpTipResult, TipSource,
    };
    use aliquot_protocol::{
        CommandId, CommandParams, CommandResult, CommandStatus, HardwareEvent, Mount, PauseSource,
        PipetteName, RunStatus,
    };

    fn make_store() -> StateStore {
        let mut store = StateStore::new(EngineConfig::default());
        store.handle_action(&Action::Play);
        apply_success(&mut store, load_labware_success("tiprack-1", 1, tip_rack_definition()));
        apply_success(&mut store, load_labware_success("plate-1", 2, plate_definition()));
        apply_success(
            &mut store,
            load_pipette_success("p300", PipetteName::P300SingleGen2, Mount::Left, &["tiprack-1"]),
        );
        store
    }

    fn apply_success(store: &mut StateStore, (params, result): (CommandParams, CommandResult)) {
        let id = CommandId::new(alloc::format!("command-{}", store.commands().count()));
        store.handle_action(&Action::QueueCommand {
            command_id: id.clone(),
            key: alloc::string::String::from(id.as_str()),
            params: params.clone(),
            created_at: 0,
        });
        store.handle_action(&Action::UpdateCommand(CommandUpdate::running(
            id.clone(),
            params.clone(),
            1,
        )));
        store.handle_action(&Action::UpdateCommand(CommandUpdate::succeeded(
            id, params, result, 2,
        )));
    }

    fn pick_up(store: &mut StateStore, well: &str) {
        let tip = WellRef::new("tiprack-1", well);
        apply_success(
            store,
            (
                CommandParams::PickUpTip(PickUpTipParams {
                    pipette_id: PipetteId::from("p300"),
                    source: TipSource::Well {
                        labware_id: tip.labware_id.clone(),
                        well_name: tip.well_name.clone(),
                    },
                }),
                CommandResult::PickUpTip(PickUpTipResult {
                    tip,
                    tip_count: 1,
                    tip_length: TIP_LENGTH,
                    tip_volume: 300.0,
                    position: Point::new(1.0, 2.0, 3.0),
                }),
            ),
        );
    }

    #[test]
    fn test_loaded_entities_are_visible() {
        let store = make_store();
        assert_eq!(store.labware().count(), 2);
        assert!(store.labware().is_tiprack(&LabwareId::from("tiprack-1")).unwrap());
        assert_eq!(store.pipettes().get_mount(&PipetteId::from("p300")), Ok(Mount::Left));
        assert_eq!(
            store.pipettes().get_tip_racks(&PipetteId::from("p300")).unwrap(),
            &[LabwareId::from("tiprack-1")]
        );
        assert_eq!(store.commands().count(), 3);
        assert!(store
            .commands()
            .get_all()
            .iter()
            .all(|c| c.status == CommandStatus::Succeeded));
    }

    #[test]
    fn test_pick_up_updates_pipette_tracker_and_cache() {
        let mut store = make_store();
        pick_up(&mut store, "A1");

        let pipette_id = PipetteId::from("p300");
        let tip = store.pipettes().get_attached_tip(&pipette_id).unwrap().unwrap();
        assert_eq!(tip.origin, WellRef::new("tiprack-1", "A1"));
        assert_eq!(store.pipettes().get_working_volume(&pipette_id), Ok(300.0));
        assert_eq!(
            store.tips().has_tip(&WellRef::new("tiprack-1", "A1")),
            Ok(Some(false))
        );
        let last = store.motion().get_last_location(Mount::Left).unwrap();
        assert_eq!(last.well, Some(WellRef::new("tiprack-1", "A1")));
        assert_eq!(
            store.pipettes().get_current_well().map(|w| w.well_name.as_str()),
            Some("A1")
        );
    }

    #[test]
    fn test_aspirate_dispense_volume_bookkeeping() {
        let mut store = make_store();
        pick_up(&mut store, "A1");
        let params = LiquidHandlingParams {
            pipette_id: PipetteId::from("p300"),
            labware_id: LabwareId::from("plate-1"),
            well_name: "A1".into(),
            well_location: WellLocation::bottom(1.0),
            volume: 120.0,
            flow_rate: 92.0,
        };
        apply_success(
            &mut store,
            (
                CommandParams::Aspirate(params.clone()),
                CommandResult::Aspirate {
                    volume: 120.0,
                    position: Point::ZERO,
                },
            ),
        );
        apply_success(
            &mut store,
            (
                CommandParams::Dispense(params),
                CommandResult::Dispense {
                    volume: 50.0,
                    position: Point::ZERO,
                },
            ),
        );
        let pipette_id = PipetteId::from("p300");
        assert_eq!(store.pipettes().get_aspirated_volume(&pipette_id), Ok(70.0));
        assert_eq!(store.pipettes().get_available_volume(&pipette_id), Ok(230.0));
    }

    #[test]
    fn test_returned_tip_refills_rack() {
        let mut store = make_store();
        pick_up(&mut store, "B1");
        apply_success(
            &mut store,
            (
                CommandParams::DropTip(DropTipParams {
                    pipette_id: PipetteId::from("p300"),
                    target: DropTipTarget::ReturnToOrigin,
                    home_after: false,
                }),
                CommandResult::DropTip(DropTipResult {
                    position: Point::ZERO,
                    tip_count: 1,
                    dropped_into: Some(WellRef::new("tiprack-1", "B1")),
                    returned: true,
                }),
            ),
        );
        assert_eq!(
            store.tips().has_tip(&WellRef::new("tiprack-1", "B1")),
            Ok(Some(true))
        );
        assert_eq!(
            store.pipettes().get_attached_tip(&PipetteId::from("p300")),
            Ok(None)
        );
    }

    #[test]
    fn test_stop_discards_queue() {
        let mut store = make_store();
        for i in 0..2 {
            store.handle_action(&Action::QueueCommand {
                command_id: CommandId::new(alloc::format!("queued-{i}")),
                key: "k".into(),
                params: CommandParams::Home(Default::default()),
                created_at: 10,
            });
        }
        store.handle_action(&Action::Stop { at: 20 });

        assert_eq!(store.commands().run_status(), RunStatus::StopRequested);
        assert_eq!(store.commands().get_queued().count(), 0);
        let discarded = store.commands().get(&CommandId::from("queued-1")).unwrap();
        assert_eq!(discarded.status, CommandStatus::Failed);
        assert_eq!(discarded.started_at, None);
        assert_eq!(discarded.completed_at, Some(20));

        store.handle_action(&Action::HardwareStopped { at: 30 });
        assert_eq!(store.commands().run_status(), RunStatus::Stopped);
        assert_eq!(store.commands().run_completed_at(), Some(30));
    }

    #[test]
    fn test_door_blocks_run_until_played() {
        let mut store = make_store();
        store.handle_action(&Action::HardwareEvent(HardwareEvent::DoorOpened));
        assert_eq!(store.commands().run_status(), RunStatus::BlockedByOpenDoor);

        // Still open: play keeps the run blocked
        store.handle_action(&Action::Play);
        assert_eq!(store.commands().run_status(), RunStatus::BlockedByOpenDoor);

        store.handle_action(&Action::HardwareEvent(HardwareEvent::DoorClosed));
        store.handle_action(&Action::Play);
        assert_eq!(store.commands().run_status(), RunStatus::Running);
    }

    #[test]
    fn test_door_ignored_without_safety() {
        let config = EngineConfig {
            door_safety_enabled: false,
            ..EngineConfig::default()
        };
        let mut store = StateStore::new(config);
        store.handle_action(&Action::Play);
        store.handle_action(&Action::HardwareEvent(HardwareEvent::DoorOpened));
        assert_eq!(store.commands().run_status(), RunStatus::Running);
    }

    #[test]
    fn test_failed_move_clears_last_location() {
        let mut store = make_store();
        pick_up(&mut store, "A1");
        assert!(store.motion().get_last_location(Mount::Left).is_some());

        let params = CommandParams::MoveToCoordinates(
            aliquot_protocol::commands::MoveToCoordinatesParams {
                pipette_id: PipetteId::from("p300"),
                coordinates: Point::new(10.0, 10.0, 50.0),
                movement: MovementOptions::default(),
            },
        );
        let id = CommandId::new("command-9");
        store.handle_action(&Action::QueueCommand {
            command_id: id.clone(),
            key: alloc::string::String::from("command-9"),
            params: params.clone(),
            created_at: 0,
        });
        store.handle_action(&Action::UpdateCommand(CommandUpdate::running(
            id.clone(),
            params.clone(),
            1,
        )));
        let error = aliquot_protocol::CommandError {
            kind: aliquot_protocol::CommandErrorKind::Hardware,
            detail: "stalled".into(),
        };
        store.handle_action(&Action::UpdateCommand(CommandUpdate::failed(
            id, params, error, 2,
        )));

        assert!(store.motion().get_last_location(Mount::Left).is_none());
        assert!(store.pipettes().get_current_well().is_none());
        // Tip bookkeeping is untouched by the failure
        assert!(store
            .pipettes()
            .get_attached_tip(&PipetteId::from("p300"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut store = make_store();
        store.handle_action(&Action::Pause {
            source: PauseSource::Client,
        });
        assert_eq!(store.commands().run_status(), RunStatus::Paused);
        store.handle_action(&Action::Play);
        assert_eq!(store.commands().run_status(), RunStatus::Running);
    }

    #[test]
    fn test_finish_with_error_fails_run() {
        let mut store = make_store();
        let error = aliquot_protocol::CommandError {
            kind: aliquot_protocol::CommandErrorKind::ResourceExhausted,
            detail: "out of tips".into(),
        };
        store.handle_action(&Action::Finish {
            error: Some(error.clone()),
            at: 5,
        });
        assert_eq!(store.commands().run_status(), RunStatus::Finishing);
        assert!(store.commands().needs_hardware_stop());
        store.handle_action(&Action::HardwareStopped { at: 6 });
        assert_eq!(store.commands().run_status(), RunStatus::Failed);
        assert_eq!(store.commands().run_error(), Some(&error));
    }

    #[test]
    fn test_backward_transition_ignored() {
        let mut store = make_store();
        let first = store.commands().get_all()[0].clone();
        store.handle_action(&Action::UpdateCommand(CommandUpdate::running(
            first.id.clone(),
            first.params.clone(),
            99,
        )));
        let after = store.commands().get(&first.id).unwrap();
        assert_eq!(after.status, CommandStatus::Succeeded);
        assert_eq!(after.started_at, Some(1));
    }

    #[test]
    fn test_well_fact_uses_labware_geometry() {
        let store = make_store();
        let fact = store
            .get_well_fact(
                &PipetteId::from("p300"),
                &LabwareId::from("plate-1"),
                "A1",
                &WellLocation::top(),
            )
            .unwrap();
        assert_eq!(fact.labware_highest_z, Some(PLATE_HEIGHT));
        assert_eq!(fact.well_top_z, Some(fact.point.z));
        assert_eq!(fact.critical_point, None);
    }

    #[test]
    fn test_origin_fact_follows_cache() {
        let mut store = make_store();
        let pipette_id = PipetteId::from("p300");
        let origin = store.get_origin_fact(&pipette_id, Point::ZERO).unwrap();
        assert_eq!(origin.labware_id, None);

        pick_up(&mut store, "A1");
        let origin = store
            .get_origin_fact(&pipette_id, Point::new(5.0, 5.0, 80.0))
            .unwrap();
        assert_eq!(origin.point, Point::new(5.0, 5.0, 80.0));
        assert_eq!(origin.labware_id, Some(LabwareId::from("tiprack-1")));

        let request = store
            .get_move_request(
                &pipette_id,
                Point::new(5.0, 5.0, 80.0),
                LocationFact::free(Point::new(0.0, 0.0, 90.0)),
                200.0,
                &MovementOptions::default(),
            )
            .unwrap();
        assert_eq!(request.deck_highest_z, Some(TIP_RACK_HEIGHT));
        assert!(!request.same_labware);
    }
}
