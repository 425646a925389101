//! Pipette state and view
//!
//! Tracks each loaded pipette's mount, attached tip, aspirated volume and
//! movement speed, plus the single well the gantry is currently in.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_protocol::{
    CommandParams, CommandResult, LabwareId, MotorAxis, Mount, PipetteId, PipetteName,
    StaticPipetteConfig, WellRef,
};

use crate::actions::{Action, CommandTransition, CommandUpdate};
use crate::error::StateError;
use crate::traits::PipetteHardwareInfo;

/// Older pipette names each newer hardware model can stand in for
const BACK_COMPAT_NAMES: &[(PipetteName, &[PipetteName])] = &[
    (PipetteName::P20SingleGen2, &[PipetteName::P10Single]),
    (PipetteName::P20MultiGen2, &[PipetteName::P10Multi]),
    (PipetteName::P300SingleGen2, &[PipetteName::P300Single]),
    (PipetteName::P300MultiGen2, &[PipetteName::P300Multi]),
    (PipetteName::P1000SingleGen2, &[PipetteName::P1000Single]),
];

/// Whether hardware reporting `attached` satisfies a load of `requested`
pub fn accepts_name(attached: PipetteName, requested: PipetteName) -> bool {
    attached == requested
        || BACK_COMPAT_NAMES
            .iter()
            .any(|(name, aliases)| *name == attached && aliases.contains(&requested))
}

/// A pipette as loaded by a protocol
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPipette {
    pub id: PipetteId,
    pub name: PipetteName,
    pub mount: Mount,
}

/// Tip currently on a pipette
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedTip {
    /// Rack well the tip run was picked from
    pub origin: WellRef,
    pub count: u8,
    pub length: f64,
    /// Working volume of the tip
    pub volume: f64,
}

/// The well the gantry is in, and which pipette is in it
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWell {
    pub pipette_id: PipetteId,
    pub labware_id: LabwareId,
    pub well_name: String,
}

/// A loaded pipette matched to the hardware on its mount
#[derive(Debug, Clone, PartialEq)]
pub struct HardwarePipette {
    pub mount: Mount,
    pub config: PipetteHardwareInfo,
}

/// Everything known about loaded pipettes
#[derive(Debug, Clone, Default)]
pub struct PipetteState {
    pipettes_by_id: BTreeMap<PipetteId, LoadedPipette>,
    aspirated_volume_by_id: BTreeMap<PipetteId, f64>,
    attached_tip_by_id: BTreeMap<PipetteId, AttachedTip>,
    movement_speed_by_id: BTreeMap<PipetteId, f64>,
    static_config_by_id: BTreeMap<PipetteId, StaticPipetteConfig>,
    tip_racks_by_id: BTreeMap<PipetteId, Vec<LabwareId>>,
    current_well: Option<CurrentWell>,
}

impl PipetteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn handle_action(&mut self, action: &Action) {
        if let Action::UpdateCommand(update) = action {
            match &update.transition {
                CommandTransition::Succeeded { result, .. } => self.handle_success(update, result),
                CommandTransition::Failed { .. } if update.params.moves_gantry() => {
                    self.current_well = None;
                }
                _ => {}
            }
        }
    }

    fn handle_success(&mut self, update: &CommandUpdate, result: &CommandResult) {
        match (&update.params, result) {
            (CommandParams::LoadPipette(params), CommandResult::LoadPipette(loaded)) => {
                let id = loaded.pipette_id.clone();
                self.pipettes_by_id.insert(
                    id.clone(),
                    LoadedPipette {
                        id: id.clone(),
                        name: params.pipette_name,
                        mount: params.mount,
                    },
                );
                self.aspirated_volume_by_id.insert(id.clone(), 0.0);
                self.attached_tip_by_id.remove(&id);
                self.movement_speed_by_id.remove(&id);
                self.static_config_by_id
                    .insert(id.clone(), loaded.config.clone());
                self.tip_racks_by_id.insert(id, params.tip_racks.clone());
            }
            (CommandParams::PickUpTip(params), CommandResult::PickUpTip(picked)) => {
                self.attached_tip_by_id.insert(
                    params.pipette_id.clone(),
                    AttachedTip {
                        origin: picked.tip.clone(),
                        count: picked.tip_count,
                        length: picked.tip_length,
                        volume: picked.tip_volume,
                    },
                );
                self.aspirated_volume_by_id
                    .insert(params.pipette_id.clone(), 0.0);
                self.set_current_well(&params.pipette_id, Some(&picked.tip));
            }
            (CommandParams::DropTip(params), CommandResult::DropTip(dropped)) => {
                self.attached_tip_by_id.remove(&params.pipette_id);
                self.aspirated_volume_by_id
                    .insert(params.pipette_id.clone(), 0.0);
                self.set_current_well(&params.pipette_id, dropped.dropped_into.as_ref());
            }
            (CommandParams::Aspirate(params), CommandResult::Aspirate { volume, .. }) => {
                *self
                    .aspirated_volume_by_id
                    .entry(params.pipette_id.clone())
                    .or_insert(0.0) += volume;
                self.set_current_well(&params.pipette_id, Some(&params.well()));
            }
            (CommandParams::Dispense(params), CommandResult::Dispense { volume, .. }) => {
                let aspirated = self
                    .aspirated_volume_by_id
                    .entry(params.pipette_id.clone())
                    .or_insert(0.0);
                *aspirated = (*aspirated - volume).max(0.0);
                self.set_current_well(&params.pipette_id, Some(&params.well()));
            }
            (CommandParams::BlowOut(params), CommandResult::BlowOut { .. }) => {
                self.aspirated_volume_by_id
                    .insert(params.pipette_id.clone(), 0.0);
                let well = WellRef::new(params.labware_id.clone(), params.well_name.clone());
                self.set_current_well(&params.pipette_id, Some(&well));
            }
            (CommandParams::TouchTip(params), CommandResult::TouchTip { .. }) => {
                let well = WellRef::new(params.labware_id.clone(), params.well_name.clone());
                self.set_current_well(&params.pipette_id, Some(&well));
            }
            (CommandParams::MoveToWell(params), CommandResult::MoveToWell { .. }) => {
                let well = WellRef::new(params.labware_id.clone(), params.well_name.clone());
                self.set_current_well(&params.pipette_id, Some(&well));
            }
            (CommandParams::MoveToCoordinates(params), CommandResult::MoveToCoordinates { .. }) => {
                self.set_current_well(&params.pipette_id, None);
            }
            (CommandParams::MoveRelative(params), CommandResult::MoveRelative { .. }) => {
                self.set_current_well(&params.pipette_id, None);
            }
            (CommandParams::Home(_), CommandResult::Home) => self.current_well = None,
            (CommandParams::SetMovementSpeed(params), CommandResult::SetMovementSpeed { speed }) => {
                match speed {
                    Some(speed) => {
                        self.movement_speed_by_id
                            .insert(params.pipette_id.clone(), *speed);
                    }
                    None => {
                        self.movement_speed_by_id.remove(&params.pipette_id);
                    }
                }
            }
            _ => {}
        }
    }

    fn set_current_well(&mut self, pipette_id: &PipetteId, well: Option<&WellRef>) {
        self.current_well = well.map(|well| CurrentWell {
            pipette_id: pipette_id.clone(),
            labware_id: well.labware_id.clone(),
            well_name: well.well_name.clone(),
        });
    }

    pub fn get(&self, pipette_id: &PipetteId) -> Result<&LoadedPipette, StateError> {
        self.pipettes_by_id
            .get(pipette_id)
            .ok_or_else(|| StateError::PipetteNotLoaded(pipette_id.clone()))
    }

    pub fn get_all(&self) -> impl Iterator<Item = &LoadedPipette> {
        self.pipettes_by_id.values()
    }

    pub fn count(&self) -> usize {
        self.pipettes_by_id.len()
    }

    pub fn get_by_mount(&self, mount: Mount) -> Option<&LoadedPipette> {
        self.pipettes_by_id.values().find(|p| p.mount == mount)
    }

    pub fn get_current_well(&self) -> Option<&CurrentWell> {
        self.current_well.as_ref()
    }

    /// Match a loaded pipette against what the hardware reports
    ///
    /// `attached` is indexed by [`Mount::index`].
    pub fn get_hardware_pipette(
        &self,
        pipette_id: &PipetteId,
        attached: &[Option<PipetteHardwareInfo>; 2],
    ) -> Result<HardwarePipette, StateError> {
        let pipette = self.get(pipette_id)?;
        let config = attached[pipette.mount.index()]
            .as_ref()
            .ok_or(StateError::PipetteNotAttached(pipette.mount))?;
        if !accepts_name(config.name, pipette.name) {
            return Err(StateError::PipetteMismatch {
                mount: pipette.mount,
                requested: pipette.name,
                attached: config.name,
            });
        }
        Ok(HardwarePipette {
            mount: pipette.mount,
            config: config.clone(),
        })
    }

    pub fn get_static_config(&self, pipette_id: &PipetteId) -> Result<&StaticPipetteConfig, StateError> {
        self.static_config_by_id
            .get(pipette_id)
            .ok_or_else(|| StateError::PipetteNotLoaded(pipette_id.clone()))
    }

    pub fn get_model_name(&self, pipette_id: &PipetteId) -> Result<&str, StateError> {
        self.get_static_config(pipette_id).map(|c| c.model.as_str())
    }

    pub fn get_minimum_volume(&self, pipette_id: &PipetteId) -> Result<f64, StateError> {
        self.get_static_config(pipette_id).map(|c| c.min_volume)
    }

    pub fn get_maximum_volume(&self, pipette_id: &PipetteId) -> Result<f64, StateError> {
        self.get_static_config(pipette_id).map(|c| c.max_volume)
    }

    pub fn get_channels(&self, pipette_id: &PipetteId) -> Result<u8, StateError> {
        self.get_static_config(pipette_id).map(|c| c.channels)
    }

    pub fn get_aspirated_volume(&self, pipette_id: &PipetteId) -> Result<f64, StateError> {
        self.get(pipette_id)?;
        Ok(self
            .aspirated_volume_by_id
            .get(pipette_id)
            .copied()
            .unwrap_or(0.0))
    }

    pub fn get_attached_tip(&self, pipette_id: &PipetteId) -> Result<Option<&AttachedTip>, StateError> {
        self.get(pipette_id)?;
        Ok(self.attached_tip_by_id.get(pipette_id))
    }

    /// Largest volume the pipette can hold with its current tip
    pub fn get_working_volume(&self, pipette_id: &PipetteId) -> Result<f64, StateError> {
        let max_volume = self.get_static_config(pipette_id)?.max_volume;
        self.attached_tip_by_id
            .get(pipette_id)
            .map(|tip| tip.volume.min(max_volume))
            .ok_or_else(|| StateError::NoTipAttached(pipette_id.clone()))
    }

    /// Volume that can still be aspirated
    pub fn get_available_volume(&self, pipette_id: &PipetteId) -> Result<f64, StateError> {
        Ok(self.get_working_volume(pipette_id)? - self.get_aspirated_volume(pipette_id)?)
    }

    /// Whether the plunger is already positioned for an aspirate
    pub fn get_is_ready_to_aspirate(
        &self,
        pipette_id: &PipetteId,
        hardware: &PipetteHardwareInfo,
    ) -> Result<bool, StateError> {
        Ok(self.get_aspirated_volume(pipette_id)? > 0.0 || hardware.ready_to_aspirate)
    }

    pub fn get_movement_speed(&self, pipette_id: &PipetteId) -> Option<f64> {
        self.movement_speed_by_id.get(pipette_id).copied()
    }

    /// Tip racks used for automatic tip selection
    pub fn get_tip_racks(&self, pipette_id: &PipetteId) -> Result<&[LabwareId], StateError> {
        self.get(pipette_id)?;
        Ok(self
            .tip_racks_by_id
            .get(pipette_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn get_mount(&self, pipette_id: &PipetteId) -> Result<Mount, StateError> {
        self.get(pipette_id).map(|p| p.mount)
    }

    pub fn get_z_axis(&self, pipette_id: &PipetteId) -> Result<MotorAxis, StateError> {
        Ok(match self.get_mount(pipette_id)? {
            Mount::Left => MotorAxis::LeftZ,
            Mount::Right => MotorAxis::RightZ,
        })
    }

    pub fn get_plunger_axis(&self, pipette_id: &PipetteId) -> Result<MotorAxis, StateError> {
        Ok(match self.get_mount(pipette_id)? {
            Mount::Left => MotorAxis::LeftPlunger,
            Mount::Right => MotorAxis::RightPlunger,
        })
    }
}
