//! Loading pipettes and labware

use alloc::format;

use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::commands::{
    LoadLabwareParams, LoadLabwareResult, LoadPipetteParams, LoadPipetteResult,
};
use aliquot_protocol::labware::definition_uri;
use aliquot_protocol::{CommandResult, LabwareId, Mount, PipetteId, Point, StaticPipetteConfig};

use super::CommandContext;
use crate::deck::clamp_api_level;
use crate::error::{ExecutionError, StateError};
use crate::state::accepts_name;
use crate::traits::HardwareControl;

pub(super) fn load_pipette<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &LoadPipetteParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = ctx.read(|state| -> Result<PipetteId, StateError> {
        let pipettes = state.pipettes();
        if pipettes.get_by_mount(params.mount).is_some() {
            return Err(StateError::MountOccupied(params.mount));
        }
        let pipette_id = match &params.pipette_id {
            Some(id) => id.clone(),
            None => PipetteId::new(format!("pipette-{}", mount_name(params.mount))),
        };
        if pipettes.get(&pipette_id).is_ok() {
            return Err(StateError::DuplicateId(format!("pipette {pipette_id}")));
        }
        for labware_id in &params.tip_racks {
            if !state.labware().is_tiprack(labware_id)? {
                return Err(StateError::NotATipRack(labware_id.clone()));
            }
        }
        Ok(pipette_id)
    })?;

    let attached = ctx
        .hardware
        .get_attached_pipette(params.mount)
        .ok_or(StateError::PipetteNotAttached(params.mount))?;
    if !accepts_name(attached.name, params.pipette_name) {
        return Err(StateError::PipetteMismatch {
            mount: params.mount,
            requested: params.pipette_name,
            attached: attached.name,
        }
        .into());
    }

    info!(
        "loaded {} on {} mount",
        params.pipette_name.as_str(),
        mount_name(params.mount)
    );
    Ok(CommandResult::LoadPipette(LoadPipetteResult {
        pipette_id,
        config: StaticPipetteConfig {
            model: attached.model,
            min_volume: attached.min_volume,
            max_volume: attached.max_volume,
            channels: attached.channels,
        },
    }))
}

pub(super) fn load_labware<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &LoadLabwareParams,
) -> Result<CommandResult, ExecutionError> {
    let uri = definition_uri(&params.namespace, &params.load_name, params.version);
    let api_level = clamp_api_level(params.api_level.unwrap_or(ctx.config().api_version));

    let (labware_id, known_definition, offset) = ctx.read(|state| {
        let labware = state.labware();
        if labware.get_in_slot(params.location).is_some() {
            return Err(StateError::SlotOccupied(params.location));
        }
        let labware_id = match &params.labware_id {
            Some(id) => id.clone(),
            None => LabwareId::new(format!("labware-{}", labware.count())),
        };
        if labware.get(&labware_id).is_ok() {
            return Err(StateError::DuplicateId(format!("labware {labware_id}")));
        }
        let offset = labware
            .find_offset(&uri, params.location)
            .map(|o| o.vector)
            .unwrap_or(Point::ZERO);
        Ok((labware_id, labware.get_definition_by_uri(&uri).ok().cloned(), offset))
    })?;

    let definition = match known_definition {
        Some(definition) => definition,
        None => ctx
            .labware_provider()
            .and_then(|provider| {
                provider.get_definition(&params.namespace, &params.load_name, params.version)
            })
            .ok_or_else(|| StateError::DefinitionNotFound(uri.clone()))?,
    };

    debug!("loaded labware {} in slot {}", uri.as_str(), params.location.number());
    Ok(CommandResult::LoadLabware(LoadLabwareResult {
        labware_id,
        definition,
        offset,
        api_level,
    }))
}

fn mount_name(mount: Mount) -> &'static str {
    match mount {
        Mount::Left => "left",
        Mount::Right => "right",
    }
}
