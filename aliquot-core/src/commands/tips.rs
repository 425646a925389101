//! Picking up and dropping tips

use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::commands::{
    DropTipParams, DropTipResult, DropTipTarget, MovementOptions, PickUpTipParams,
    PickUpTipResult, TipSource,
};
use aliquot_protocol::{CommandResult, WellLocation, WellRef};

use super::movement::move_to_well;
use super::CommandContext;
use crate::error::ExecutionError;
use crate::traits::HardwareControl;

pub(super) async fn pick_up_tip<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &PickUpTipParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;

    let (tip, channels, tip_length, tip_volume, mount) =
        ctx.read(|state| -> Result<_, ExecutionError> {
            let pipettes = state.pipettes();
            if pipettes.get_attached_tip(pipette_id)?.is_some() {
                return Err(ExecutionError::TipAlreadyAttached(pipette_id.clone()));
            }
            let channels = pipettes.get_channels(pipette_id)?;
            let count = usize::from(channels);

            let tip = match &params.source {
                TipSource::Well {
                    labware_id,
                    well_name,
                } => {
                    state.labware().validate_well(labware_id, well_name)?;
                    let strict = state.tips().is_strict(labware_id)?;
                    state
                        .tips()
                        .get_tracker(labware_id)?
                        .check_use(well_name, count, strict)?;
                    WellRef::new(labware_id.clone(), well_name.clone())
                }
                TipSource::NextAvailable { starting_tip } => state.tips().get_next_tip(
                    pipettes.get_tip_racks(pipette_id)?,
                    count,
                    starting_tip.as_ref(),
                )?,
            };

            let labware = state.labware();
            let tip_length = labware.get_tip_length(&tip.labware_id)?;
            let max_volume = pipettes.get_static_config(pipette_id)?.max_volume;
            let tip_volume = labware.get_tip_volume(&tip.labware_id)?.min(max_volume);
            Ok((tip, channels, tip_length, tip_volume, pipettes.get_mount(pipette_id)?))
        })?;

    debug!("picking up tip at {}", tip.well_name.as_str());
    let position = move_to_well(
        ctx,
        pipette_id,
        &tip.labware_id,
        &tip.well_name,
        &WellLocation::top(),
        &MovementOptions::default(),
    )
    .await?;
    ctx.hardware
        .pick_up_tip(mount, tip_length, tip_volume)
        .await?;

    Ok(CommandResult::PickUpTip(PickUpTipResult {
        tip,
        tip_count: channels,
        tip_length,
        tip_volume,
        position,
    }))
}

pub(super) async fn drop_tip<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &DropTipParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;

    let (destination, location, origin, tip_count, mount) =
        ctx.read(|state| -> Result<_, ExecutionError> {
            let pipettes = state.pipettes();
            let tip = pipettes
                .get_attached_tip(pipette_id)?
                .ok_or_else(|| ExecutionError::NoTipAttached {
                    pipette_id: pipette_id.clone(),
                    action: "drop tip",
                })?;

            let (destination, location) = match &params.target {
                DropTipTarget::Well {
                    labware_id,
                    well_name,
                    well_location,
                } => {
                    state.labware().validate_well(labware_id, well_name)?;
                    (
                        WellRef::new(labware_id.clone(), well_name.clone()),
                        *well_location,
                    )
                }
                DropTipTarget::ReturnToOrigin => (tip.origin.clone(), WellLocation::top()),
            };

            if destination == tip.origin {
                state
                    .tips()
                    .get_tracker(&destination.labware_id)
                    .map_err(|_| ExecutionError::TipOriginUnknown(pipette_id.clone()))?
                    .check_return(&destination.well_name, usize::from(tip.count))?;
            }
            Ok((
                destination,
                location,
                tip.origin.clone(),
                tip.count,
                pipettes.get_mount(pipette_id)?,
            ))
        })?;

    let position = move_to_well(
        ctx,
        pipette_id,
        &destination.labware_id,
        &destination.well_name,
        &location,
        &MovementOptions::default(),
    )
    .await?;
    ctx.hardware.drop_tip(mount, params.home_after).await?;

    let returned = destination == origin;
    if returned {
        debug!("returned tip to {}", destination.well_name.as_str());
    }
    Ok(CommandResult::DropTip(DropTipResult {
        position,
        tip_count,
        dropped_into: Some(destination),
        returned,
    }))
}
