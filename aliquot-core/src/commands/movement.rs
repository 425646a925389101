//! Gantry movement
//!
//! Every move goes through the arc planner. Commands that move into a well
//! share [`move_to_well`].

use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::commands::{
    HomeParams, MoveRelativeParams, MoveToCoordinatesParams, MoveToWellParams, MovementAxis,
    MovementOptions, SetMovementSpeedParams,
};
use aliquot_protocol::{CommandResult, LabwareId, Mount, PipetteId, Point, WellLocation};

use super::CommandContext;
use crate::error::{ExecutionError, StateError};
use crate::motion::{plan_moves, LocationFact, MoveRequest};
use crate::traits::HardwareControl;

/// Plan and perform a move of `pipette_id` to `to`
///
/// Returns the final position.
pub(super) async fn move_to_fact<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
    to: LocationFact,
    movement: &MovementOptions,
) -> Result<Point, ExecutionError> {
    let mount = ctx.read(|state| state.pipettes().get_mount(pipette_id))?;
    let origin = ctx.hardware.gantry_position(mount);
    let max_height = ctx.hardware.instrument_max_height(mount);

    let request = ctx.read(|state| {
        state.get_move_request(pipette_id, origin, to, max_height, movement)
    })?;
    perform(ctx, pipette_id, mount, request, movement).await
}

/// Move between two locations of the well the pipette is already in
///
/// Used mid-command, before the cached location has caught up.
pub(super) async fn move_in_well<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
    labware_id: &LabwareId,
    well_name: &str,
    location: &WellLocation,
) -> Result<Point, ExecutionError> {
    let (mount, to) = ctx.read(|state| -> Result<_, StateError> {
        let mount = state.pipettes().get_mount(pipette_id)?;
        let to = state.get_well_fact(pipette_id, labware_id, well_name, location)?;
        Ok((mount, to))
    })?;
    let mut from = to.clone();
    from.point = ctx.hardware.gantry_position(mount);
    let request = MoveRequest::new(from, to, ctx.hardware.instrument_max_height(mount));
    perform(ctx, pipette_id, mount, request, &MovementOptions::default()).await
}

async fn perform<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
    mount: Mount,
    request: MoveRequest,
    movement: &MovementOptions,
) -> Result<Point, ExecutionError> {
    let speed = movement
        .speed
        .or_else(|| ctx.read(|state| state.pipettes().get_movement_speed(pipette_id)));
    let waypoints = plan_moves(&request, &ctx.config().motion)?;
    trace!("moving through {} waypoints", waypoints.len());
    for waypoint in waypoints {
        ctx.hardware.move_to(mount, waypoint, speed).await?;
    }
    Ok(request.to.point)
}

/// Move to a location inside a well
pub(super) async fn move_to_well<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
    labware_id: &LabwareId,
    well_name: &str,
    location: &WellLocation,
    movement: &MovementOptions,
) -> Result<Point, ExecutionError> {
    let to = ctx.read(|state| state.get_well_fact(pipette_id, labware_id, well_name, location))?;
    move_to_fact(ctx, pipette_id, to, movement).await
}

pub(super) async fn move_to_well_command<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &MoveToWellParams,
) -> Result<CommandResult, ExecutionError> {
    let position = move_to_well(
        ctx,
        &params.pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        &params.movement,
    )
    .await?;
    Ok(CommandResult::MoveToWell { position })
}

pub(super) async fn move_to_coordinates<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &MoveToCoordinatesParams,
) -> Result<CommandResult, ExecutionError> {
    let to = LocationFact::free(params.coordinates);
    let position = move_to_fact(ctx, &params.pipette_id, to, &params.movement).await?;
    Ok(CommandResult::MoveToCoordinates { position })
}

/// Straight move along one axis from the current position
pub(super) async fn move_relative<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &MoveRelativeParams,
) -> Result<CommandResult, ExecutionError> {
    let mount = ctx.read(|state| state.pipettes().get_mount(&params.pipette_id))?;
    let current = ctx.hardware.gantry_position(mount);
    let delta = match params.axis {
        MovementAxis::X => Point::new(params.distance, 0.0, 0.0),
        MovementAxis::Y => Point::new(0.0, params.distance, 0.0),
        MovementAxis::Z => Point::new(0.0, 0.0, params.distance),
    };
    let movement = MovementOptions {
        force_direct: true,
        ..MovementOptions::default()
    };
    let to = LocationFact::free(current + delta);
    let position = move_to_fact(ctx, &params.pipette_id, to, &movement).await?;
    Ok(CommandResult::MoveRelative { position })
}

pub(super) async fn home<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &HomeParams,
) -> Result<CommandResult, ExecutionError> {
    ctx.hardware.home(params.axes.as_deref()).await?;
    Ok(CommandResult::Home)
}

pub(super) fn set_movement_speed<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &SetMovementSpeedParams,
) -> Result<CommandResult, ExecutionError> {
    ctx.read(|state| state.pipettes().get(&params.pipette_id).map(|_| ()))?;
    if let Some(speed) = params.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ExecutionError::InvalidSpeed(speed));
        }
    }
    Ok(CommandResult::SetMovementSpeed {
        speed: params.speed,
    })
}
