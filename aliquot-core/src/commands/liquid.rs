//! Aspirate, dispense, blow-out and touch-tip

use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::commands::{
    BlowOutParams, LiquidHandlingParams, MovementOptions, TouchTipParams,
};
use aliquot_protocol::{CommandResult, Mount, PipetteId, Point, WellLocation, WellOrigin};

use super::movement::{move_in_well, move_to_fact, move_to_well};
use super::CommandContext;
use crate::error::{ExecutionError, StateError};
use crate::motion::Waypoint;
use crate::state::HardwarePipette;
use crate::traits::HardwareControl;

/// Resolve a loaded pipette against what is attached right now
fn hardware_pipette<M: RawMutex, H: HardwareControl>(
    ctx: &CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
) -> Result<HardwarePipette, StateError> {
    let attached = Mount::ALL.map(|mount| ctx.hardware.get_attached_pipette(mount));
    ctx.read(|state| state.pipettes().get_hardware_pipette(pipette_id, &attached))
}

fn require_tip<M: RawMutex, H: HardwareControl>(
    ctx: &CommandContext<'_, M, H>,
    pipette_id: &PipetteId,
    action: &'static str,
) -> Result<(), ExecutionError> {
    let has_tip = ctx.read(|state| {
        state
            .pipettes()
            .get_attached_tip(pipette_id)
            .map(|tip| tip.is_some())
    })?;
    if has_tip {
        Ok(())
    } else {
        Err(ExecutionError::NoTipAttached {
            pipette_id: pipette_id.clone(),
            action,
        })
    }
}

fn validate_volume(volume: f64) -> Result<(), ExecutionError> {
    if volume.is_finite() && volume >= 0.0 {
        Ok(())
    } else {
        Err(ExecutionError::InvalidVolume(volume))
    }
}

pub(super) async fn aspirate<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &LiquidHandlingParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;
    require_tip(ctx, pipette_id, "aspirate")?;
    validate_volume(params.volume)?;

    let available = ctx.read(|state| state.pipettes().get_available_volume(pipette_id))?;
    if params.volume > available {
        return Err(ExecutionError::WorkingVolumeExceeded {
            requested: params.volume,
            available,
        });
    }

    let hw = hardware_pipette(ctx, pipette_id)?;
    let ready = ctx.read(|state| {
        state
            .pipettes()
            .get_is_ready_to_aspirate(pipette_id, &hw.config)
    })?;
    let movement = MovementOptions::default();

    if !ready {
        // The plunger must reach its bottom outside the liquid.
        move_to_well(
            ctx,
            pipette_id,
            &params.labware_id,
            &params.well_name,
            &WellLocation::top(),
            &movement,
        )
        .await?;
        ctx.hardware.prepare_for_aspirate(hw.mount).await?;
    }

    let position = if ready {
        move_to_well(
            ctx,
            pipette_id,
            &params.labware_id,
            &params.well_name,
            &params.well_location,
            &movement,
        )
        .await?
    } else {
        move_in_well(
            ctx,
            pipette_id,
            &params.labware_id,
            &params.well_name,
            &params.well_location,
        )
        .await?
    };
    ctx.hardware
        .aspirate(hw.mount, params.volume, params.flow_rate)
        .await?;

    Ok(CommandResult::Aspirate {
        volume: params.volume,
        position,
    })
}

pub(super) async fn dispense<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &LiquidHandlingParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;
    require_tip(ctx, pipette_id, "dispense")?;
    validate_volume(params.volume)?;

    let aspirated = ctx.read(|state| state.pipettes().get_aspirated_volume(pipette_id))?;
    if params.volume > aspirated {
        return Err(ExecutionError::InsufficientVolume {
            requested: params.volume,
            aspirated,
        });
    }

    let hw = hardware_pipette(ctx, pipette_id)?;
    let position = move_to_well(
        ctx,
        pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        &MovementOptions::default(),
    )
    .await?;
    ctx.hardware
        .dispense(hw.mount, params.volume, params.flow_rate)
        .await?;

    Ok(CommandResult::Dispense {
        volume: params.volume,
        position,
    })
}

pub(super) async fn blow_out<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &BlowOutParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;
    require_tip(ctx, pipette_id, "blow out")?;

    let hw = hardware_pipette(ctx, pipette_id)?;
    let position = move_to_well(
        ctx,
        pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        &MovementOptions::default(),
    )
    .await?;
    ctx.hardware.blow_out(hw.mount, params.flow_rate).await?;

    Ok(CommandResult::BlowOut { position })
}

/// Touch the tip against the four sides of a well, then recenter
pub(super) async fn touch_tip<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &TouchTipParams,
) -> Result<CommandResult, ExecutionError> {
    let pipette_id = &params.pipette_id;
    require_tip(ctx, pipette_id, "touch tip")?;
    if !params.radius.is_finite() || params.radius <= 0.0 || params.radius > 1.0 {
        return Err(ExecutionError::InvalidTouchRadius(params.radius));
    }
    if let Some(speed) = params.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ExecutionError::InvalidSpeed(speed));
        }
    }

    let location = WellLocation {
        origin: WellOrigin::Top,
        offset: Point::new(0.0, 0.0, params.v_offset),
    };
    let (fact, (half_x, half_y)) = ctx.read(|state| -> Result<_, StateError> {
        let fact =
            state.get_well_fact(pipette_id, &params.labware_id, &params.well_name, &location)?;
        let extents = state
            .labware()
            .get_definition(&params.labware_id)?
            .well(&params.well_name)
            .map(|well| well.half_extents())
            .unwrap_or((0.0, 0.0));
        Ok((fact, extents))
    })?;
    let critical_point = fact.critical_point;
    let mount = ctx.read(|state| state.pipettes().get_mount(pipette_id))?;

    let center = move_to_fact(ctx, pipette_id, fact, &MovementOptions::default()).await?;
    let dx = half_x * params.radius;
    let dy = half_y * params.radius;
    let edges = [
        Point::new(dx, 0.0, 0.0),
        Point::new(-dx, 0.0, 0.0),
        Point::new(0.0, dy, 0.0),
        Point::new(0.0, -dy, 0.0),
        Point::ZERO,
    ];
    for edge in edges {
        let waypoint = Waypoint::new(center + edge, critical_point);
        ctx.hardware.move_to(mount, waypoint, params.speed).await?;
    }

    Ok(CommandResult::TouchTip { position: center })
}
