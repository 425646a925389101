//! Command implementations
//!
//! [`execute`] dispatches on the closed set of command kinds. Each
//! implementation validates against current state, drives the hardware,
//! and returns a result; it never mutates state directly. State changes
//! happen when the runner dispatches the result.

mod context;
mod liquid;
mod load;
mod movement;
mod tips;

pub use context::CommandContext;

use embassy_sync::blocking_mutex::raw::RawMutex;

use aliquot_protocol::{CommandParams, CommandResult};

use crate::error::ExecutionError;
use crate::traits::HardwareControl;

/// Execute one command
pub async fn execute<M: RawMutex, H: HardwareControl>(
    ctx: &mut CommandContext<'_, M, H>,
    params: &CommandParams,
) -> Result<CommandResult, ExecutionError> {
    match params {
        CommandParams::LoadPipette(p) => load::load_pipette(ctx, p),
        CommandParams::LoadLabware(p) => load::load_labware(ctx, p),
        CommandParams::Aspirate(p) => liquid::aspirate(ctx, p).await,
        CommandParams::Dispense(p) => liquid::dispense(ctx, p).await,
        CommandParams::BlowOut(p) => liquid::blow_out(ctx, p).await,
        CommandParams::TouchTip(p) => liquid::touch_tip(ctx, p).await,
        CommandParams::PickUpTip(p) => tips::pick_up_tip(ctx, p).await,
        CommandParams::DropTip(p) => tips::drop_tip(ctx, p).await,
        CommandParams::MoveToWell(p) => movement::move_to_well_command(ctx, p).await,
        CommandParams::MoveToCoordinates(p) => movement::move_to_coordinates(ctx, p).await,
        CommandParams::MoveRelative(p) => movement::move_relative(ctx, p).await,
        CommandParams::Home(p) => movement::home(ctx, p).await,
        CommandParams::SetMovementSpeed(p) => movement::set_movement_speed(ctx, p),
    }
}
