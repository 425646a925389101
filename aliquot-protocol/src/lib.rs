//! Aliquot command vocabulary
//!
//! This crate defines the language spoken between the protocol engine and
//! whatever sits above it (a run server, a protocol simulator, a test
//! harness): identifiers, deck geometry primitives, labware definitions,
//! command requests and their results.
//!
//! # Overview
//!
//! ```text
//! CommandRequest ──► engine queue ──► Command { status, result | error }
//!   (params, key)                        queued → running → succeeded
//!                                                         └► failed
//! ```
//!
//! Requests can be carried over any byte transport with the postcard codec
//! in [`codec`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(feature = "serde")]
pub mod codec;
pub mod commands;
pub mod events;
pub mod labware;
pub mod types;

pub use commands::{
    Command, CommandError, CommandErrorKind, CommandParams, CommandRequest, CommandResult,
    CommandStatus,
};
pub use events::{HardwareEvent, PauseSource, RunStatus};
pub use labware::{LabwareDefinition, WellDefinition};
pub use types::{
    ApiVersion, CommandId, CriticalPoint, DeckSlot, LabwareId, MotorAxis, Mount, PipetteId,
    PipetteName, Point, StaticPipetteConfig, WellLocation, WellOrigin, WellRef,
};
