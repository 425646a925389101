//! Board-agnostic execution core for the liquid-handling engine
//!
//! This crate contains all engine logic that does not depend on a specific
//! hardware implementation:
//!
//! - Deck and labware geometry
//! - Tip tracking and tip-rack selection
//! - Motion planning and validation
//! - Action-driven state store with read-only views
//! - Command implementations and the command runner
//! - Hardware abstraction traits
//! - Configuration types

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod actions;
pub mod commands;
pub mod config;
pub mod deck;
pub mod engine;
pub mod error;
pub mod motion;
pub mod state;
pub mod tips;
pub mod traits;

#[cfg(test)]
mod testing;

pub use aliquot_protocol as protocol;
pub use engine::{CommandRunner, Engine};
pub use error::{ExecutionError, StateError};
