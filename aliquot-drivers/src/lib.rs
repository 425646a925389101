//! Hardware implementations for the engine
//!
//! This crate provides concrete implementations of the traits defined in
//! aliquot-core:
//!
//! - A simulated robot for protocol analysis and tests
//! - Clocks
//! - In-memory labware definition sources and standard definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod clock;
pub mod labware;
pub mod simulator;

pub use clock::ManualClock;
pub use labware::InMemoryLabwareProvider;
pub use simulator::SimulatedHardware;
