//! Engine configuration
//!
//! Board-agnostic settings that shape run policy and motion planning.
//! Configuration can be built in code or parsed from TOML.

pub mod types;

pub use types::*;
