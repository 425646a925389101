//! Tip-rack bookkeeping
//!
//! [`TipTracker`] tracks which wells of one tip rack still hold a tip.
//! [`next_available_tip`] walks a pipette's ordered list of racks to find
//! the next usable run of tips.

pub mod selection;
pub mod tracker;

pub use selection::next_available_tip;
pub use tracker::{TipError, TipTracker};
