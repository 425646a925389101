//! Deck layout and labware geometry
//!
//! The deck is a fixed grid of slots. Loaded labware sits in a slot, shifted
//! by an optional calibration offset; every well position is resolved from
//! the slot origin, the offset and the well's definition.

pub mod geometry;
pub mod labware;

pub use geometry::{slot_origin, SLOT_PITCH_X, SLOT_PITCH_Y};
pub use labware::{
    clamp_api_level, tip_use_is_strict, LabwareOffset, LoadedLabware,
    IGNORE_API_VERSION_BREAKPOINT, STRICT_TIP_USE_BELOW,
};
