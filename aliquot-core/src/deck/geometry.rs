//! Slot coordinates
//!
//! Slots are numbered 1-12, left to right and front to back, three per row.

use aliquot_protocol::{DeckSlot, Point};

/// Distance between slot origins along X, in mm
pub const SLOT_PITCH_X: f64 = 132.5;

/// Distance between slot origins along Y, in mm
pub const SLOT_PITCH_Y: f64 = 90.5;

const SLOTS_PER_ROW: u8 = 3;

/// Front-left-bottom corner of a slot in deck coordinates
pub fn slot_origin(slot: DeckSlot) -> Point {
    let index = slot.number() - 1;
    let column = index % SLOTS_PER_ROW;
    let row = index / SLOTS_PER_ROW;
    Point::new(
        f64::from(column) * SLOT_PITCH_X,
        f64::from(row) * SLOT_PITCH_Y,
        0.0,
    )
}
