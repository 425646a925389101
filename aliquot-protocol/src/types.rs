//! Identifiers and geometric primitives
//!
//! All distances are millimetres in deck coordinates (origin at the
//! left-front-bottom corner of the work space). Volumes are microlitres.

use alloc::string::String;
use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(String::from(id))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        #[cfg(feature = "defmt")]
        impl defmt::Format for $name {
            fn format(&self, f: defmt::Formatter) {
                defmt::write!(f, "{=str}", self.0.as_str())
            }
        }
    };
}

id_type!(
    /// Identifier of a loaded pipette
    PipetteId
);
id_type!(
    /// Identifier of a loaded labware
    LabwareId
);
id_type!(
    /// Identifier of a queued command
    CommandId
);

/// A well identified by value: owning labware plus well name
///
/// Two `WellRef`s compare equal exactly when they name the same physical
/// well, no matter where the handles came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WellRef {
    pub labware_id: LabwareId,
    pub well_name: String,
}

impl WellRef {
    pub fn new(labware_id: impl Into<LabwareId>, well_name: impl Into<String>) -> Self {
        Self {
            labware_id: labware_id.into(),
            well_name: well_name.into(),
        }
    }
}

impl fmt::Display for WellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.well_name, self.labware_id)
    }
}

/// A point in deck coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const ZERO: Point = Point::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same X/Y, different height
    pub const fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Pipette mount on the gantry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Mount {
    Left,
    Right,
}

impl Mount {
    pub const ALL: [Mount; 2] = [Mount::Left, Mount::Right];

    /// Index into per-mount tables
    pub const fn index(self) -> usize {
        match self {
            Mount::Left => 0,
            Mount::Right => 1,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Mount::Left => Mount::Right,
            Mount::Right => Mount::Left,
        }
    }
}

/// Motor axes of the gantry and pipettes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum MotorAxis {
    X,
    Y,
    LeftZ,
    RightZ,
    LeftPlunger,
    RightPlunger,
}

/// Deck slot number (1-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "u8", into = "u8"))]
pub struct DeckSlot(u8);

impl DeckSlot {
    pub const COUNT: u8 = 12;

    /// Create a slot, rejecting numbers outside the deck
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= Self::COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DeckSlot {
    type Error = InvalidSlot;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        DeckSlot::new(number).ok_or(InvalidSlot(number))
    }
}

impl From<DeckSlot> for u8 {
    fn from(slot: DeckSlot) -> u8 {
        slot.0
    }
}

impl fmt::Display for DeckSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Slot number outside 1-12
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deck slot {0} does not exist")]
pub struct InvalidSlot(pub u8);

/// Reference point on the pipette used for position calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum CriticalPoint {
    /// Geometric center of all nozzles (multichannel centered on a well)
    XyCenter,
    /// Front-most nozzle
    FrontNozzle,
}

/// Known pipette models by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum PipetteName {
    P10Single,
    P10Multi,
    P20SingleGen2,
    P20MultiGen2,
    P50Single,
    P50Multi,
    P300Single,
    P300Multi,
    P300SingleGen2,
    P300MultiGen2,
    P1000Single,
    P1000SingleGen2,
}

impl PipetteName {
    pub const ALL: [PipetteName; 12] = [
        PipetteName::P10Single,
        PipetteName::P10Multi,
        PipetteName::P20SingleGen2,
        PipetteName::P20MultiGen2,
        PipetteName::P50Single,
        PipetteName::P50Multi,
        PipetteName::P300Single,
        PipetteName::P300Multi,
        PipetteName::P300SingleGen2,
        PipetteName::P300MultiGen2,
        PipetteName::P1000Single,
        PipetteName::P1000SingleGen2,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PipetteName::P10Single => "p10_single",
            PipetteName::P10Multi => "p10_multi",
            PipetteName::P20SingleGen2 => "p20_single_gen2",
            PipetteName::P20MultiGen2 => "p20_multi_gen2",
            PipetteName::P50Single => "p50_single",
            PipetteName::P50Multi => "p50_multi",
            PipetteName::P300Single => "p300_single",
            PipetteName::P300Multi => "p300_multi",
            PipetteName::P300SingleGen2 => "p300_single_gen2",
            PipetteName::P300MultiGen2 => "p300_multi_gen2",
            PipetteName::P1000Single => "p1000_single",
            PipetteName::P1000SingleGen2 => "p1000_single_gen2",
        }
    }

    /// Number of channels on this model
    pub const fn channels(self) -> u8 {
        match self {
            PipetteName::P10Multi
            | PipetteName::P20MultiGen2
            | PipetteName::P50Multi
            | PipetteName::P300Multi
            | PipetteName::P300MultiGen2 => 8,
            _ => 1,
        }
    }
}

impl FromStr for PipetteName {
    type Err = UnknownPipetteName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipetteName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or(UnknownPipetteName)
    }
}

impl fmt::Display for PipetteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipette name")]
pub struct UnknownPipetteName;

/// Static configuration reported for a loaded pipette
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticPipetteConfig {
    /// Full model string, e.g. `p300_single_v2.0`
    pub model: String,
    pub min_volume: f64,
    pub max_volume: f64,
    pub channels: u8,
}

/// Protocol API level
///
/// Ordered by major then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApiVersion {
    pub major: u8,
    pub minor: u8,
}

impl ApiVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Reference height inside a well
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum WellOrigin {
    #[default]
    Top,
    Bottom,
    Center,
}

/// A position relative to a well
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WellLocation {
    pub origin: WellOrigin,
    pub offset: Point,
}

impl WellLocation {
    pub const fn top() -> Self {
        Self {
            origin: WellOrigin::Top,
            offset: Point::ZERO,
        }
    }

    pub const fn bottom(z: f64) -> Self {
        Self {
            origin: WellOrigin::Bottom,
            offset: Point::new(0.0, 0.0, z),
        }
    }
}
