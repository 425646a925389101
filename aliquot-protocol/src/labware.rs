//! Labware definitions
//!
//! A definition is the immutable shape of a labware type: its well grid in
//! canonical column order, per-well geometry, overall height and, for tip
//! racks, the tip length. Definition files are parsed elsewhere; the engine
//! only consumes the resulting structure.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Quirk: a multichannel pipette should center itself on each well
pub const QUIRK_CENTER_MULTICHANNEL_ON_WELLS: &str = "centerMultichannelOnWells";

/// Geometry of a single well, relative to the labware origin
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WellDefinition {
    /// Center of the well bottom
    pub x: f64,
    pub y: f64,
    /// Height of the well bottom above the labware origin
    pub z: f64,
    pub depth: f64,
    pub total_liquid_volume: f64,
    /// Diameter for circular wells, `None` for rectangular
    pub diameter: Option<f64>,
    /// Footprint of rectangular wells
    pub x_dimension: Option<f64>,
    pub y_dimension: Option<f64>,
}

impl WellDefinition {
    /// Well bottom center, relative to the labware origin
    pub fn bottom(&self) -> Point {
        Point::new(self.x, self.y, self.z)
    }

    /// Well top center, relative to the labware origin
    pub fn top(&self) -> Point {
        Point::new(self.x, self.y, self.z + self.depth)
    }

    /// Half the well's extent along X and Y
    pub fn half_extents(&self) -> (f64, f64) {
        match self.diameter {
            Some(d) => (d / 2.0, d / 2.0),
            None => (
                self.x_dimension.unwrap_or(0.0) / 2.0,
                self.y_dimension.unwrap_or(0.0) / 2.0,
            ),
        }
    }
}

/// A complete labware definition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabwareDefinition {
    pub namespace: String,
    pub load_name: String,
    pub version: u32,
    pub display_name: String,
    /// Well names per column, front-to-back within each column
    pub ordering: Vec<Vec<String>>,
    pub wells: BTreeMap<String, WellDefinition>,
    /// Overall height of the labware
    pub z_dimension: f64,
    pub is_tiprack: bool,
    /// Length of one tip; only meaningful for tip racks
    pub tip_length: Option<f64>,
    pub quirks: Vec<String>,
}

impl LabwareDefinition {
    /// `namespace/load_name/version`
    pub fn uri(&self) -> String {
        definition_uri(&self.namespace, &self.load_name, self.version)
    }

    pub fn well(&self, name: &str) -> Option<&WellDefinition> {
        self.wells.get(name)
    }

    /// Whether multichannel pipettes center on wells of this labware
    pub fn center_multichannel_on_wells(&self) -> bool {
        self.quirks
            .iter()
            .any(|q| q.as_str() == QUIRK_CENTER_MULTICHANNEL_ON_WELLS)
    }

    /// Every well name in canonical order (column by column)
    pub fn wells_in_order(&self) -> impl Iterator<Item = &str> {
        self.ordering
            .iter()
            .flat_map(|column| column.iter().map(String::as_str))
    }
}

/// Build a definition URI from its parts
pub fn definition_uri(namespace: &str, load_name: &str, version: u32) -> String {
    format!("{namespace}/{load_name}/{version}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn make_definition() -> LabwareDefinition {
        let mut wells = BTreeMap::new();
        for (name, y) in [("A1", 20.0), ("B1", 11.0), ("A2", 20.0), ("B2", 11.0)] {
            let x = if name.ends_with('1') { 10.0 } else { 19.0 };
            wells.insert(
                String::from(name),
                WellDefinition {
                    x,
                    y,
                    z: 5.0,
                    depth: 40.0,
                    total_liquid_volume: 300.0,
                    diameter: Some(5.0),
                    x_dimension: None,
                    y_dimension: None,
                },
            );
        }
        LabwareDefinition {
            namespace: String::from("aliquot"),
            load_name: String::from("tiny_tiprack"),
            version: 1,
            display_name: String::from("Tiny Tip Rack"),
            ordering: vec![
                vec![String::from("A1"), String::from("B1")],
                vec![String::from("A2"), String::from("B2")],
            ],
            wells,
            z_dimension: 64.0,
            is_tiprack: true,
            tip_length: Some(51.0),
            quirks: Vec::new(),
        }
    }

    #[test]
    fn test_uri() {
        assert_eq!(make_definition().uri(), "aliquot/tiny_tiprack/1");
    }

    #[test]
    fn test_wells_in_order_is_column_major() {
        let def = make_definition();
        let names: Vec<&str> = def.wells_in_order().collect();
        assert_eq!(names, ["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_well_top_and_bottom() {
        let def = make_definition();
        let well = def.well("A1").unwrap();
        assert_eq!(well.bottom(), Point::new(10.0, 20.0, 5.0));
        assert_eq!(well.top(), Point::new(10.0, 20.0, 45.0));
    }

    #[test]
    fn test_half_extents() {
        let def = make_definition();
        assert_eq!(def.well("A1").unwrap().half_extents(), (2.5, 2.5));

        let mut well = def.well("A1").unwrap().clone();
        well.diameter = None;
        well.x_dimension = Some(8.0);
        well.y_dimension = Some(70.0);
        assert_eq!(well.half_extents(), (4.0, 35.0));
    }

    #[test]
    fn test_multichannel_quirk() {
        let mut def = make_definition();
        assert!(!def.center_multichannel_on_wells());
        def.quirks.push(String::from(QUIRK_CENTER_MULTICHANNEL_ON_WELLS));
        assert!(def.center_multichannel_on_wells());
    }
}
