//! Loaded labware instances and calibration offsets

use alloc::string::String;

use aliquot_protocol::{
    ApiVersion, DeckSlot, LabwareDefinition, LabwareId, Point, WellLocation, WellOrigin,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::geometry::slot_origin;

/// Labware at or below this API level behaves as if it were this level
pub const IGNORE_API_VERSION_BREAKPOINT: ApiVersion = ApiVersion::new(2, 13);

/// Tip racks below this API level refuse to use a well that is already empty
pub const STRICT_TIP_USE_BELOW: ApiVersion = ApiVersion::new(2, 2);

/// Resolve the API level a labware instance actually follows
pub fn clamp_api_level(requested: ApiVersion) -> ApiVersion {
    if requested <= IGNORE_API_VERSION_BREAKPOINT {
        IGNORE_API_VERSION_BREAKPOINT
    } else {
        requested
    }
}

/// Whether using an empty tip-rack well is an error at this API level
pub fn tip_use_is_strict(api_level: ApiVersion) -> bool {
    api_level < STRICT_TIP_USE_BELOW
}

/// Calibration offset for a definition placed in a slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabwareOffset {
    pub id: String,
    pub definition_uri: String,
    pub location: DeckSlot,
    pub vector: Point,
}

/// A labware instance on the deck
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadedLabware {
    pub id: LabwareId,
    pub definition_uri: String,
    pub location: DeckSlot,
    /// Calibration offset applied on top of the slot origin
    pub offset: Point,
    pub display_name: Option<String>,
    /// Level after clamping
    pub api_level: ApiVersion,
}

impl LoadedLabware {
    /// Labware origin in deck coordinates
    pub fn origin(&self) -> Point {
        slot_origin(self.location) + self.offset
    }

    /// Highest point of the labware in deck coordinates
    pub fn highest_z(&self, definition: &LabwareDefinition) -> f64 {
        self.origin().z + definition.z_dimension
    }

    /// Absolute position of a location inside a well
    ///
    /// Returns `None` if the definition has no such well.
    pub fn well_position(
        &self,
        definition: &LabwareDefinition,
        well_name: &str,
        location: &WellLocation,
    ) -> Option<Point> {
        let well = definition.well(well_name)?;
        let reference = match location.origin {
            WellOrigin::Top => well.top(),
            WellOrigin::Bottom => well.bottom(),
            WellOrigin::Center => well.bottom().with_z(well.z + well.depth / 2.0),
        };
        Some(self.origin() + reference + location.offset)
    }

    /// Absolute height of a well's top edge
    pub fn well_top_z(&self, definition: &LabwareDefinition, well_name: &str) -> Option<f64> {
        self.well_position(definition, well_name, &WellLocation::top())
            .map(|p| p.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use alloc::vec::Vec;
    use aliquot_protocol::WellDefinition;

    fn make_definition() -> LabwareDefinition {
        let mut wells = BTreeMap::new();
        wells.insert(
            String::from("A1"),
            WellDefinition {
                x: 14.0,
                y: 74.0,
                z: 2.0,
                depth: 10.0,
                total_liquid_volume: 200.0,
                diameter: Some(6.0),
                x_dimension: None,
                y_dimension: None,
            },
        );
        LabwareDefinition {
            namespace: String::from("aliquot"),
            load_name: String::from("plate"),
            version: 1,
            display_name: String::from("Plate"),
            ordering: vec![vec![String::from("A1")]],
            wells,
            z_dimension: 14.5,
            is_tiprack: false,
            tip_length: None,
            quirks: Vec::new(),
        }
    }

    fn make_labware(slot: u8, offset: Point) -> LoadedLabware {
        LoadedLabware {
            id: LabwareId::from("plate-1"),
            definition_uri: String::from("aliquot/plate/1"),
            location: DeckSlot::new(slot).unwrap(),
            offset,
            display_name: None,
            api_level: IGNORE_API_VERSION_BREAKPOINT,
        }
    }

    #[test]
    fn test_clamp_api_level() {
        assert_eq!(clamp_api_level(ApiVersion::new(2, 0)), ApiVersion::new(2, 13));
        assert_eq!(clamp_api_level(ApiVersion::new(2, 13)), ApiVersion::new(2, 13));
        assert_eq!(clamp_api_level(ApiVersion::new(2, 14)), ApiVersion::new(2, 14));
    }

    #[test]
    fn test_well_positions() {
        let def = make_definition();
        let labware = make_labware(2, Point::new(0.5, -0.5, 1.0));
        let origin = Point::new(133.0, -0.5, 1.0);

        let top = labware.well_position(&def, "A1", &WellLocation::top()).unwrap();
        assert_eq!(top, origin + Point::new(14.0, 74.0, 12.0));

        let bottom = labware
            .well_position(&def, "A1", &WellLocation::bottom(1.0))
            .unwrap();
        assert_eq!(bottom, origin + Point::new(14.0, 74.0, 3.0));

        let center = WellLocation {
            origin: WellOrigin::Center,
            offset: Point::ZERO,
        };
        let center = labware.well_position(&def, "A1", &center).unwrap();
        assert_eq!(center.z, 1.0 + 7.0);
    }

    #[test]
    fn test_missing_well() {
        let def = make_definition();
        let labware = make_labware(1, Point::ZERO);
        assert_eq!(labware.well_position(&def, "H12", &WellLocation::top()), None);
        assert_eq!(labware.well_top_z(&def, "H12"), None);
    }

    #[test]
    fn test_highest_z_includes_offset() {
        let def = make_definition();
        assert_eq!(make_labware(1, Point::ZERO).highest_z(&def), 14.5);
        assert_eq!(make_labware(1, Point::new(0.0, 0.0, 2.0)).highest_z(&def), 16.5);
    }

    #[test]
    fn test_clamped_labware_is_lenient() {
        assert!(!tip_use_is_strict(make_labware(1, Point::ZERO).api_level));
        assert!(!tip_use_is_strict(clamp_api_level(ApiVersion::new(2, 0))));
        assert!(tip_use_is_strict(ApiVersion::new(2, 1)));
    }
}
