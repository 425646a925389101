//! Labware definition sources
//!
//! [`InMemoryLabwareProvider`] serves definitions registered at startup.
//! The builders below produce the standard definitions used by the
//! simulator and in tests.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_core::protocol::labware::{definition_uri, QUIRK_CENTER_MULTICHANNEL_ON_WELLS};
use aliquot_core::protocol::{LabwareDefinition, WellDefinition};
use aliquot_core::traits::LabwareProvider;

/// Namespace of the bundled definitions
pub const STANDARD_NAMESPACE: &str = "aliquot";

const ROWS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];
const COLUMNS: usize = 12;
const WELL_PITCH: f64 = 9.0;

/// Labware definitions held in memory, keyed by URI
#[derive(Debug, Clone, Default)]
pub struct InMemoryLabwareProvider {
    definitions: BTreeMap<String, LabwareDefinition>,
}

impl InMemoryLabwareProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider preloaded with the standard definitions
    pub fn standard() -> Self {
        let mut provider = Self::new();
        provider.insert(tip_rack_300ul());
        provider.insert(well_plate_96());
        provider.insert(reservoir_12());
        provider.insert(fixed_trash());
        provider
    }

    /// Add a definition, replacing any with the same URI
    pub fn insert(&mut self, definition: LabwareDefinition) {
        self.definitions.insert(definition.uri(), definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl LabwareProvider for InMemoryLabwareProvider {
    fn get_definition(
        &self,
        namespace: &str,
        load_name: &str,
        version: u32,
    ) -> Option<LabwareDefinition> {
        let found = self
            .definitions
            .get(&definition_uri(namespace, load_name, version))
            .cloned();
        if found.is_none() {
            debug!("no definition for {}/{}", namespace, load_name);
        }
        found
    }
}

/// Circular wells on a 9 mm SBS grid
fn sbs_grid(
    load_name: &str,
    display_name: &str,
    well_z: f64,
    depth: f64,
    diameter: f64,
    volume: f64,
) -> LabwareDefinition {
    let mut wells = BTreeMap::new();
    let mut ordering = Vec::with_capacity(COLUMNS);
    for column in 0..COLUMNS {
        let mut names = Vec::with_capacity(ROWS.len());
        for (row, letter) in ROWS.iter().enumerate() {
            let name = format!("{letter}{}", column + 1);
            wells.insert(
                name.clone(),
                WellDefinition {
                    x: 14.38 + WELL_PITCH * column as f64,
                    y: 74.24 - WELL_PITCH * row as f64,
                    z: well_z,
                    depth,
                    total_liquid_volume: volume,
                    diameter: Some(diameter),
                    x_dimension: None,
                    y_dimension: None,
                },
            );
            names.push(name);
        }
        ordering.push(names);
    }
    LabwareDefinition {
        namespace: String::from(STANDARD_NAMESPACE),
        load_name: String::from(load_name),
        version: 1,
        display_name: String::from(display_name),
        ordering,
        wells,
        z_dimension: well_z + depth,
        is_tiprack: false,
        tip_length: None,
        quirks: Vec::new(),
    }
}

/// 96 tips of 300 µL
pub fn tip_rack_300ul() -> LabwareDefinition {
    let mut definition = sbs_grid("tiprack_300ul", "300 µL Tip Rack", 5.0, 59.0, 5.23, 300.0);
    definition.is_tiprack = true;
    definition.tip_length = Some(51.0);
    definition
}

/// Flat-bottom 96-well plate
pub fn well_plate_96() -> LabwareDefinition {
    sbs_grid("wellplate_96_flat", "96 Well Plate", 3.5, 10.5, 6.4, 200.0)
}

/// One row of twelve rectangular troughs
pub fn reservoir_12() -> LabwareDefinition {
    let mut wells = BTreeMap::new();
    let mut ordering = Vec::with_capacity(COLUMNS);
    for column in 0..COLUMNS {
        let name = format!("A{}", column + 1);
        wells.insert(
            name.clone(),
            WellDefinition {
                x: 13.94 + WELL_PITCH * column as f64,
                y: 42.78,
                z: 2.0,
                depth: 40.0,
                total_liquid_volume: 22_000.0,
                diameter: None,
                x_dimension: Some(8.2),
                y_dimension: Some(71.2),
            },
        );
        ordering.push(alloc::vec![name]);
    }
    LabwareDefinition {
        namespace: String::from(STANDARD_NAMESPACE),
        load_name: String::from("reservoir_12"),
        version: 1,
        display_name: String::from("12 Well Reservoir"),
        ordering,
        wells,
        z_dimension: 42.0,
        is_tiprack: false,
        tip_length: None,
        quirks: alloc::vec![String::from(QUIRK_CENTER_MULTICHANNEL_ON_WELLS)],
    }
}

/// Fixed trash with a single open well
pub fn fixed_trash() -> LabwareDefinition {
    let mut wells = BTreeMap::new();
    wells.insert(
        String::from("A1"),
        WellDefinition {
            x: 82.84,
            y: 80.0,
            z: 5.0,
            depth: 77.0,
            total_liquid_volume: 1_100_000.0,
            diameter: None,
            x_dimension: Some(107.11),
            y_dimension: Some(165.67),
        },
    );
    LabwareDefinition {
        namespace: String::from(STANDARD_NAMESPACE),
        load_name: String::from("fixed_trash"),
        version: 1,
        display_name: String::from("Fixed Trash"),
        ordering: alloc::vec![alloc::vec![String::from("A1")]],
        wells,
        z_dimension: 82.0,
        is_tiprack: false,
        tip_length: None,
        quirks: alloc::vec![String::from(QUIRK_CENTER_MULTICHANNEL_ON_WELLS)],
    }
}
