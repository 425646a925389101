//! Last-known pipette location
//!
//! The planner needs to know where a move starts. After every successful
//! movement-bearing command the engine records the final point and the well
//! it is in, if any. Older API levels share one cache between both mounts.

use aliquot_protocol::{LabwareId, Mount, Point, WellRef};

/// Where a pipette last ended up
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point: Point,
    pub well: Option<WellRef>,
}

impl Location {
    pub fn free(point: Point) -> Self {
        Self { point, well: None }
    }

    pub fn in_well(point: Point, well: WellRef) -> Self {
        Self {
            point,
            well: Some(well),
        }
    }

    pub fn labware_id(&self) -> Option<&LabwareId> {
        self.well.as_ref().map(|w| &w.labware_id)
    }
}

/// Last-location cache, per mount or shared
#[derive(Debug, Clone, PartialEq)]
pub struct LocationCache {
    per_mount: bool,
    entries: [Option<Location>; 2],
}

impl LocationCache {
    pub fn new(per_mount: bool) -> Self {
        Self {
            per_mount,
            entries: [None, None],
        }
    }

    pub fn is_per_mount(&self) -> bool {
        self.per_mount
    }

    /// Last location of the pipette on `mount`
    pub fn get(&self, mount: Mount) -> Option<&Location> {
        self.entries[self.slot(mount)].as_ref()
    }

    pub fn set(&mut self, mount: Mount, location: Location) {
        let slot = self.slot(mount);
        self.entries[slot] = Some(location);
    }

    /// Drop what is known about the pipette on `mount`
    pub fn forget(&mut self, mount: Mount) {
        let slot = self.slot(mount);
        self.entries[slot] = None;
    }

    pub fn clear(&mut self) {
        self.entries = [None, None];
    }

    fn slot(&self, mount: Mount) -> usize {
        if self.per_mount {
            mount.index()
        } else {
            0
        }
    }
}
