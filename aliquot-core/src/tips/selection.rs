//! Tip selection across a pipette's tip racks

use aliquot_protocol::{LabwareId, WellRef};

use super::tracker::{TipError, TipTracker};

/// Find the next usable run of `channels` tips
///
/// Racks are searched in the given order. With a starting tip, racks before
/// the starting tip's rack are skipped and the starting well constrains only
/// that first rack; later racks are searched from their first well.
pub fn next_available_tip<'a, I>(
    starting_tip: Option<&WellRef>,
    tip_racks: I,
    channels: usize,
) -> Result<WellRef, TipError>
where
    I: IntoIterator<Item = (&'a LabwareId, &'a TipTracker)>,
{
    if channels == 0 {
        return Err(TipError::InvalidTipCount);
    }
    let mut racks = tip_racks.into_iter();

    if let Some(start) = starting_tip {
        let (labware_id, tracker) = racks
            .by_ref()
            .find(|(id, _)| **id == start.labware_id)
            .ok_or_else(|| TipError::StartingTipNotInRacks(start.clone()))?;
        if let Some(well) = tracker.get_next_tip(channels, Some(&start.well_name)) {
            return Ok(WellRef::new(labware_id.clone(), well));
        }
    }

    for (labware_id, tracker) in racks {
        if let Some(well) = tracker.get_next_tip(channels, None) {
            return Ok(WellRef::new(labware_id.clone(), well));
        }
    }

    Err(TipError::OutOfTips { channels })
}
