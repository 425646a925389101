//! Per-rack tip availability
//!
//! Wells are kept as columns in canonical order (front-to-back within a
//! column, columns left-to-right). A multichannel pick-up takes a run of
//! consecutive wells from a single column; runs never wrap into the next
//! column.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use aliquot_protocol::{LabwareDefinition, LabwareId, WellRef};

/// Errors from tip bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TipError {
    /// Tip count must be at least one
    #[error("tip count must be at least one")]
    InvalidTipCount,
    /// Well is not part of this rack
    #[error("well {0} is not part of the tip rack")]
    UnknownWell(String),
    /// Run starting at the well would leave its column
    #[error("{count} tips starting at {well} do not fit in the column")]
    RunExceedsColumn { well: String, count: usize },
    /// A well in the run has no tip to take
    #[error("no tip in well {0}")]
    NoTipAvailable(String),
    /// A well in the run already holds a tip
    #[error("well {0} already holds a tip")]
    TipAlreadyPresent(String),
    /// Labware is not a tip rack
    #[error("labware {0} is not a tip rack")]
    NotATipRack(LabwareId),
    /// Starting tip belongs to none of the candidate racks
    #[error("starting tip {0} is not in any of the pipette's tip racks")]
    StartingTipNotInRacks(WellRef),
    /// Every candidate rack is exhausted
    #[error("out of tips: no rack has {channels} consecutive tips")]
    OutOfTips { channels: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct TipWell {
    name: String,
    has_tip: bool,
}

/// Tip availability for one tip rack
#[derive(Debug, Clone, PartialEq)]
pub struct TipTracker {
    columns: Vec<Vec<TipWell>>,
    /// Well name → (column, index in column)
    index: BTreeMap<String, (usize, usize)>,
}

impl TipTracker {
    /// Create a full rack from columns of well names
    pub fn new(columns: &[Vec<String>]) -> Self {
        let mut index = BTreeMap::new();
        let columns = columns
            .iter()
            .enumerate()
            .map(|(c, column)| {
                column
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        index.insert(name.clone(), (c, i));
                        TipWell {
                            name: name.clone(),
                            has_tip: true,
                        }
                    })
                    .collect()
            })
            .collect();
        Self { columns, index }
    }

    /// Create a full rack from a tip-rack definition
    pub fn from_definition(definition: &LabwareDefinition) -> Self {
        Self::new(&definition.ordering)
    }

    /// Whether a well holds a tip; `None` for unknown wells
    pub fn has_tip(&self, well_name: &str) -> Option<bool> {
        self.locate(well_name).map(|(c, i)| self.columns[c][i].has_tip)
    }

    /// Number of wells that still hold a tip
    pub fn remaining(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|well| well.has_tip)
            .count()
    }

    /// Find the first run of `num_tips` consecutive tips within one column
    ///
    /// With a starting well, columns before it and wells before it within
    /// its own column are skipped. An unknown starting well yields `None`.
    pub fn get_next_tip(&self, num_tips: usize, starting_well: Option<&str>) -> Option<&str> {
        if num_tips == 0 {
            return None;
        }
        let (first_column, first_index) = match starting_well {
            Some(name) => self.locate(name)?,
            None => (0, 0),
        };

        self.columns
            .iter()
            .enumerate()
            .skip(first_column)
            .find_map(|(c, column)| {
                let start = if c == first_column { first_index } else { 0 };
                find_run(column, start, num_tips, true).map(|i| column[i].name.as_str())
            })
    }

    /// Find the first run of `num_tips` consecutive empty wells
    ///
    /// Scans in the same canonical order as [`get_next_tip`](Self::get_next_tip).
    pub fn previous_tip(&self, num_tips: usize) -> Option<&str> {
        if num_tips == 0 {
            return None;
        }
        self.columns.iter().find_map(|column| {
            find_run(column, 0, num_tips, false).map(|i| column[i].name.as_str())
        })
    }

    /// Check that a run could be used, without changing anything
    ///
    /// With `fail_if_full`, any empty well in the run is an error.
    pub fn check_use(
        &self,
        start_well: &str,
        num_channels: usize,
        fail_if_full: bool,
    ) -> Result<(), TipError> {
        let run = self.run(start_well, num_channels)?;
        match run.iter().find(|well| !well.has_tip) {
            Some(empty) if fail_if_full => Err(TipError::NoTipAvailable(empty.name.clone())),
            _ => Ok(()),
        }
    }

    /// Mark `num_channels` consecutive wells starting at `start_well` as used
    ///
    /// Atomic: on error nothing changes. With `fail_if_full`, any empty well
    /// in the run is an error; otherwise empties are marked again and logged.
    pub fn use_tips(
        &mut self,
        start_well: &str,
        num_channels: usize,
        fail_if_full: bool,
    ) -> Result<(), TipError> {
        self.check_use(start_well, num_channels, fail_if_full)?;
        let (c, start) = self.run_bounds(start_well, num_channels)?;
        let run = &mut self.columns[c][start..start + num_channels];
        if run.iter().any(|well| !well.has_tip) {
            warn!("tip run starting at {} reuses empty wells", start_well);
        }
        for well in run.iter_mut() {
            well.has_tip = false;
        }
        Ok(())
    }

    /// Check that tips could be returned to a run, without changing anything
    pub fn check_return(&self, start_well: &str, num_channels: usize) -> Result<(), TipError> {
        let run = self.run(start_well, num_channels)?;
        match run.iter().find(|well| well.has_tip) {
            Some(full) => Err(TipError::TipAlreadyPresent(full.name.clone())),
            None => Ok(()),
        }
    }

    /// Put tips back into `num_channels` consecutive wells
    ///
    /// Atomic: if any well in the run already holds a tip nothing changes.
    pub fn return_tips(&mut self, start_well: &str, num_channels: usize) -> Result<(), TipError> {
        self.check_return(start_well, num_channels)?;
        let (c, start) = self.run_bounds(start_well, num_channels)?;
        for well in self.columns[c][start..start + num_channels].iter_mut() {
            well.has_tip = true;
        }
        Ok(())
    }

    /// Refill every well
    pub fn reset(&mut self) {
        for well in self.columns.iter_mut().flatten() {
            well.has_tip = true;
        }
    }

    fn locate(&self, well_name: &str) -> Option<(usize, usize)> {
        self.index.get(well_name).copied()
    }

    fn run(&self, start_well: &str, count: usize) -> Result<&[TipWell], TipError> {
        let (c, start) = self.run_bounds(start_well, count)?;
        Ok(&self.columns[c][start..start + count])
    }

    fn run_bounds(&self, start_well: &str, count: usize) -> Result<(usize, usize), TipError> {
        if count == 0 {
            return Err(TipError::InvalidTipCount);
        }
        let (c, start) = self
            .locate(start_well)
            .ok_or_else(|| TipError::UnknownWell(String::from(start_well)))?;
        if start + count > self.columns[c].len() {
            return Err(TipError::RunExceedsColumn {
                well: String::from(start_well),
                count,
            });
        }
        Ok((c, start))
    }
}

/// First index at or after `from` that starts `len` wells matching `has_tip`
fn find_run(column: &[TipWell], from: usize, len: usize, has_tip: bool) -> Option<usize> {
    if from + len > column.len() {
        return None;
    }
    (from..=column.len() - len)
        .find(|&i| column[i..i + len].iter().all(|well| well.has_tip == has_tip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use proptest::prelude::*;

    const ROWS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

    fn make_columns(columns: usize, rows: usize) -> Vec<Vec<String>> {
        (1..=columns)
            .map(|c| ROWS[..rows].iter().map(|r| format!("{r}{c}")).collect())
            .collect()
    }

    fn make_rack() -> TipTracker {
        TipTracker::new(&make_columns(12, 8))
    }

    #[test]
    fn test_full_rack() {
        let rack = make_rack();
        assert_eq!(rack.remaining(), 96);
        assert_eq!(rack.get_next_tip(1, None), Some("A1"));
        assert_eq!(rack.get_next_tip(8, None), Some("A1"));
        assert_eq!(rack.previous_tip(1), None);
    }

    #[test]
    fn test_next_tip_after_use() {
        let mut rack = make_rack();
        rack.use_tips("A1", 1, true).unwrap();
        assert_eq!(rack.get_next_tip(1, None), Some("B1"));
        // A partial column cannot serve eight channels
        assert_eq!(rack.get_next_tip(8, None), Some("A2"));
        assert_eq!(rack.get_next_tip(7, None), Some("B1"));
    }

    #[test]
    fn test_starting_well() {
        let rack = make_rack();
        assert_eq!(rack.get_next_tip(1, Some("C3")), Some("C3"));
        // Six wells from C3 fit, seven roll over to the next column
        assert_eq!(rack.get_next_tip(6, Some("C3")), Some("C3"));
        assert_eq!(rack.get_next_tip(7, Some("C3")), Some("A4"));
        assert_eq!(rack.get_next_tip(1, Some("Z9")), None);
    }

    #[test]
    fn test_zero_tips() {
        let rack = make_rack();
        assert_eq!(rack.get_next_tip(0, None), None);
        assert_eq!(rack.previous_tip(0), None);
    }

    #[test]
    fn test_exhausted_rack() {
        let mut rack = TipTracker::new(&make_columns(1, 2));
        rack.use_tips("A1", 2, true).unwrap();
        assert_eq!(rack.get_next_tip(1, None), None);
        assert_eq!(rack.remaining(), 0);
    }

    #[test]
    fn test_strict_use_is_atomic() {
        let mut rack = make_rack();
        rack.use_tips("C1", 1, true).unwrap();
        let before = rack.clone();
        assert_eq!(
            rack.use_tips("A1", 8, true),
            Err(TipError::NoTipAvailable(String::from("C1")))
        );
        assert_eq!(rack, before);
    }

    #[test]
    fn test_check_use_does_not_mutate() {
        let mut rack = make_rack();
        rack.use_tips("A1", 1, true).unwrap();
        assert!(rack.check_use("A1", 1, false).is_ok());
        assert_eq!(
            rack.check_use("A1", 1, true),
            Err(TipError::NoTipAvailable(String::from("A1")))
        );
        assert!(rack.check_return("A1", 1).is_ok());
        assert_eq!(rack.remaining(), 95);
    }

    #[test]
    fn test_lenient_use_marks_run() {
        let mut rack = make_rack();
        rack.use_tips("C1", 1, false).unwrap();
        rack.use_tips("A1", 8, false).unwrap();
        assert_eq!(rack.remaining(), 88);
        assert_eq!(rack.has_tip("C1"), Some(false));
    }

    #[test]
    fn test_run_overflow_errors_in_both_modes() {
        let mut rack = make_rack();
        for strict in [true, false] {
            assert_eq!(
                rack.use_tips("B1", 8, strict),
                Err(TipError::RunExceedsColumn {
                    well: String::from("B1"),
                    count: 8
                })
            );
        }
        assert_eq!(rack.remaining(), 96);
    }

    #[test]
    fn test_unknown_well() {
        let mut rack = make_rack();
        assert_eq!(
            rack.use_tips("Q1", 1, true),
            Err(TipError::UnknownWell(String::from("Q1")))
        );
        assert_eq!(rack.use_tips("A1", 0, true), Err(TipError::InvalidTipCount));
        assert_eq!(rack.has_tip("Q1"), None);
    }

    #[test]
    fn test_previous_tip() {
        let mut rack = make_rack();
        rack.use_tips("A1", 1, true).unwrap();
        rack.use_tips("B1", 1, true).unwrap();
        assert_eq!(rack.previous_tip(1), Some("A1"));
        assert_eq!(rack.previous_tip(2), Some("A1"));
        assert_eq!(rack.previous_tip(3), None);
    }

    #[test]
    fn test_return_tips() {
        let mut rack = make_rack();
        rack.use_tips("A2", 8, true).unwrap();
        rack.return_tips("A2", 8).unwrap();
        assert_eq!(rack.remaining(), 96);
        assert_eq!(
            rack.return_tips("A2", 1),
            Err(TipError::TipAlreadyPresent(String::from("A2")))
        );
    }

    #[test]
    fn test_reset() {
        let mut rack = make_rack();
        rack.use_tips("A1", 8, true).unwrap();
        rack.use_tips("A2", 8, true).unwrap();
        rack.reset();
        assert_eq!(rack, make_rack());
    }

    proptest! {
        #[test]
        fn test_use_then_return_restores(column in 0usize..12, index in 0usize..8, len in 1usize..=8) {
            prop_assume!(index + len <= 8);
            let mut rack = make_rack();
            let well = format!("{}{}", ROWS[index], column + 1);
            rack.use_tips(&well, len, true).unwrap();
            prop_assert_eq!(rack.remaining(), 96 - len);
            rack.return_tips(&well, len).unwrap();
            prop_assert_eq!(rack, make_rack());
        }

        #[test]
        fn test_next_tip_run_is_full(used in proptest::collection::vec((0usize..12, 0usize..8), 0..40), n in 1usize..=8) {
            let mut rack = make_rack();
            for (c, i) in used {
                let _ = rack.use_tips(&format!("{}{}", ROWS[i], c + 1), 1, false);
            }
            if let Some(start) = rack.get_next_tip(n, None) {
                let start = String::from(start);
                let (c, i) = rack.locate(&start).unwrap();
                prop_assert!(i + n <= 8);
                for row in &ROWS[i..i + n] {
                    let name = format!("{}{}", row, c + 1);
                    prop_assert_eq!(rack.has_tip(&name), Some(true));
                }
            }
        }
    }
}
