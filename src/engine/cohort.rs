//! Cohort aggregation: per-(bin, cohort) tallies
//!
//! The grid is a flat arena-style table indexed by `(bin_index, cohort_index)`
//! rather than nested per-bin sequences, giving O(1) cell lookup and no
//! cyclic references. It is a derived view: recomputed in full whenever the
//! `BinSet` changes.

use serde::Serialize;

use super::binset::BinSet;
use super::error::{BinningError, Result};
use super::observation::{CohortId, Observation};

/// Count and event tally of one (bin, cohort) cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellTally {
    pub count: u64,
    pub events: u64,
}

/// Tallies for every (bin, cohort) pair, zero-count cells included
///
/// Cells for cohorts with no observations in a bin are present with
/// `count = 0` rather than omitted, so downstream ratio computations can
/// detect undefined rates instead of silently skipping a period.
#[derive(Debug, Clone, Serialize)]
pub struct CohortGrid {
    /// Distinct cohort ids, ascending (temporal order)
    cohorts: Vec<CohortId>,
    n_bins: usize,
    /// Bin-major: `cells[bin * cohorts.len() + cohort_idx]`
    cells: Vec<CellTally>,
}

impl CohortGrid {
    /// Tally every observation into its (bin, cohort) cell.
    ///
    /// Fails with `EmptyCohort` when `check_stability` is set and fewer than
    /// 2 distinct cohorts exist, and with `InvalidPartition` when an
    /// observation is not covered by any bin.
    pub fn aggregate(
        bins: &BinSet,
        observations: &[Observation],
        check_stability: bool,
    ) -> Result<Self> {
        let mut cohorts: Vec<CohortId> = observations.iter().map(|o| o.cohort).collect();
        cohorts.sort_unstable();
        cohorts.dedup();

        if check_stability && cohorts.len() < 2 {
            return Err(BinningError::EmptyCohort {
                cohorts: cohorts.len(),
            });
        }

        let n_bins = bins.len();
        let mut cells = vec![CellTally::default(); n_bins * cohorts.len()];

        for obs in observations {
            let bin = bins
                .assign(&obs.value)
                .ok_or_else(|| BinningError::InvalidPartition {
                    value: obs.value.to_string(),
                })?;
            let cohort = match cohorts.binary_search(&obs.cohort) {
                Ok(i) => i,
                Err(_) => unreachable!("cohort ids were collected from these observations"),
            };
            let cell = &mut cells[bin * cohorts.len() + cohort];
            cell.count += 1;
            if obs.is_event() {
                cell.events += 1;
            }
        }

        Ok(Self {
            cohorts,
            n_bins,
            cells,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn n_cohorts(&self) -> usize {
        self.cohorts.len()
    }

    pub fn cohorts(&self) -> &[CohortId] {
        &self.cohorts
    }

    /// Index of a cohort id in temporal order, if present
    pub fn position_of(&self, cohort: CohortId) -> Option<usize> {
        self.cohorts.binary_search(&cohort).ok()
    }

    #[inline]
    pub fn cell(&self, bin: usize, cohort_idx: usize) -> CellTally {
        self.cells[bin * self.cohorts.len() + cohort_idx]
    }

    /// Total observations in a bin across all cohorts
    pub fn bin_count(&self, bin: usize) -> u64 {
        (0..self.cohorts.len())
            .map(|c| self.cell(bin, c).count)
            .sum()
    }

    /// Total events in a bin across all cohorts
    pub fn bin_events(&self, bin: usize) -> u64 {
        (0..self.cohorts.len())
            .map(|c| self.cell(bin, c).events)
            .sum()
    }

    /// Total observations in a cohort across all bins
    pub fn cohort_count(&self, cohort_idx: usize) -> u64 {
        (0..self.n_bins)
            .map(|b| self.cell(b, cohort_idx).count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cohort_observations() -> Vec<Observation> {
        vec![
            Observation::numeric(1.0, 0, 202301),
            Observation::numeric(2.0, 1, 202301),
            Observation::numeric(7.0, 1, 202301),
            Observation::numeric(1.5, 0, 202302),
            Observation::numeric(8.0, 1, 202302),
            Observation::numeric(9.0, 0, 202302),
        ]
    }

    #[test]
    fn test_aggregate_tallies_cells() {
        let bins = BinSet::from_numeric_edges(&[5.0]);
        let grid = CohortGrid::aggregate(&bins, &two_cohort_observations(), true).unwrap();

        assert_eq!(grid.n_bins(), 2);
        assert_eq!(grid.cohorts(), &[202301, 202302]);
        assert_eq!(
            grid.cell(0, 0),
            CellTally {
                count: 2,
                events: 1
            }
        );
        assert_eq!(
            grid.cell(1, 0),
            CellTally {
                count: 1,
                events: 1
            }
        );
        assert_eq!(
            grid.cell(0, 1),
            CellTally {
                count: 1,
                events: 0
            }
        );
        assert_eq!(
            grid.cell(1, 1),
            CellTally {
                count: 2,
                events: 1
            }
        );
    }

    #[test]
    fn test_zero_cells_are_present_not_omitted() {
        let bins = BinSet::from_numeric_edges(&[5.0]);
        // the upper bin has no observations in cohort 202302
        let obs = vec![
            Observation::numeric(1.0, 0, 202301),
            Observation::numeric(7.0, 1, 202301),
            Observation::numeric(2.0, 1, 202302),
        ];
        let grid = CohortGrid::aggregate(&bins, &obs, true).unwrap();
        assert_eq!(grid.cell(1, 1), CellTally::default());
    }

    #[test]
    fn test_single_cohort_fails_when_stability_requested() {
        let bins = BinSet::from_numeric_edges(&[5.0]);
        let obs = vec![
            Observation::numeric(1.0, 0, 202301),
            Observation::numeric(7.0, 1, 202301),
        ];
        let err = CohortGrid::aggregate(&bins, &obs, true).unwrap_err();
        assert!(matches!(err, BinningError::EmptyCohort { cohorts: 1 }));

        // without a stability request a single cohort is fine
        assert!(CohortGrid::aggregate(&bins, &obs, false).is_ok());
    }

    #[test]
    fn test_bin_and_cohort_totals() {
        let bins = BinSet::from_numeric_edges(&[5.0]);
        let grid = CohortGrid::aggregate(&bins, &two_cohort_observations(), true).unwrap();
        assert_eq!(grid.bin_count(0), 3);
        assert_eq!(grid.bin_events(0), 1);
        assert_eq!(grid.bin_count(1), 3);
        assert_eq!(grid.bin_events(1), 2);
        assert_eq!(grid.cohort_count(0), 3);
        assert_eq!(grid.cohort_count(1), 3);
    }

    #[test]
    fn test_position_of() {
        let bins = BinSet::from_numeric_edges(&[5.0]);
        let grid = CohortGrid::aggregate(&bins, &two_cohort_observations(), true).unwrap();
        assert_eq!(grid.position_of(202301), Some(0));
        assert_eq!(grid.position_of(202302), Some(1));
        assert_eq!(grid.position_of(209901), None);
    }
}
