//! Temporal-stability scoring over cohort-aggregated bins
//!
//! Computes PSI against a reference cohort, KS on the full aggregation, and
//! a temporal-separability score rewarding bins whose event-rate curves stay
//! apart across cohorts instead of crossing or converging.

use serde::Serialize;

use super::cohort::CohortGrid;
use super::error::{BinningError, Result};
use super::objective::{ks_from_counts, SHARE_FLOOR};
use super::observation::CohortId;

/// Metadata about numeric guard substitutions made while scoring.
/// Reported on the metrics record, never hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardLog {
    /// Zero population shares floored at the epsilon before a PSI log
    pub share_floor_hits: u32,
    /// (bin, cohort) cells with zero population whose event rate was taken
    /// as 0.0 in the separability series
    pub empty_cells: u32,
}

/// Spread of one bin's event-rate series across cohorts
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BinStability {
    /// Population standard deviation of the series
    pub std_dev: f64,
    /// Max minus min of the series
    pub range: f64,
}

/// Per-feature stability record, recomputed after every refinement step
/// that changes the BinSet
#[derive(Debug, Clone, Serialize)]
pub struct StabilityMetrics {
    /// Cohort the PSI comparison is anchored on
    pub reference: CohortId,
    /// All cohorts in temporal order
    pub cohorts: Vec<CohortId>,
    /// PSI of each non-reference cohort against the reference
    pub psi_by_cohort: Vec<(CohortId, f64)>,
    pub psi_mean: f64,
    pub psi_max: f64,
    /// KS separation on the full (cohort-summed) aggregation
    pub ks: f64,
    /// Mean pairwise distance between bins' event-rate curves
    pub separability: f64,
    /// Event rate per bin per cohort, `series[bin][cohort_idx]`
    pub event_rate_series: Vec<Vec<f64>>,
    /// Spread of each bin's series
    pub bin_stability: Vec<BinStability>,
    pub guards: GuardLog,
}

/// Score the stability of a bin set from its cohort grid.
///
/// The reference cohort defaults to the earliest; an unknown reference falls
/// back to the earliest with a warning. Fails with `EmptyCohort` for fewer
/// than 2 cohorts and `InsufficientData` when any bin has zero population.
pub fn score_stability(
    grid: &CohortGrid,
    reference: Option<CohortId>,
) -> Result<StabilityMetrics> {
    let n_bins = grid.n_bins();
    let n_cohorts = grid.n_cohorts();
    if n_cohorts < 2 {
        return Err(BinningError::EmptyCohort { cohorts: n_cohorts });
    }
    for bin in 0..n_bins {
        if grid.bin_count(bin) == 0 {
            return Err(BinningError::InsufficientData {
                detail: format!("bin {} has zero population", bin),
            });
        }
    }

    let mut guards = GuardLog::default();

    let ref_idx = match reference {
        Some(cohort) => match grid.position_of(cohort) {
            Some(idx) => idx,
            None => {
                eprintln!(
                    "Warning: reference cohort {} not present, falling back to earliest",
                    cohort
                );
                0
            }
        },
        None => 0,
    };

    // PSI of each non-reference cohort's bin population shares
    let ref_total = grid.cohort_count(ref_idx) as f64;
    let ref_shares: Vec<f64> = (0..n_bins)
        .map(|bin| grid.cell(bin, ref_idx).count as f64 / ref_total)
        .collect();

    let mut psi_by_cohort = Vec::with_capacity(n_cohorts - 1);
    for cohort_idx in 0..n_cohorts {
        if cohort_idx == ref_idx {
            continue;
        }
        let total = grid.cohort_count(cohort_idx) as f64;
        let mut psi = 0.0;
        for bin in 0..n_bins {
            let mut p = if total > 0.0 {
                grid.cell(bin, cohort_idx).count as f64 / total
            } else {
                0.0
            };
            let mut p_ref = ref_shares[bin];
            if p <= 0.0 {
                p = SHARE_FLOOR;
                guards.share_floor_hits += 1;
            }
            if p_ref <= 0.0 {
                p_ref = SHARE_FLOOR;
                guards.share_floor_hits += 1;
            }
            psi += (p - p_ref) * (p / p_ref).ln();
        }
        psi_by_cohort.push((grid.cohorts()[cohort_idx], psi));
    }
    let psi_mean =
        psi_by_cohort.iter().map(|(_, p)| p).sum::<f64>() / psi_by_cohort.len() as f64;
    let psi_max = psi_by_cohort
        .iter()
        .map(|(_, p)| *p)
        .fold(f64::NEG_INFINITY, f64::max);

    // KS on the cohort-summed aggregation
    let events: Vec<u64> = (0..n_bins).map(|bin| grid.bin_events(bin)).collect();
    let non_events: Vec<u64> = (0..n_bins)
        .map(|bin| grid.bin_count(bin) - grid.bin_events(bin))
        .collect();
    let ks = ks_from_counts(&events, &non_events);

    // event-rate series per bin; empty cells contribute 0.0 and are flagged
    let mut event_rate_series = Vec::with_capacity(n_bins);
    for bin in 0..n_bins {
        let mut series = Vec::with_capacity(n_cohorts);
        for cohort_idx in 0..n_cohorts {
            let cell = grid.cell(bin, cohort_idx);
            if cell.count == 0 {
                guards.empty_cells += 1;
                series.push(0.0);
            } else {
                series.push(cell.events as f64 / cell.count as f64);
            }
        }
        event_rate_series.push(series);
    }

    let separability = separability_score(&event_rate_series);
    let bin_stability = event_rate_series.iter().map(|s| series_spread(s)).collect();

    Ok(StabilityMetrics {
        reference: grid.cohorts()[ref_idx],
        cohorts: grid.cohorts().to_vec(),
        psi_by_cohort,
        psi_mean,
        psi_max,
        ks,
        separability,
        event_rate_series,
        bin_stability,
        guards,
    })
}

/// Mean over bin pairs of the mean absolute cohort-by-cohort event-rate
/// difference. Symmetric and pairwise, so invariant to any cohort relabeling
/// that preserves order. 0.0 with fewer than 2 bins.
fn separability_score(series: &[Vec<f64>]) -> f64 {
    let n_bins = series.len();
    if n_bins < 2 {
        return 0.0;
    }
    let mut distances = Vec::with_capacity(n_bins * (n_bins - 1) / 2);
    for i in 0..n_bins {
        for j in (i + 1)..n_bins {
            let n = series[i].len() as f64;
            let dist = series[i]
                .iter()
                .zip(series[j].iter())
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / n;
            distances.push(dist);
        }
    }
    distances.iter().sum::<f64>() / distances.len() as f64
}

fn series_spread(series: &[f64]) -> BinStability {
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let var = series.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    BinStability {
        std_dev: var.sqrt(),
        range: max - min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::binset::BinSet;
    use crate::engine::observation::Observation;

    /// Two bins, two cohorts, identical event rate everywhere
    fn flat_observations() -> Vec<Observation> {
        let mut obs = Vec::new();
        for &cohort in &[202301, 202302] {
            for bin_center in [5.0, 15.0] {
                for k in 0..10u8 {
                    obs.push(Observation::numeric(bin_center, u8::from(k < 5), cohort));
                }
            }
        }
        obs
    }

    fn grid_of(obs: &[Observation], edges: &[f64]) -> CohortGrid {
        let bins = BinSet::from_numeric_edges(edges);
        CohortGrid::aggregate(&bins, obs, true).unwrap()
    }

    #[test]
    fn test_flat_feature_zero_psi_and_separability() {
        let grid = grid_of(&flat_observations(), &[10.0]);
        let metrics = score_stability(&grid, None).unwrap();
        assert!(metrics.psi_mean.abs() < 1e-12);
        assert!(metrics.psi_max.abs() < 1e-12);
        assert!(metrics.separability.abs() < 1e-12);
        assert_eq!(metrics.guards, GuardLog::default());
    }

    #[test]
    fn test_psi_non_negative_under_drift() {
        // population shifts to the upper bin in the second cohort
        let mut obs = Vec::new();
        for k in 0..20u8 {
            obs.push(Observation::numeric(5.0, u8::from(k < 4), 202301));
        }
        for k in 0..5u8 {
            obs.push(Observation::numeric(15.0, u8::from(k < 2), 202301));
        }
        for k in 0..5u8 {
            obs.push(Observation::numeric(5.0, u8::from(k < 1), 202302));
        }
        for k in 0..20u8 {
            obs.push(Observation::numeric(15.0, u8::from(k < 9), 202302));
        }
        let grid = grid_of(&obs, &[10.0]);
        let metrics = score_stability(&grid, None).unwrap();
        assert!(metrics.psi_mean > 0.0);
        assert!(metrics.psi_max >= metrics.psi_mean);
    }

    #[test]
    fn test_separated_curves_score_higher_than_converging() {
        // bins stay ~0.1 vs ~0.5 apart in both cohorts
        let mut apart = Vec::new();
        for &cohort in &[202301, 202302] {
            for k in 0..10u8 {
                apart.push(Observation::numeric(5.0, u8::from(k < 1), cohort));
            }
            for k in 0..10u8 {
                apart.push(Observation::numeric(15.0, u8::from(k < 5), cohort));
            }
        }
        // bins converge to the same rate in the second cohort
        let mut converging = Vec::new();
        for k in 0..10u8 {
            converging.push(Observation::numeric(5.0, u8::from(k < 1), 202301));
        }
        for k in 0..10u8 {
            converging.push(Observation::numeric(15.0, u8::from(k < 5), 202301));
        }
        for k in 0..10u8 {
            converging.push(Observation::numeric(5.0, u8::from(k < 3), 202302));
        }
        for k in 0..10u8 {
            converging.push(Observation::numeric(15.0, u8::from(k < 3), 202302));
        }

        let sep_apart = score_stability(&grid_of(&apart, &[10.0]), None)
            .unwrap()
            .separability;
        let sep_conv = score_stability(&grid_of(&converging, &[10.0]), None)
            .unwrap()
            .separability;
        assert!(sep_apart > sep_conv);
    }

    #[test]
    fn test_zero_population_bin_fails() {
        // nothing ever lands in the middle bin
        let obs = vec![
            Observation::numeric(5.0, 1, 202301),
            Observation::numeric(25.0, 0, 202301),
            Observation::numeric(5.0, 0, 202302),
            Observation::numeric(25.0, 1, 202302),
        ];
        let grid = grid_of(&obs, &[10.0, 20.0]);
        let err = score_stability(&grid, None).unwrap_err();
        assert!(matches!(err, BinningError::InsufficientData { .. }));
    }

    #[test]
    fn test_explicit_reference_cohort() {
        let grid = grid_of(&flat_observations(), &[10.0]);
        let metrics = score_stability(&grid, Some(202302)).unwrap();
        assert_eq!(metrics.reference, 202302);
        assert_eq!(metrics.psi_by_cohort.len(), 1);
        assert_eq!(metrics.psi_by_cohort[0].0, 202301);
    }

    #[test]
    fn test_empty_cell_guard_is_flagged() {
        let obs = vec![
            Observation::numeric(5.0, 0, 202301),
            Observation::numeric(15.0, 1, 202301),
            Observation::numeric(5.0, 1, 202302),
            // upper bin empty in 202302
        ];
        let grid = grid_of(&obs, &[10.0]);
        let metrics = score_stability(&grid, None).unwrap();
        assert_eq!(metrics.guards.empty_cells, 1);
        assert!(metrics.guards.share_floor_hits > 0);
        assert_eq!(metrics.event_rate_series[1][1], 0.0);
    }

    #[test]
    fn test_bin_stability_spread() {
        let grid = grid_of(&flat_observations(), &[10.0]);
        let metrics = score_stability(&grid, None).unwrap();
        for bs in &metrics.bin_stability {
            assert!(bs.std_dev.abs() < 1e-12);
            assert!(bs.range.abs() < 1e-12);
        }
    }
}
