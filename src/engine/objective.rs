//! Information value, WoE table, KS, and the composite search objective

use serde::Serialize;

use super::binset::BinSet;
use super::config::ObjectiveWeights;

/// Floor substituted for zero population shares before taking logs.
///
/// Shared by PSI, IV, and WoE. The substitution biases the metric upward for
/// near-empty bins, so every hit is counted and surfaced as metadata rather
/// than hidden.
pub(crate) const SHARE_FLOOR: f64 = 1e-4;

/// One row of the weight-of-evidence transform table
#[derive(Debug, Clone, Serialize)]
pub struct WoeRow {
    /// Bin label, e.g. `[-inf, 3.5000)` or `{A, B}`
    pub bin: String,
    pub count: u64,
    pub events: u64,
    pub non_events: u64,
    pub event_rate: f64,
    /// Fraction of the total population in this bin
    pub population_share: f64,
    /// `ln(event_share / non_event_share)`
    pub woe: f64,
    pub iv_contribution: f64,
}

/// Information value with its per-bin WoE breakdown
#[derive(Debug, Clone, Serialize)]
pub struct IvBreakdown {
    pub rows: Vec<WoeRow>,
    /// Total information value, `sum((es_i - ns_i) * ln(es_i / ns_i))`
    pub iv: f64,
    /// Number of zero shares floored at `SHARE_FLOOR`
    pub floor_hits: u32,
}

/// Classical information value over the final bins, with the WoE transform
/// table used by downstream feature encoding
pub fn information_value(bins: &BinSet) -> IvBreakdown {
    let total = bins.total_count() as f64;
    let total_events = bins.total_events() as f64;
    let total_non_events = total - total_events;

    let mut rows = Vec::with_capacity(bins.len());
    let mut floor_hits = 0u32;

    for bin in bins.iter() {
        let mut event_share = if total_events > 0.0 {
            bin.events as f64 / total_events
        } else {
            0.0
        };
        let mut non_event_share = if total_non_events > 0.0 {
            bin.non_events() as f64 / total_non_events
        } else {
            0.0
        };
        if event_share <= 0.0 {
            event_share = SHARE_FLOOR;
            floor_hits += 1;
        }
        if non_event_share <= 0.0 {
            non_event_share = SHARE_FLOOR;
            floor_hits += 1;
        }

        let woe = (event_share / non_event_share).ln();
        let iv_contribution = (event_share - non_event_share) * woe;

        rows.push(WoeRow {
            bin: bin.span.label(),
            count: bin.count,
            events: bin.events,
            non_events: bin.non_events(),
            event_rate: bin.event_rate(),
            population_share: if total > 0.0 {
                bin.count as f64 / total
            } else {
                0.0
            },
            woe,
            iv_contribution,
        });
    }

    let iv = rows.iter().map(|r| r.iv_contribution).sum();
    IvBreakdown {
        rows,
        iv,
        floor_hits,
    }
}

/// Kolmogorov-Smirnov separation over ordered bins: the maximum absolute
/// difference between the cumulative event and non-event distributions.
/// 0.0 when either class is absent entirely.
pub fn ks_statistic(bins: &BinSet) -> f64 {
    let events: Vec<u64> = bins.iter().map(|b| b.events).collect();
    let non_events: Vec<u64> = bins.iter().map(|b| b.non_events()).collect();
    ks_from_counts(&events, &non_events)
}

pub(crate) fn ks_from_counts(events: &[u64], non_events: &[u64]) -> f64 {
    let total_events: u64 = events.iter().sum();
    let total_non_events: u64 = non_events.iter().sum();
    if total_events == 0 || total_non_events == 0 {
        return 0.0;
    }

    let mut cum_events = 0u64;
    let mut cum_non_events = 0u64;
    let mut ks = 0.0f64;
    for (&e, &n) in events.iter().zip(non_events.iter()) {
        cum_events += e;
        cum_non_events += n;
        let gap = (cum_events as f64 / total_events as f64
            - cum_non_events as f64 / total_non_events as f64)
            .abs();
        if gap > ks {
            ks = gap;
        }
    }
    ks
}

/// The scalar ranking objective:
/// `w_sep * separability + w_iv * iv + w_ks * ks`.
/// Deterministic given a BinSet and its stability metrics.
pub fn composite_score(separability: f64, iv: f64, ks: f64, weights: &ObjectiveWeights) -> f64 {
    weights.separability * separability + weights.iv * iv + weights.ks * ks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::observation::Observation;

    fn binset_with_counts(cells: &[(u64, u64)]) -> BinSet {
        // cells: (count, events) per bin over value ranges 0..10, 10..20, ...
        let edges: Vec<f64> = (1..cells.len()).map(|i| i as f64 * 10.0).collect();
        let mut bins = BinSet::from_numeric_edges(&edges);
        let mut obs = Vec::new();
        for (i, &(count, events)) in cells.iter().enumerate() {
            let v = i as f64 * 10.0 + 5.0;
            for k in 0..count {
                obs.push(Observation::numeric(v, u8::from(k < events), 202301));
            }
        }
        bins.reaggregate(&obs).unwrap();
        bins
    }

    #[test]
    fn test_iv_non_negative() {
        let bins = binset_with_counts(&[(100, 5), (100, 20), (100, 60)]);
        let breakdown = information_value(&bins);
        assert!(breakdown.iv >= 0.0);
        for row in &breakdown.rows {
            assert!(row.iv_contribution >= 0.0);
        }
    }

    #[test]
    fn test_iv_zero_for_identical_share_distributions() {
        // every bin holds the same share of events and of non-events
        let bins = binset_with_counts(&[(100, 50), (100, 50), (100, 50)]);
        let breakdown = information_value(&bins);
        assert_eq!(breakdown.iv, 0.0);
        assert_eq!(breakdown.floor_hits, 0);
        for row in &breakdown.rows {
            assert_eq!(row.woe, 0.0);
        }
    }

    #[test]
    fn test_iv_floor_guard_counted() {
        // middle bin has zero events, so its event share is floored
        let bins = binset_with_counts(&[(100, 30), (100, 0), (100, 70)]);
        let breakdown = information_value(&bins);
        assert_eq!(breakdown.floor_hits, 1);
        assert!(breakdown.iv.is_finite());
    }

    #[test]
    fn test_ks_perfect_separation() {
        // all non-events in the first bin, all events in the last
        let bins = binset_with_counts(&[(50, 0), (50, 50)]);
        assert!((ks_statistic(&bins) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ks_no_separation() {
        let bins = binset_with_counts(&[(100, 50), (100, 50)]);
        assert_eq!(ks_statistic(&bins), 0.0);
    }

    #[test]
    fn test_ks_single_class_is_zero() {
        let bins = binset_with_counts(&[(100, 0), (100, 0)]);
        assert_eq!(ks_statistic(&bins), 0.0);
    }

    #[test]
    fn test_composite_score_weighting() {
        let weights = ObjectiveWeights {
            separability: 0.7,
            iv: 0.2,
            ks: 0.1,
        };
        let score = composite_score(0.5, 1.0, 0.3, &weights);
        assert!((score - (0.7 * 0.5 + 0.2 * 1.0 + 0.1 * 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_woe_table_shape() {
        let bins = binset_with_counts(&[(100, 10), (100, 40)]);
        let breakdown = information_value(&bins);
        assert_eq!(breakdown.rows.len(), 2);
        assert!(breakdown.rows[0].woe < breakdown.rows[1].woe);
        assert!((breakdown.rows[0].population_share - 0.5).abs() < 1e-12);
    }
}
