//! Bins and ordered bin sets
//!
//! A `BinSet` is the ordered partition of one feature's observed domain at
//! one refinement step. Aggregates (count, events) are always recomputed in
//! full from the observations, never patched incrementally, so there is no
//! stale-state invariant to maintain.

use serde::Serialize;

use super::error::{BinningError, Result};
use super::observation::{FeatureValue, Observation};

/// The domain slice a bin covers: a half-open numeric interval or a group
/// of categories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BinSpan {
    /// `[lower, upper)`; the first bin's lower is `-inf`, the last bin's
    /// upper is `+inf`, so the set covers the whole numeric line
    Interval { lower: f64, upper: f64 },
    Categories(Vec<String>),
}

impl BinSpan {
    /// Whether a feature value falls inside this span.
    /// A value of the wrong kind (numeric vs categorical) never matches.
    pub fn contains(&self, value: &FeatureValue) -> bool {
        match (self, value) {
            (BinSpan::Interval { lower, upper }, FeatureValue::Numeric(v)) => {
                v >= lower && v < upper
            }
            (BinSpan::Categories(cats), FeatureValue::Categorical(c)) => {
                cats.iter().any(|cat| cat == c)
            }
            _ => false,
        }
    }

    /// Human-readable label, e.g. `[-inf, 3.50)` or `{A, B}`
    pub fn label(&self) -> String {
        match self {
            BinSpan::Interval { lower, upper } => {
                let fmt_bound = |b: f64| {
                    if b == f64::NEG_INFINITY {
                        "-inf".to_string()
                    } else if b == f64::INFINITY {
                        "inf".to_string()
                    } else {
                        format!("{:.4}", b)
                    }
                };
                format!("[{}, {})", fmt_bound(*lower), fmt_bound(*upper))
            }
            BinSpan::Categories(cats) => format!("{{{}}}", cats.join(", ")),
        }
    }
}

/// One bin with its aggregates derived from the current observation set
#[derive(Debug, Clone, Serialize)]
pub struct Bin {
    pub span: BinSpan,
    /// Total observations assigned to this bin
    pub count: u64,
    /// Observations with label = 1
    pub events: u64,
}

impl Bin {
    pub fn empty(span: BinSpan) -> Self {
        Self {
            span,
            count: 0,
            events: 0,
        }
    }

    #[inline]
    pub fn non_events(&self) -> u64 {
        self.count - self.events
    }

    /// Fraction of observations in this bin with label = 1; 0.0 for an
    /// empty bin
    #[inline]
    pub fn event_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.events as f64 / self.count as f64
        }
    }
}

/// Ordered sequence of bins partitioning one feature's observed domain
///
/// Invariants: bins are mutually exclusive and exhaustive over the observed
/// domain; for numeric features the ordinal position increases strictly with
/// the interval boundary. One refinement run owns its `BinSet` exclusively.
#[derive(Debug, Clone, Serialize)]
pub struct BinSet {
    bins: Vec<Bin>,
}

impl BinSet {
    /// Build numeric bins from interior cut points (strictly increasing).
    /// `k` edges produce `k + 1` bins spanning `(-inf, +inf)`.
    pub fn from_numeric_edges(edges: &[f64]) -> Self {
        let mut bounds = Vec::with_capacity(edges.len() + 2);
        bounds.push(f64::NEG_INFINITY);
        bounds.extend_from_slice(edges);
        bounds.push(f64::INFINITY);

        let bins = bounds
            .windows(2)
            .map(|w| {
                Bin::empty(BinSpan::Interval {
                    lower: w[0],
                    upper: w[1],
                })
            })
            .collect();
        Self { bins }
    }

    /// Build categorical bins from ordered category groups
    pub fn from_category_groups(groups: Vec<Vec<String>>) -> Self {
        let bins = groups
            .into_iter()
            .map(|g| Bin::empty(BinSpan::Categories(g)))
            .collect();
        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bin> {
        self.bins.iter()
    }

    /// Index of the bin containing `value`, or `None` if the partition does
    /// not cover it (a contract violation surfaced by the aggregator)
    pub fn assign(&self, value: &FeatureValue) -> Option<usize> {
        self.bins.iter().position(|b| b.span.contains(value))
    }

    /// Recompute every bin's count and events from scratch.
    /// Fails with `InvalidPartition` if any observation falls outside all bins.
    pub fn reaggregate(&mut self, observations: &[Observation]) -> Result<()> {
        for bin in &mut self.bins {
            bin.count = 0;
            bin.events = 0;
        }
        for obs in observations {
            let idx = self
                .assign(&obs.value)
                .ok_or_else(|| BinningError::InvalidPartition {
                    value: obs.value.to_string(),
                })?;
            let bin = &mut self.bins[idx];
            bin.count += 1;
            if obs.is_event() {
                bin.events += 1;
            }
        }
        Ok(())
    }

    /// Merge bins `i` and `i + 1` into one bin whose span is the convex hull
    /// of the two intervals (or the union of the two category groups)
    pub fn merge_adjacent(&mut self, i: usize) {
        let right = self.bins.remove(i + 1);
        let left = &mut self.bins[i];
        left.span = merged_span(&left.span, &right.span);
        left.count += right.count;
        left.events += right.events;
    }

    pub fn total_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn total_events(&self) -> u64 {
        self.bins.iter().map(|b| b.events).sum()
    }

    pub fn event_rates(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.event_rate()).collect()
    }
}

fn merged_span(left: &BinSpan, right: &BinSpan) -> BinSpan {
    match (left, right) {
        (BinSpan::Interval { lower, .. }, BinSpan::Interval { upper, .. }) => BinSpan::Interval {
            lower: *lower,
            upper: *upper,
        },
        (BinSpan::Categories(a), BinSpan::Categories(b)) => {
            let mut cats = a.clone();
            cats.extend(b.iter().cloned());
            BinSpan::Categories(cats)
        }
        // A BinSet is homogeneous by construction
        _ => unreachable!("adjacent bins always share a span kind"),
    }
}
