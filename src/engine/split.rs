//! Initial split generation behind a strategy interface
//!
//! The optimal-split procedure proper is an external collaborator: anything
//! that can produce a valid exhaustive partition satisfies [`SplitStrategy`].
//! The built-in implementations cover the common unsupervised starting
//! points (equal-frequency and equal-width prebins for numeric features,
//! per-category groups with rare-merge for categorical ones) so the engine
//! is usable stand-alone.

use super::binset::BinSet;
use super::config::SplitParams;
use super::error::{BinningError, Result};
use super::observation::{FeatureValue, Observation};

/// Default fraction below which a category is folded into the OTHER group
const DEFAULT_RARE_THRESHOLD: f64 = 0.01;

/// Capability interface of the external initial-split generator.
///
/// No assumptions are made about the implementation beyond "produces a valid
/// exhaustive partition of the observed domain"; a partition that is not
/// exhaustive surfaces as `InvalidPartition` during aggregation.
pub trait SplitStrategy {
    fn initial_split(&self, observations: &[Observation], params: &SplitParams)
        -> Result<BinSet>;
}

/// Equal-frequency prebins: up to `max_bins` bins with roughly equal
/// population, edges placed at observed values
#[derive(Debug, Clone)]
pub struct QuantileSplit {
    /// Categorical features only: rare-category fraction folded into OTHER
    pub rare_threshold: f64,
}

impl Default for QuantileSplit {
    fn default() -> Self {
        Self {
            rare_threshold: DEFAULT_RARE_THRESHOLD,
        }
    }
}

impl SplitStrategy for QuantileSplit {
    fn initial_split(
        &self,
        observations: &[Observation],
        params: &SplitParams,
    ) -> Result<BinSet> {
        match feature_kind(observations, params)? {
            FeatureKind::Numeric => Ok(quantile_split(observations, params.max_bins)),
            FeatureKind::Categorical => {
                categorical_split(observations, self.rare_threshold, params.max_bins)
            }
        }
    }
}

/// Equal-width prebins: up to `max_bins` bins of uniform width over the
/// observed value range
#[derive(Debug, Clone)]
pub struct EqualWidthSplit {
    /// Categorical features only: rare-category fraction folded into OTHER
    pub rare_threshold: f64,
}

impl Default for EqualWidthSplit {
    fn default() -> Self {
        Self {
            rare_threshold: DEFAULT_RARE_THRESHOLD,
        }
    }
}

impl SplitStrategy for EqualWidthSplit {
    fn initial_split(
        &self,
        observations: &[Observation],
        params: &SplitParams,
    ) -> Result<BinSet> {
        match feature_kind(observations, params)? {
            FeatureKind::Numeric => Ok(equal_width_split(observations, params.max_bins)),
            FeatureKind::Categorical => {
                categorical_split(observations, self.rare_threshold, params.max_bins)
            }
        }
    }
}

enum FeatureKind {
    Numeric,
    Categorical,
}

/// Decide the feature kind from the first observation; mixed-kind inputs are
/// caught later by aggregation as `InvalidPartition`
fn feature_kind(observations: &[Observation], params: &SplitParams) -> Result<FeatureKind> {
    if params.max_bins == 0 {
        return Err(BinningError::UnsatisfiableConstraint {
            detail: "max_bins must be at least 1".to_string(),
        });
    }
    match observations.first() {
        Some(obs) => Ok(match obs.value {
            FeatureValue::Numeric(_) => FeatureKind::Numeric,
            FeatureValue::Categorical(_) => FeatureKind::Categorical,
        }),
        None => Err(BinningError::InsufficientData {
            detail: "no observations to split".to_string(),
        }),
    }
}

fn quantile_split(observations: &[Observation], max_bins: usize) -> BinSet {
    let mut values: Vec<f64> = observations
        .iter()
        .filter_map(|o| match o.value {
            FeatureValue::Numeric(v) => Some(v),
            FeatureValue::Categorical(_) => None,
        })
        .collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = values.len();
    let per_bin = (n + max_bins - 1) / max_bins;

    let mut edges: Vec<f64> = Vec::new();
    let mut idx = per_bin;
    while idx < n {
        let edge = values[idx];
        // skip duplicate edges (and edges at the minimum, which would leave
        // an empty leading bin) so intervals stay strictly increasing
        if edges.last().map_or(edge > values[0], |&last| edge > last) {
            edges.push(edge);
        }
        idx += per_bin;
    }
    BinSet::from_numeric_edges(&edges)
}

fn equal_width_split(observations: &[Observation], max_bins: usize) -> BinSet {
    let values: Vec<f64> = observations
        .iter()
        .filter_map(|o| match o.value {
            FeatureValue::Numeric(v) => Some(v),
            FeatureValue::Categorical(_) => None,
        })
        .collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !(max > min) {
        return BinSet::from_numeric_edges(&[]);
    }

    let width = (max - min) / max_bins as f64;
    let mut edges: Vec<f64> = Vec::new();
    for i in 1..max_bins {
        let edge = min + width * i as f64;
        if edges.last().map_or(true, |&last| edge > last) {
            edges.push(edge);
        }
    }
    BinSet::from_numeric_edges(&edges)
}

/// One group per category ordered by ascending event rate, with rare
/// categories folded into an OTHER group first; groups beyond `max_bins`
/// are merged smallest-rate-gap-first (leftmost on ties)
fn categorical_split(
    observations: &[Observation],
    rare_threshold: f64,
    max_bins: usize,
) -> Result<BinSet> {
    let mut tallies: Vec<(String, u64, u64)> = Vec::new(); // (category, count, events)
    let mut total = 0u64;
    for obs in observations {
        let category = match &obs.value {
            FeatureValue::Categorical(c) => c,
            FeatureValue::Numeric(_) => continue,
        };
        total += 1;
        match tallies.iter().position(|(c, _, _)| c == category) {
            Some(i) => {
                tallies[i].1 += 1;
                if obs.is_event() {
                    tallies[i].2 += 1;
                }
            }
            None => tallies.push((category.clone(), 1, u64::from(obs.is_event()))),
        }
    }
    if total == 0 {
        return Err(BinningError::InsufficientData {
            detail: "no categorical observations to split".to_string(),
        });
    }

    // fold rare categories into OTHER
    let floor = rare_threshold * total as f64;
    let mut groups: Vec<(Vec<String>, u64, u64)> = Vec::new();
    let mut other: (Vec<String>, u64, u64) = (Vec::new(), 0, 0);
    for (category, count, events) in tallies {
        if (count as f64) < floor {
            other.0.push(category);
            other.1 += count;
            other.2 += events;
        } else {
            groups.push((vec![category], count, events));
        }
    }
    if !other.0.is_empty() {
        groups.push(other);
    }

    // order groups by ascending event rate; category name breaks exact ties
    // so the ordering never depends on input storage order
    groups.sort_by(|a, b| {
        let rate_a = a.2 as f64 / a.1 as f64;
        let rate_b = b.2 as f64 / b.1 as f64;
        rate_a
            .partial_cmp(&rate_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    // respect the max_bins bound by merging the closest-rate neighbours
    while groups.len() > max_bins {
        let mut best = 0usize;
        let mut best_gap = f64::INFINITY;
        for i in 0..groups.len() - 1 {
            let rate_i = groups[i].2 as f64 / groups[i].1 as f64;
            let rate_j = groups[i + 1].2 as f64 / groups[i + 1].1 as f64;
            let gap = rate_j - rate_i;
            if gap < best_gap {
                best_gap = gap;
                best = i;
            }
        }
        let (cats, count, events) = groups.remove(best + 1);
        groups[best].0.extend(cats);
        groups[best].1 += count;
        groups[best].2 += events;
    }

    Ok(BinSet::from_category_groups(
        groups.into_iter().map(|(cats, _, _)| cats).collect(),
    ))
}
