//! Single-feature fit: split, refine, score, and build the WoE table
//!
//! Errors here are fatal: the caller is told which constraint failed. Only
//! the search adapter downgrades them to sentinel-scored trials.

use serde::Serialize;

use super::cohort::CohortGrid;
use super::config::{BinnerConfig, RefineConfig, SplitParams};
use super::error::Result;
use super::objective::{composite_score, information_value, ks_statistic, WoeRow};
use super::refine::{refine, Direction};
use super::split::SplitStrategy;
use super::stability::{score_stability, StabilityMetrics};
use super::{BinSet, Observation};

/// Everything a caller gets from one fit: the final bins, the metrics, the
/// composite score, and the WoE transform table for downstream encoding
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub bins: BinSet,
    /// Monotonic direction the refiner enforced, if any
    pub direction: Option<Direction>,
    pub iv: f64,
    pub ks: f64,
    /// Bin -> `ln(event_share / non_event_share)` transform table
    pub woe: Vec<WoeRow>,
    /// Present when stability checking was requested
    pub stability: Option<StabilityMetrics>,
    /// Composite objective under the configured weights
    pub score: f64,
    /// The refinement collapsed to a single bin (usable but trivial)
    pub degenerate: bool,
}

/// Fit one feature: initial split, monotonic refinement, stability scoring
/// (when requested), and the composite objective.
pub fn fit(
    observations: &[Observation],
    splitter: &dyn SplitStrategy,
    params: &SplitParams,
    config: &BinnerConfig,
) -> Result<FitReport> {
    let initial = splitter.initial_split(observations, params)?;
    let refinement = refine(
        initial,
        observations,
        &RefineConfig::from_trial(config, params),
    )?;

    let stability = if config.check_stability {
        let grid = CohortGrid::aggregate(&refinement.bins, observations, true)?;
        Some(score_stability(&grid, config.reference_cohort)?)
    } else {
        None
    };

    let breakdown = information_value(&refinement.bins);
    let ks = match &stability {
        Some(metrics) => metrics.ks,
        None => ks_statistic(&refinement.bins),
    };
    let separability = stability.as_ref().map_or(0.0, |m| m.separability);
    let score = composite_score(separability, breakdown.iv, ks, &config.weights);

    Ok(FitReport {
        bins: refinement.bins,
        direction: refinement.direction,
        iv: breakdown.iv,
        ks,
        woe: breakdown.rows,
        stability,
        score,
        degenerate: refinement.degenerate,
    })
}
