//! Configuration for bin refinement and objective scoring
//!
//! All configuration is passed as explicit immutable values into every call;
//! nothing is held as shared mutable state, so refinement and scoring stay
//! pure and trivially parallelizable.

use serde::Serialize;

use super::observation::CohortId;

/// Monotonicity requirement for the event-rate pattern across bins
///
/// Monotone event rates are important for credit scoring and regulatory
/// compliance: a score band must not get riskier and then safer again as the
/// underlying feature grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Monotonicity {
    /// No direction enforced - only the minimum event-rate gap applies
    None,
    /// Event rate must not decrease from one bin to the next
    Increasing,
    /// Event rate must not increase from one bin to the next
    Decreasing,
    /// Detect the direction from the sign of the unconstrained
    /// ordinal/event-rate correlation
    #[default]
    Auto,
}

impl std::fmt::Display for Monotonicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Monotonicity::None => write!(f, "none"),
            Monotonicity::Increasing => write!(f, "increasing"),
            Monotonicity::Decreasing => write!(f, "decreasing"),
            Monotonicity::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for Monotonicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Monotonicity::None),
            "increasing" | "asc" | "ascending" => Ok(Monotonicity::Increasing),
            "decreasing" | "desc" | "descending" => Ok(Monotonicity::Decreasing),
            "auto" => Ok(Monotonicity::Auto),
            _ => Err(format!(
                "Unknown monotonicity: '{}'. Use 'none', 'increasing', 'decreasing', or 'auto'.",
                s
            )),
        }
    }
}

/// Weights of the composite search objective
/// `score = separability * w_sep + iv * w_iv + ks * w_ks`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectiveWeights {
    pub separability: f64,
    pub iv: f64,
    pub ks: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            separability: 0.7,
            iv: 0.2,
            ks: 0.1,
        }
    }
}

/// The hyperparameter vector explored by the external search
///
/// `max_bins` bounds the initial split; `min_bin_size` (population fraction)
/// and `min_event_rate_diff` are the refiner's hard constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitParams {
    /// Upper bound on the number of bins in the initial split
    pub max_bins: usize,
    /// Minimum population fraction per final bin
    pub min_bin_size: f64,
    /// Minimum |event-rate difference| between adjacent final bins
    pub min_event_rate_diff: f64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            max_bins: 6,
            min_bin_size: 0.05,
            min_event_rate_diff: 0.02,
        }
    }
}

/// Non-searchable configuration for a single fit
#[derive(Debug, Clone, Default, Serialize)]
pub struct BinnerConfig {
    pub monotonic: Monotonicity,
    /// Compute per-cohort stability metrics (requires >= 2 distinct cohorts)
    pub check_stability: bool,
    /// Cohort the PSI comparison is anchored on; earliest cohort when `None`
    pub reference_cohort: Option<CohortId>,
    pub weights: ObjectiveWeights,
}

/// Hard constraints handed to the refiner for one run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RefineConfig {
    pub monotonic: Monotonicity,
    pub min_event_rate_diff: f64,
    pub min_bin_size: f64,
}

impl RefineConfig {
    /// Combine the fixed configuration with one search trial's hyperparameters
    pub fn from_trial(config: &BinnerConfig, params: &SplitParams) -> Self {
        Self {
            monotonic: config.monotonic,
            min_event_rate_diff: params.min_event_rate_diff,
            min_bin_size: params.min_bin_size,
        }
    }
}
