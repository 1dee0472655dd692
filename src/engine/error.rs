//! Error taxonomy for the binning engine
//!
//! Every variant is recoverable at the search-adapter boundary (a failed
//! trial gets a sentinel score) but fatal from a direct `fit` call: the
//! caller is told which constraint failed instead of receiving a silently
//! degraded result.

use thiserror::Error;

/// Errors raised by aggregation, stability scoring, and refinement
#[derive(Debug, Error)]
pub enum BinningError {
    /// Stability checking needs variation across time to be meaningful.
    #[error("stability check requires at least 2 distinct cohorts, found {cohorts}")]
    EmptyCohort { cohorts: usize },

    /// A bin (or the whole input) has no population to compute rates from.
    #[error("insufficient data: {detail}")]
    InsufficientData { detail: String },

    /// Contradictory hard constraints prevent the refiner from converging,
    /// e.g. a minimum bin-size fraction above 1.0.
    #[error("constraints cannot be satisfied: {detail}")]
    UnsatisfiableConstraint { detail: String },

    /// An observation fell outside every bin: the initial split violated its
    /// "valid exhaustive partition" contract.
    #[error("value {value} falls outside every bin; the initial split is not an exhaustive partition")]
    InvalidPartition { value: String },
}

pub type Result<T> = std::result::Result<T, BinningError>;
