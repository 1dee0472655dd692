//! Monotonic bin refinement
//!
//! Iteratively merges adjacent bins until the event rates are monotone in
//! the configured direction, every adjacent gap meets the minimum event-rate
//! difference, and no bin falls below the minimum population fraction.
//!
//! Merging is greedy and leftmost-first: when several pairs violate at once,
//! the lowest ordinal pair is merged, making the output deterministic and
//! auditable at the cost of global optimality. Each merge strictly reduces
//! the bin count, bounded below by one, so the loop always converges.

use serde::Serialize;

use super::binset::BinSet;
use super::config::{Monotonicity, RefineConfig};
use super::error::{BinningError, Result};
use super::observation::Observation;

/// Resolved monotonic direction of a refined bin set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Result of one refinement run
#[derive(Debug, Clone, Serialize)]
pub struct Refinement {
    pub bins: BinSet,
    /// `None` when monotonicity was not enforced
    pub direction: Option<Direction>,
    /// Number of merges performed
    pub merges: usize,
    /// Only one bin remained: usable but trivial, reported as a warning
    pub degenerate: bool,
}

/// Refine a bin set until it is terminal.
///
/// Re-running on an already-terminal bin set returns it unchanged.
/// Fails with `UnsatisfiableConstraint` only when a single remaining bin
/// still cannot satisfy the hard constraints (e.g. `min_bin_size > 1.0`).
pub fn refine(
    mut bins: BinSet,
    observations: &[Observation],
    config: &RefineConfig,
) -> Result<Refinement> {
    if bins.is_empty() {
        return Err(BinningError::UnsatisfiableConstraint {
            detail: "initial split produced no bins".to_string(),
        });
    }

    bins.reaggregate(observations)?;

    // the direction is resolved once, on the unconstrained initial rates
    let direction = match config.monotonic {
        Monotonicity::None => None,
        Monotonicity::Increasing => Some(Direction::Increasing),
        Monotonicity::Decreasing => Some(Direction::Decreasing),
        Monotonicity::Auto => Some(detect_direction(&bins.event_rates())),
    };

    let total = bins.total_count() as f64;
    let min_count = config.min_bin_size * total;

    let mut merges = 0usize;
    loop {
        match first_violation(&bins, direction, config.min_event_rate_diff, min_count) {
            Some(i) => {
                bins.merge_adjacent(i);
                bins.reaggregate(observations)?;
                merges += 1;
            }
            None => break,
        }
    }

    if bins.len() == 1 && (bins.bins()[0].count as f64) < min_count {
        return Err(BinningError::UnsatisfiableConstraint {
            detail: format!(
                "min_bin_size {} cannot be met even by a single bin holding the whole population",
                config.min_bin_size
            ),
        });
    }

    let degenerate = bins.len() == 1;
    if degenerate && merges > 0 {
        eprintln!(
            "Warning: refinement collapsed the split to a single bin; the feature carries no usable signal under these constraints"
        );
    }

    Ok(Refinement {
        bins,
        direction,
        merges,
        degenerate,
    })
}

/// Index of the leftmost adjacent pair violating a constraint, or `None`
/// when the bin set is terminal.
///
/// Violations are ranked: undersized bins first, then monotonicity breaks,
/// then insufficient event-rate gaps. Monotonicity outranks the gap check so
/// an inversion is always repaired before gap merges reshape its neighbors.
fn first_violation(
    bins: &BinSet,
    direction: Option<Direction>,
    min_event_rate_diff: f64,
    min_count: f64,
) -> Option<usize> {
    if bins.len() < 2 {
        return None;
    }
    let rates = bins.event_rates();

    // undersized members
    for i in 0..bins.len() - 1 {
        let undersized = (bins.bins()[i].count as f64) < min_count
            || (bins.bins()[i + 1].count as f64) < min_count;
        if undersized {
            return Some(i);
        }
    }

    // monotonicity breaks
    if let Some(direction) = direction {
        for i in 0..bins.len() - 1 {
            let broken = match direction {
                Direction::Increasing => rates[i + 1] < rates[i],
                Direction::Decreasing => rates[i + 1] > rates[i],
            };
            if broken {
                return Some(i);
            }
        }
    }

    // insufficient gaps
    for i in 0..bins.len() - 1 {
        if (rates[i + 1] - rates[i]).abs() < min_event_rate_diff {
            return Some(i);
        }
    }

    None
}

/// Direction of the unconstrained trend: the sign of the covariance between
/// bin ordinal and event rate (ties resolve to increasing)
fn detect_direction(rates: &[f64]) -> Direction {
    let n = rates.len() as f64;
    let mean_ordinal = (n - 1.0) / 2.0;
    let mean_rate = rates.iter().sum::<f64>() / n;
    let cov: f64 = rates
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64 - mean_ordinal) * (r - mean_rate))
        .sum();
    if cov >= 0.0 {
        Direction::Increasing
    } else {
        Direction::Decreasing
    }
}
