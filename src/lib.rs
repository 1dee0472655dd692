//! Riskbin: Monotonic Bin Refinement Library
//!
//! A library for turning a numeric or categorical predictor into a small
//! ordered set of bins for credit-risk scorecards, using monotonic event-rate
//! refinement, temporal-stability scoring, and a composite search objective.

pub mod engine;
pub mod search;
pub mod utils;
