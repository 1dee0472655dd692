//! Shared test utilities and fixture generators

use rand::prelude::*;
use rand::SeedableRng;

use riskbin::engine::Observation;

/// Observations realizing an exact event rate per value cluster.
///
/// Cluster `i` sits at value `i * 10 + 5`, so interior edges at multiples of
/// 10 map clusters onto bins one-to-one.
pub fn clustered_observations(rates: &[f64], per_cluster: u64, cohort: i64) -> Vec<Observation> {
    let mut obs = Vec::new();
    for (i, &rate) in rates.iter().enumerate() {
        let events = (rate * per_cluster as f64).round() as u64;
        let value = i as f64 * 10.0 + 5.0;
        for k in 0..per_cluster {
            obs.push(Observation::numeric(value, u8::from(k < events), cohort));
        }
    }
    obs
}

/// Same clusters over several cohorts, with an optional per-cohort rate drift
pub fn clustered_panel(
    rates: &[f64],
    per_cluster: u64,
    cohorts: &[i64],
    drift_per_cohort: f64,
) -> Vec<Observation> {
    let mut obs = Vec::new();
    for (step, &cohort) in cohorts.iter().enumerate() {
        let drifted: Vec<f64> = rates
            .iter()
            .map(|r| (r + drift_per_cohort * step as f64).clamp(0.0, 1.0))
            .collect();
        obs.extend(clustered_observations(&drifted, per_cluster, cohort));
    }
    obs
}

/// Synthetic risk-like portfolio: event probability rises with the feature
/// value, sampled reproducibly from a seed
pub fn synthetic_portfolio(n: usize, cohorts: &[i64], seed: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut obs = Vec::with_capacity(n);
    for _ in 0..n {
        let value: f64 = rng.gen::<f64>() * 100.0;
        let cohort = cohorts[rng.gen_range(0..cohorts.len())];
        let probability = 0.05 + 0.4 * (value / 100.0);
        let label = u8::from(rng.gen::<f64>() < probability);
        obs.push(Observation::numeric(value, label, cohort));
    }
    obs
}
